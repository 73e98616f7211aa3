//! `tools`: list the tool catalog.

use serde::Serialize;

use crate::cli::output::table::render_list;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::ToolDescriptor;
use crate::services::{ToolCatalog, SUBJECT_PARAM};

#[derive(Debug, Serialize)]
pub struct ToolListOutput {
    pub tools: Vec<ToolDescriptor>,
    pub total: usize,
}

impl From<&ToolCatalog> for ToolListOutput {
    fn from(catalog: &ToolCatalog) -> Self {
        Self {
            tools: catalog.descriptors().to_vec(),
            total: catalog.len(),
        }
    }
}

impl CommandOutput for ToolListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "parameters", "description"]);
        for tool in &self.tools {
            let params = tool
                .parameters
                .iter()
                .filter(|p| p.name != SUBJECT_PARAM)
                .map(|p| if p.required { p.name.clone() } else { format!("[{}]", p.name) })
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![tool.name.clone(), params, truncate(&tool.description, 60)]);
        }
        render_list("tool", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(catalog: &ToolCatalog, json_mode: bool) {
    output(&ToolListOutput::from(catalog), json_mode);
}
