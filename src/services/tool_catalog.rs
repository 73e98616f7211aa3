//! Registry of data-retrieval operations the dispatcher may choose from.
//!
//! Adding an operation means registering a descriptor here and teaching the
//! data provider to serve it; nothing in the orchestration loop changes.

use serde_json::Value;
use thiserror::Error;

use crate::domain::models::{ParamType, ParameterSpec, ToolCall, ToolDescriptor, ToolParams};

/// Parameter every catalog operation takes; always set by the dispatcher.
pub const SUBJECT_PARAM: &str = "subject_id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    #[error("Operation {operation} is missing required parameter {parameter}")]
    MissingParameter { operation: String, parameter: String },

    #[error("Operation {operation} got an invalid value for {parameter}: {value}")]
    InvalidParameter {
        operation: String,
        parameter: String,
        value: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in wearable metrics catalog: five date-range summaries and
    /// four single-day time series.
    pub fn wearable() -> Self {
        let mut catalog = Self::new();
        let summaries = [
            ("heart_rate_summary", "Daily heart rate summary (resting, min, max, average) for a date range."),
            ("steps_summary", "Daily step totals, goal, distance, calories and active minutes for a date range."),
            ("stress_summary", "Daily average and peak stress with stress and rest durations for a date range."),
            ("sleep_summary", "Nightly sleep sessions with stage durations, HRV, SpO2 and respiration for a date range."),
            ("activity_summary", "Workout activities with duration, distance, heart rate and training effect for a date range."),
        ];
        let series = [
            ("heart_rate_timeseries", "Intraday heart rate readings for a single day."),
            ("steps_timeseries", "Intraday step counts for a single day."),
            ("stress_timeseries", "Intraday stress level readings for a single day."),
            ("sleep_timeseries", "Sleep stage movements and overnight HRV readings for a single night."),
        ];

        for (name, description) in summaries {
            catalog.tools.push(ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                parameters: vec![
                    subject_param(),
                    ParameterSpec::required("start_date", ParamType::Date, "First day to include (YYYY-MM-DD)"),
                    ParameterSpec::required("end_date", ParamType::Date, "Last day to include (YYYY-MM-DD)"),
                ],
            });
        }
        for (name, description) in series {
            catalog.tools.push(ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                parameters: vec![
                    subject_param(),
                    ParameterSpec::required("target_date", ParamType::Date, "Day to fetch (YYYY-MM-DD)"),
                ],
            });
        }
        catalog
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), CatalogError> {
        if self.get(&descriptor.name).is_some() {
            return Err(CatalogError::DuplicateOperation(descriptor.name));
        }
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Reduce `call` to the parameters its descriptor declares and check that
    /// every required one is present and well typed.
    pub fn normalize(&self, call: &ToolCall) -> Result<ToolCall, CatalogError> {
        let descriptor = self
            .get(&call.name)
            .ok_or_else(|| CatalogError::UnknownOperation(call.name.clone()))?;

        let mut params = ToolParams::new();
        for spec in &descriptor.parameters {
            match call.params.get(&spec.name) {
                Some(value) if spec.param_type.accepts(value) => {
                    params.insert(spec.name.clone(), canonical_value(spec.param_type, value));
                }
                Some(value) => {
                    return Err(CatalogError::InvalidParameter {
                        operation: call.name.clone(),
                        parameter: spec.name.clone(),
                        value: value.to_string(),
                    });
                }
                None if spec.required => {
                    return Err(CatalogError::MissingParameter {
                        operation: call.name.clone(),
                        parameter: spec.name.clone(),
                    });
                }
                None => {}
            }
        }

        Ok(ToolCall::new(call.name.clone(), params))
    }
}

fn subject_param() -> ParameterSpec {
    ParameterSpec::required(SUBJECT_PARAM, ParamType::Integer, "Subject whose data is read")
}

fn canonical_value(param_type: ParamType, value: &Value) -> Value {
    match (param_type, value) {
        (ParamType::Date | ParamType::String, Value::String(s)) => Value::String(s.trim().to_string()),
        _ => value.clone(),
    }
}
