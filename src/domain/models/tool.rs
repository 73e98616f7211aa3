//! Tool descriptors, calls and invocation records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::date_range::parse_date;

/// Ordered parameter map. Ordering by key makes structural equality of two
/// calls independent of the order the model emitted the keys in.
pub type ToolParams = BTreeMap<String, Value>;

/// Type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Integer,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    String,
}

impl ParamType {
    /// Whether `value` is acceptable for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Integer => value.as_i64().is_some(),
            Self::Date => value.as_str().and_then(parse_date).is_some(),
            Self::String => value.is_string(),
        }
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

const fn default_required() -> bool {
    true
}

impl ParameterSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
        }
    }
}

/// Immutable catalog entry describing a data-retrieval operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

/// A concrete (operation, parameters) pair selected for execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub params: ToolParams,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, params: ToolParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Builder-style parameter insertion.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={}", render_value(v)))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({params})", self.name)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome of one executed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Append-only log entry for one attempted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub operation_name: String,
    pub parameters: ToolParams,
    pub outcome_status: OutcomeStatus,
    /// Failure detail for error outcomes (`not_found`, `timeout`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Iteration (1-based) that executed this call.
    pub iteration: u32,
}

impl ToolInvocationRecord {
    /// Whether this record was made for exactly `call`.
    pub fn matches(&self, call: &ToolCall) -> bool {
        self.operation_name == call.name && self.parameters == call.params
    }

    pub fn is_success(&self) -> bool {
        self.outcome_status == OutcomeStatus::Success
    }

    /// The call this record was made for.
    pub fn call(&self) -> ToolCall {
        ToolCall::new(self.operation_name.clone(), self.parameters.clone())
    }
}

/// Payload of a successful call, handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub call: ToolCall,
    pub data: Value,
}
