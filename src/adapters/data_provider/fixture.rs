//! Data provider serving canned payloads from a JSON or YAML file.
//!
//! ```yaml
//! sleep_timeseries:
//!   - params: { target_date: "2025-04-09" }
//!     payload: { total_sleep_seconds: 25200 }
//! steps_summary:
//!   - payload: { days: [] }     # no params: matches any call
//! ```
//!
//! An entry matches when each of its params equals the call's value for that
//! key. The first matching entry wins; no match is `NotFound`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::ToolParams;
use crate::domain::ports::{DataProvider, ProviderError};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture file {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntry {
    #[serde(default)]
    pub params: ToolParams,
    pub payload: Value,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureDataProvider {
    fixtures: HashMap<String, Vec<FixtureEntry>>,
}

impl FixtureDataProvider {
    pub fn new(fixtures: HashMap<String, Vec<FixtureEntry>>) -> Self {
        Self { fixtures }
    }

    /// Load a fixture file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: display.clone(),
            source,
        })?;

        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let fixtures: HashMap<String, Vec<FixtureEntry>> = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        }
        .map_err(|message| FixtureError::Parse {
            path: display,
            message,
        })?;

        Ok(Self::new(fixtures))
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.fixtures.keys().map(String::as_str)
    }
}

#[async_trait]
impl DataProvider for FixtureDataProvider {
    async fn invoke(&self, operation: &str, params: &ToolParams) -> Result<Value, ProviderError> {
        let entry = self.fixtures.get(operation).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.params.iter().all(|(key, value)| params.get(key) == Some(value)))
        });

        match entry {
            Some(entry) => Ok(entry.payload.clone()),
            None => {
                debug!(operation, ?params, "No fixture matches");
                Err(ProviderError::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn params(date: &str) -> ToolParams {
        let mut params = ToolParams::new();
        params.insert("subject_id".to_string(), json!(1));
        params.insert("target_date".to_string(), json!(date));
        params
    }

    #[tokio::test]
    async fn test_yaml_fixture_matching() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
sleep_timeseries:
  - params: {{ target_date: "2025-04-09" }}
    payload: {{ total_sleep_seconds: 25200 }}
  - payload: {{ total_sleep_seconds: 0 }}
"#
        )
        .unwrap();

        let provider = FixtureDataProvider::from_file(file.path()).unwrap();
        let hit = provider.invoke("sleep_timeseries", &params("2025-04-09")).await.unwrap();
        assert_eq!(hit, json!({"total_sleep_seconds": 25200}));

        let fallback = provider.invoke("sleep_timeseries", &params("2025-04-01")).await.unwrap();
        assert_eq!(fallback, json!({"total_sleep_seconds": 0}));

        assert_eq!(
            provider.invoke("steps_summary", &params("2025-04-09")).await,
            Err(ProviderError::NotFound)
        );
    }

    #[test]
    fn test_json_fixture_and_errors() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"steps_summary": [{{"payload": {{"steps": 1}}}}]}}"#).unwrap();
        let provider = FixtureDataProvider::from_file(file.path()).unwrap();
        assert_eq!(provider.operations().collect::<Vec<_>>(), vec!["steps_summary"]);

        let mut broken = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(broken, "not json").unwrap();
        assert!(matches!(
            FixtureDataProvider::from_file(broken.path()),
            Err(FixtureError::Parse { .. })
        ));
        assert!(matches!(
            FixtureDataProvider::from_file(Path::new("/nonexistent/fixtures.yaml")),
            Err(FixtureError::Io { .. })
        ));
    }
}
