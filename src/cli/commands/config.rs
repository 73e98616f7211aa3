//! `config`: print the effective configuration.

use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

pub fn execute(config: Config, json_mode: bool) {
    output(&ConfigOutput { config }, json_mode);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_never_printed() {
        let mut config = Config::default();
        config.completion.api_key = Some("sk-ant-REDACTED".to_string());
        let output = ConfigOutput { config };

        assert!(!output.to_human().contains("secretsecret"));
        assert!(!output.to_json().to_string().contains("secretsecret"));
        assert_eq!(output.to_json()["agent"]["max_iterations"], 7);
    }
}
