use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, DataProviderKind};

/// Project config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "health-analyst.yaml";
/// Optional local overrides, kept out of version control.
pub const LOCAL_CONFIG_FILE: &str = "health-analyst.local.yaml";
/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "HEALTH_ANALYST_";

const MAX_ITERATIONS_LIMIT: u32 = 50;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be between 1 and {MAX_ITERATIONS_LIMIT}")]
    InvalidMaxIterations(u32),

    #[error("Invalid call_timeout_secs: {0}. Must be at least 1")]
    InvalidCallTimeout(u64),

    #[error("Invalid default_window_days: {0}. Must be between 1 and 366")]
    InvalidWindowDays(u32),

    #[error("Invalid insight_comment_limit: {0}. Must be at least 10")]
    InvalidCommentLimit(usize),

    #[error("Invalid max_calls_per_iteration: {0}. Must be at least 1")]
    InvalidMaxCalls(usize),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f32),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("{0} base_url cannot be empty")]
    EmptyBaseUrl(&'static str),

    #[error("data_provider.fixture_path is required when kind is fixture")]
    MissingFixturePath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. health-analyst.yaml (project config)
    /// 3. health-analyst.local.yaml (local overrides, optional)
    /// 4. Environment variables (HEALTH_ANALYST_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment
    /// overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let agent = &config.agent;
        if agent.max_iterations == 0 || agent.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::InvalidMaxIterations(agent.max_iterations));
        }
        if agent.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidCallTimeout(agent.call_timeout_secs));
        }
        if agent.default_window_days == 0 || agent.default_window_days > 366 {
            return Err(ConfigError::InvalidWindowDays(agent.default_window_days));
        }
        if agent.insight_comment_limit < 10 {
            return Err(ConfigError::InvalidCommentLimit(agent.insight_comment_limit));
        }
        if agent.max_calls_per_iteration == 0 {
            return Err(ConfigError::InvalidMaxCalls(agent.max_calls_per_iteration));
        }

        let completion = &config.completion;
        if completion.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl("completion"));
        }
        if !(0.0..=1.0).contains(&completion.temperature) {
            return Err(ConfigError::InvalidTemperature(completion.temperature));
        }
        if completion.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(completion.max_tokens));
        }

        match config.data_provider.kind {
            DataProviderKind::Http if config.data_provider.base_url.trim().is_empty() => {
                return Err(ConfigError::EmptyBaseUrl("data_provider"));
            }
            DataProviderKind::Fixture if config.data_provider.fixture_path.is_none() => {
                return Err(ConfigError::MissingFixturePath);
            }
            _ => {}
        }

        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }
        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}
