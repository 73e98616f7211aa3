use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the health analyst
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Analysis loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Structured completion service configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Data provider configuration
    #[serde(default)]
    pub data_provider: DataProviderConfig,

    /// Rate limiting configuration for the completion service
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Hard cap on dispatch/execute/analyze iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Timeout applied to each individual collaborator call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Size of the fail-open window used when date resolution fails
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,

    /// Maximum characters of one insight comment shown back to the model
    #[serde(default = "default_insight_comment_limit")]
    pub insight_comment_limit: usize,

    /// Maximum calls executed in a single iteration
    #[serde(default = "default_max_calls_per_iteration")]
    pub max_calls_per_iteration: usize,
}

const fn default_max_iterations() -> u32 {
    7
}

const fn default_call_timeout_secs() -> u64 {
    60
}

const fn default_window_days() -> u32 {
    7
}

const fn default_insight_comment_limit() -> usize {
    1000
}

const fn default_max_calls_per_iteration() -> usize {
    9
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            call_timeout_secs: default_call_timeout_secs(),
            default_window_days: default_window_days(),
            insight_comment_limit: default_insight_comment_limit(),
            max_calls_per_iteration: default_max_calls_per_iteration(),
        }
    }
}

/// Structured completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    /// API base URL
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Model used for date resolution, tool selection and analysis
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for plan generation
    #[serde(default = "default_model")]
    pub planner_model: String,

    /// Model used for the final report
    #[serde(default = "default_model")]
    pub report_model: String,

    /// API key (falls back to `ANTHROPIC_API_KEY`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Max tokens to generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_completion_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.8
}

const fn default_completion_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            model: default_model(),
            planner_model: default_model(),
            report_model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    /// Get API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

/// Which data provider backs the tool executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProviderKind {
    Http,
    Fixture,
}

/// Data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: DataProviderKind,

    /// Base URL of the metrics service (http kind)
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Fixture file (fixture kind)
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_provider_kind() -> DataProviderKind {
    DataProviderKind::Http
}

fn default_provider_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

const fn default_provider_timeout_secs() -> u64 {
    30
}

impl Default for DataProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: default_provider_base_url(),
            fixture_path: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

const fn default_requests_per_second() -> f64 {
    5.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
