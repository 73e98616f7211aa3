//! Domain models for the health analysis run.

pub mod analysis;
pub mod config;
pub mod date_range;
pub mod execution_state;
pub mod report;
pub mod tool;

pub use analysis::{truncate_comment, AnalysisDigest, AnalysisPlan, AnalysisResult, Insight};
pub use config::{
    AgentConfig, CompletionConfig, Config, DataProviderConfig, DataProviderKind, LogFormat,
    LoggingConfig, RateLimitConfig, RetryConfig, RotationPolicy,
};
pub use date_range::{parse_date, DateHint, DateRange, DateResolution, DateType, DATE_FORMAT};
pub use execution_state::{ExecutionState, RunPhase};
pub use report::{FinalReport, Termination};
pub use tool::{
    OutcomeStatus, ParamType, ParameterSpec, ToolCall, ToolDescriptor, ToolInvocationRecord,
    ToolParams, ToolPayload,
};
