//! Health Analyst - bounded iterative analysis of wearable health metrics
//!
//! Answers a natural-language question about one subject's wearable data by
//! resolving the dates it refers to, drafting a plan, then looping over
//! tool selection, concurrent data retrieval and incremental analysis until
//! the analysis concludes or an iteration cap is hit. The distilled findings
//! become a Markdown report.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, run error taxonomy and ports
//! - **Application Layer** (`application`): the run state machine and agent
//! - **Service Layer** (`services`): one service per pipeline step
//! - **Adapters** (`adapters`): completion and data provider implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use health_analyst::{HealthAnalysisAgent, RunRequest, ToolCatalog};
//!
//! let agent = HealthAnalysisAgent::new(completion, provider, ToolCatalog::wearable(), config.agent);
//! let report = agent.run(RunRequest::new("How did I sleep last week?", 42), &cancel).await?;
//! println!("{}", report.report);
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{HealthAnalysisAgent, RunRequest};
pub use domain::models::{
    AgentConfig, AnalysisResult, Config, DateHint, DateRange, FinalReport, Termination, ToolCall,
    ToolInvocationRecord,
};
pub use domain::ports::{CompletionClient, DataProvider};
pub use domain::{RunError, RunErrorCategory, RunResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::ToolCatalog;
