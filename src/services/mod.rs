//! Pipeline steps of one analysis run, one service per step.

pub mod date_resolver;
pub mod incremental_analyzer;
pub mod plan_generator;
pub mod prompts;
pub mod report_synthesizer;
pub mod tool_catalog;
pub mod tool_dispatcher;
pub mod tool_executor;

pub use date_resolver::{DateResolver, ResolvedDates};
pub use incremental_analyzer::IncrementalAnalyzer;
pub use plan_generator::PlanGenerator;
pub use report_synthesizer::ReportSynthesizer;
pub use tool_catalog::{CatalogError, ToolCatalog, SUBJECT_PARAM};
pub use tool_dispatcher::{DropReason, ToolDispatcher};
pub use tool_executor::{ToolExecutor, TIMEOUT_LABEL};
