//! Application layer: the run state machine and the agent that drives it.

pub mod health_analysis_agent;
pub mod loop_controller;

pub use health_analysis_agent::{HealthAnalysisAgent, RunRequest};
pub use loop_controller::{decide, next_phase, LoopDecision};
