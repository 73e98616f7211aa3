//! Logging infrastructure
//!
//! Structured logging on `tracing`:
//! - Pretty or JSON console output on stderr
//! - Optional JSON log files with rotation
//! - Credential scrubbing on every sink

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{parse_log_level, LoggerImpl};
pub use secret_scrubbing::{scrub_secrets, ScrubbingMakeWriter};
