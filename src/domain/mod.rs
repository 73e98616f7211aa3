//! Domain layer for the health analyst
//!
//! Pure models, error taxonomy and the ports implemented by external
//! collaborators.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{RunError, RunErrorCategory, RunResult};
