//! Concrete implementations of the completion and data provider ports.

pub mod completion;
pub mod data_provider;
