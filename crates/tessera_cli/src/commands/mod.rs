//! CLI command implementations.

pub mod batch;
pub mod demo;
pub mod recover;
pub mod scenario;
