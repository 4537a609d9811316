//! Side-effecting operations: configuration, child processes, the execution
//! sandbox, snapshot loading, and report persistence.

pub mod codebase;
pub mod config;
pub mod process;
pub mod report;
pub mod sandbox;
