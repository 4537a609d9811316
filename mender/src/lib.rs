//! Query-driven code modification with sandboxed verification.
//!
//! mender takes a natural-language modification request plus an in-memory
//! snapshot of a small Python codebase, asks a language model to plan and
//! produce file edits, then verifies each edit by generating unit tests and
//! executing them in an isolated interpreter sandbox, repairing failures for
//! a bounded number of rounds. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (import analysis, dependency
//!   classification, stand-in synthesis, the shared data model). No I/O.
//! - **[`io`]**: Side-effecting operations (config, child processes, the
//!   execution sandbox, snapshot loading, report persistence).
//! - **[`model`]** / **[`agents`]**: the language-model seam and the planner,
//!   coder, and tester collaborators built on top of it.
//!
//! Orchestration modules ([`repair`], [`pipeline`]) coordinate core logic
//! with I/O to implement the CLI commands.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod repair;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
