//! Model-facing agents: planning, code generation, and test generation.
//!
//! Each agent is a free function generic over [`crate::model::Model`] that
//! renders its prompt, requests a completion, and decodes the reply against
//! the matching schema under `schemas/`.

pub mod coder;
pub mod planner;
pub mod tester;
