//! Coder agent: generates and repairs file changes.

use anyhow::Result;
use tracing::instrument;

use crate::core::types::{ChangeSet, GeneratedTest, PlanAgent, TaskSpec};
use crate::model::prompt::PromptEngine;
use crate::model::{Model, ModelRequest, complete_structured};

const CHANGE_SET_SCHEMA: &str = include_str!("../../schemas/change_set.schema.json");

/// Produce the initial changes for a task, speaking as the planned agent.
#[instrument(skip_all, fields(task = %task.id))]
pub fn generate_code<M: Model>(model: &M, task: &TaskSpec, agent: &PlanAgent) -> Result<ChangeSet> {
    let prompt = PromptEngine::new().render_coder(task, agent)?;
    complete_structured(model, &ModelRequest::new(prompt), CHANGE_SET_SCHEMA)
}

/// Revise `current` so that the given failing test passes.
///
/// The reply replaces the working set wholesale, so the caller must feed the
/// newest revision back in when repairing several tests in sequence.
#[instrument(skip_all, fields(task = %task.id, target = %test.target_path))]
pub fn repair_code<M: Model>(
    model: &M,
    current: &ChangeSet,
    test: &GeneratedTest,
    failure: &str,
    task: &TaskSpec,
) -> Result<ChangeSet> {
    let prompt = PromptEngine::new().render_repair(current, test, failure, task)?;
    complete_structured(model, &ModelRequest::new(prompt), CHANGE_SET_SCHEMA)
}
