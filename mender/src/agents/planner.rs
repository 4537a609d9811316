//! Planner agent: turns a query and a codebase into a task plan.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::types::{Codebase, Plan};
use crate::model::prompt::PromptEngine;
use crate::model::{Model, ModelRequest, complete_structured};

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

/// Ask the model for a plan and attach the referenced file contents to each
/// task.
///
/// A planned path with no counterpart in the snapshot is skipped rather than
/// rejected; it usually means the task creates that file.
#[instrument(skip_all, fields(files = codebase.len()))]
pub fn plan<M: Model>(model: &M, query: &str, codebase: &Codebase) -> Result<Plan> {
    let prompt = PromptEngine::new().render_planner(query, codebase)?;
    let mut plan: Plan = complete_structured(model, &ModelRequest::new(prompt), PLAN_SCHEMA)?;
    attach_relevant_code(&mut plan, codebase);
    debug!(
        agents = plan.agents.len(),
        tasks = plan.task_count(),
        "plan received"
    );
    Ok(plan)
}

fn attach_relevant_code(plan: &mut Plan, codebase: &Codebase) {
    for agent in &mut plan.agents {
        for task in &mut agent.tasks {
            task.relevant_code = task
                .file_paths
                .iter()
                .filter_map(|path| {
                    codebase
                        .get(path)
                        .map(|content| (path.clone(), content.to_string()))
                })
                .collect();
        }
    }
}
