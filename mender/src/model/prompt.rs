//! Prompt rendering for the model-facing agents.
//!
//! Templates live next to this module and are compiled into the binary, so
//! a deployed tool cannot drift from the prompts it was tested with.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::types::{ChangeSet, Codebase, GeneratedTest, PlanAgent, TaskSpec};

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const CODER_TEMPLATE: &str = include_str!("prompts/coder.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");
const TESTER_TEMPLATE: &str = include_str!("prompts/tester.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("coder", CODER_TEMPLATE)
            .expect("coder template should be valid");
        env.add_template("repair", REPAIR_TEMPLATE)
            .expect("repair template should be valid");
        env.add_template("tester", TESTER_TEMPLATE)
            .expect("tester template should be valid");
        Self { env }
    }

    /// Prompt asking for a task plan. The codebase goes in as paths only;
    /// file contents are attached per task after the plan comes back.
    pub fn render_planner(&self, query: &str, codebase: &Codebase) -> Result<String> {
        let files: Vec<&str> = codebase.paths().collect();
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! { query, files })?;
        Ok(rendered)
    }

    pub fn render_coder(&self, task: &TaskSpec, agent: &PlanAgent) -> Result<String> {
        let template = self.env.get_template("coder")?;
        let rendered = template.render(context! { agent, task })?;
        Ok(rendered)
    }

    pub fn render_repair(
        &self,
        current: &ChangeSet,
        test: &GeneratedTest,
        failure: &str,
        task: &TaskSpec,
    ) -> Result<String> {
        let template = self.env.get_template("repair")?;
        let rendered = template.render(context! {
            code => serde_json::to_string_pretty(current)?,
            test_code => &test.test_code,
            failure,
            description => &task.description,
        })?;
        Ok(rendered)
    }

    pub fn render_tester(&self, change_set: &ChangeSet) -> Result<String> {
        let template = self.env.get_template("tester")?;
        let rendered = template.render(context! {
            code => serde_json::to_string_pretty(change_set)?,
        })?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
