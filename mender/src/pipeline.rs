//! End-to-end query processing: plan, execute every task, compile a report.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::agents::{coder, planner};
use crate::core::types::{Codebase, Plan, PlanAgent, TaskKind, TaskSpec, TestOutcome};
use crate::io::config::MenderConfig;
use crate::io::sandbox::SnippetRunner;
use crate::model::{Model, ModelRequest};
use crate::repair::{self, RepairStop};

/// Narrative of a run. Entries are mirrored to the log as they are added
/// and land in the report afterwards.
#[derive(Debug, Default)]
struct Trail {
    entries: Vec<String>,
}

impl Trail {
    fn note(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        info!("{entry}");
        self.entries.push(entry);
    }
}

/// Outcome of one planned task, in plan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: String,
    pub success: bool,
    pub output: String,
    /// Final file contents the task settled on, keyed by path.
    #[serde(default)]
    pub modified_files: BTreeMap<String, String>,
    /// Outcomes of the final testing round, passing tests first.
    #[serde(default)]
    pub test_results: Vec<TestOutcome>,
    pub rounds_executed: u32,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    pub plan: Plan,
    pub task_reports: Vec<TaskReport>,
    /// Files that existed in the snapshot and were rewritten.
    pub modified_files: BTreeMap<String, String>,
    /// Files the tasks introduced.
    pub new_files: BTreeMap<String, String>,
    /// The rest of the snapshot, untouched.
    pub unchanged_files: BTreeMap<String, String>,
    pub trail: Vec<String>,
}

impl QueryReport {
    pub fn all_green(&self) -> bool {
        self.task_reports.iter().all(|report| report.success)
    }
}

/// Process `query` against `codebase` and return the compiled report.
///
/// Tasks run sequentially in plan order. A failing test never aborts the
/// run; model and decoding errors do.
#[instrument(skip_all, fields(files = codebase.len()))]
pub fn process_query<M: Model, R: SnippetRunner>(
    model: &M,
    runner: &R,
    config: &MenderConfig,
    query: &str,
    codebase: &Codebase,
) -> Result<QueryReport> {
    let mut trail = Trail::default();
    trail.note(format!("Processing query: {query}"));

    let plan = planner::plan(model, query, codebase)?;

    let mut task_reports = Vec::new();
    for agent in &plan.agents {
        trail.note(format!("Executing tasks for agent: {}", agent.name));
        for task in &agent.tasks {
            trail.note(format!("Executing task: {}", task.description));
            let report = match task.kind {
                TaskKind::CodeImplementation => {
                    run_code_task(model, runner, config, task, agent, codebase, &mut trail)?
                }
                TaskKind::Documentation => run_prose_task(model, task, &mut trail)?,
            };
            task_reports.push(report);
        }
    }

    trail.note("Compiling final results");
    let mut modified_files = BTreeMap::new();
    let mut new_files = BTreeMap::new();
    for report in &task_reports {
        for (path, content) in &report.modified_files {
            if codebase.get(path).is_some() {
                modified_files.insert(path.clone(), content.clone());
            } else {
                new_files.insert(path.clone(), content.clone());
            }
        }
    }
    let unchanged_files = codebase
        .iter()
        .filter(|(path, _)| !modified_files.contains_key(*path))
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect();

    Ok(QueryReport {
        query: query.to_string(),
        plan,
        task_reports,
        modified_files,
        new_files,
        unchanged_files,
        trail: trail.entries,
    })
}

fn run_code_task<M: Model, R: SnippetRunner>(
    model: &M,
    runner: &R,
    config: &MenderConfig,
    task: &TaskSpec,
    agent: &PlanAgent,
    codebase: &Codebase,
    trail: &mut Trail,
) -> Result<TaskReport> {
    trail.note(format!(
        "Modifying code in files: {}",
        task.file_paths.join(", ")
    ));
    let initial = coder::generate_code(model, task, agent)?;

    let max_rounds = config.max_repair_rounds;
    let outcome = repair::run_repair_loop(
        model,
        runner,
        task,
        initial,
        codebase,
        max_rounds,
        |round| {
            // A repair follows only below the cap; the final round gets the
            // terminal note instead.
            if round.failing > 0 && round.round < max_rounds {
                trail.note(format!(
                    "Round {}: {} tests failed. Attempting repair...",
                    round.round + 1,
                    round.failing
                ));
            }
        },
    )?;

    match outcome.stop {
        RepairStop::Green => trail.note("All tests passed successfully."),
        RepairStop::IterationsExhausted { .. } => {
            trail.note("Maximum repair rounds reached. Some tests are still failing.");
        }
    }

    let output = if outcome.is_green() {
        "Code modification complete"
    } else {
        "Some tests are still failing"
    };
    let modified_files = outcome
        .change_set
        .files()
        .into_iter()
        .map(|(path, code)| (path.to_string(), code.to_string()))
        .collect();

    Ok(TaskReport {
        task_id: task.id.clone(),
        success: outcome.is_green(),
        output: output.to_string(),
        modified_files,
        test_results: outcome.results,
        rounds_executed: outcome.rounds_executed,
    })
}

fn run_prose_task<M: Model>(model: &M, task: &TaskSpec, trail: &mut Trail) -> Result<TaskReport> {
    trail.note(format!("Executing model task: {}", task.description));
    let prompt = task
        .prompt
        .clone()
        .unwrap_or_else(|| task.description.clone());
    let output = model.complete(&ModelRequest::new(prompt))?;
    Ok(TaskReport {
        task_id: task.id.clone(),
        success: true,
        output,
        modified_files: BTreeMap::new(),
        test_results: Vec::new(),
        rounds_executed: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedModel, ScriptedRunner, change_set_json, codebase, suite_json};

    fn plan_json(tasks: serde_json::Value) -> String {
        serde_json::json!({
            "agents": [{
                "name": "Code Implementer",
                "role": "maintainer",
                "goal": "apply the query",
                "tasks": tasks
            }]
        })
        .to_string()
    }

    #[test]
    fn green_run_compiles_a_full_report() {
        let plan = plan_json(serde_json::json!([
            {
                "id": "t1",
                "description": "add subtract",
                "task_type": "code_implementation",
                "file_paths": ["calculator.py"]
            },
            {
                "id": "t2",
                "description": "summarize the change",
                "task_type": "documentation",
                "file_paths": [],
                "prompt": "Summarize the change for the changelog."
            }
        ]));
        let changes = change_set_json(&[
            ("calculator.py", "def add(a, b): return a + b\n"),
            ("formatter.py", "def fmt(x): return str(x)\n"),
        ]);
        let model = ScriptedModel::new([
            plan,
            changes,
            r#"{"tests": []}"#.to_string(),
            "The calculator gained a formatter.".to_string(),
        ]);
        let runner = ScriptedRunner::passing();
        let base = codebase(&[("calculator.py", "def add(a, b): ..."), ("util.py", "U = 1")]);

        let report = process_query(&model, &runner, &MenderConfig::default(), "add subtract", &base)
            .expect("process");

        assert!(report.all_green());
        assert_eq!(report.task_reports.len(), 2);
        assert_eq!(report.task_reports[0].output, "Code modification complete");
        assert_eq!(report.task_reports[1].output, "The calculator gained a formatter.");

        assert!(report.modified_files.contains_key("calculator.py"));
        assert!(report.new_files.contains_key("formatter.py"));
        assert!(report.unchanged_files.contains_key("util.py"));
        assert!(!report.unchanged_files.contains_key("calculator.py"));

        assert!(report.trail.iter().any(|s| s == "Processing query: add subtract"));
        assert!(
            report
                .trail
                .iter()
                .any(|s| s == "Executing tasks for agent: Code Implementer")
        );
        assert!(report.trail.iter().any(|s| s == "All tests passed successfully."));
        assert!(report.trail.iter().any(|s| s == "Compiling final results"));
    }

    #[test]
    fn exhausted_task_is_reported_failing_with_the_last_revision() {
        let plan = plan_json(serde_json::json!([{
            "id": "t1",
            "description": "fix addition",
            "task_type": "code_implementation",
            "file_paths": ["calculator.py"]
        }]));
        let model = ScriptedModel::new([
            plan,
            change_set_json(&[("calculator.py", "v0")]),
            suite_json(&[("always fails MARKER", "calculator.py")]),
            change_set_json(&[("calculator.py", "v1")]),
            suite_json(&[("still fails MARKER", "calculator.py")]),
        ]);
        let runner = ScriptedRunner::failing_when(["MARKER"]);
        let base = codebase(&[("calculator.py", "old")]);
        let config = MenderConfig {
            max_repair_rounds: 1,
            ..MenderConfig::default()
        };

        let report =
            process_query(&model, &runner, &config, "fix addition", &base).expect("process");

        assert!(!report.all_green());
        let task = &report.task_reports[0];
        assert!(!task.success);
        assert_eq!(task.output, "Some tests are still failing");
        assert_eq!(task.rounds_executed, 1);
        assert_eq!(task.modified_files.get("calculator.py").map(String::as_str), Some("v1"));
        assert_eq!(report.modified_files.get("calculator.py").map(String::as_str), Some("v1"));

        assert!(
            report
                .trail
                .iter()
                .any(|s| s == "Round 1: 1 tests failed. Attempting repair...")
        );
        assert!(
            report
                .trail
                .iter()
                .any(|s| s == "Maximum repair rounds reached. Some tests are still failing.")
        );
    }

    #[test]
    fn documentation_task_uses_its_own_prompt_when_present() {
        let plan = plan_json(serde_json::json!([{
            "id": "t1",
            "description": "document the module",
            "task_type": "documentation",
            "file_paths": [],
            "prompt": "Write one sentence about the module."
        }]));
        let model = ScriptedModel::new([plan, "It adds numbers.".to_string()]);
        let runner = ScriptedRunner::passing();
        let base = codebase(&[("calculator.py", "")]);

        let report = process_query(&model, &runner, &MenderConfig::default(), "document", &base)
            .expect("process");

        assert!(report.all_green());
        assert_eq!(report.task_reports[0].output, "It adds numbers.");
        assert_eq!(
            model.prompts().last().map(String::as_str),
            Some("Write one sentence about the module.")
        );
        assert!(report.modified_files.is_empty());
    }
}
