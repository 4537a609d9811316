//! The generate-test-repair loop that drives a code task to green.
//!
//! Each round asks the tester agent for a fresh suite, executes it against
//! the base snapshot with the working changes overlaid, and, while any test
//! fails, asks the coder agent for a revision per failing test. A repair
//! reply replaces the working change set wholesale, so within a round the
//! revision for the last failing test is the one that survives. The cap
//! bounds repair rounds, not test runs; the suite produced after the final
//! repair is always executed, which is how a loop that exhausts its cap can
//! still end green.

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::agents::{coder, tester};
use crate::core::types::{ChangeSet, Codebase, GeneratedTest, TaskSpec, TestOutcome};
use crate::io::sandbox::SnippetRunner;
use crate::model::Model;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairStop {
    /// Every generated test passed.
    Green,
    /// The round cap was reached with tests still failing. A normal
    /// terminal state, not an error.
    IterationsExhausted { max_rounds: u32 },
}

/// Final state of a repair loop.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// Repair rounds actually executed, at most the configured cap.
    pub rounds_executed: u32,
    pub stop: RepairStop,
    /// The surviving change set.
    pub change_set: ChangeSet,
    /// Outcomes of the final testing round, passing tests first.
    pub results: Vec<TestOutcome>,
}

impl RepairOutcome {
    pub fn is_green(&self) -> bool {
        self.stop == RepairStop::Green
    }
}

/// Progress snapshot handed to the caller after each testing round.
/// `round` counts testing rounds from zero.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round: u32,
    pub passing: usize,
    pub failing: usize,
}

/// Generate a suite for `change_set` and execute it.
///
/// Returns `(failing, passing)`, each in suite order. Execution itself
/// never errors; only model and decoding failures propagate.
pub fn run_tests<M: Model, R: SnippetRunner>(
    model: &M,
    runner: &R,
    change_set: &ChangeSet,
    base: &Codebase,
) -> Result<(Vec<TestOutcome>, Vec<TestOutcome>)> {
    let tests = tester::generate_tests(model, change_set)?;
    Ok(execute_tests(runner, &tests, change_set, base))
}

fn execute_tests<R: SnippetRunner>(
    runner: &R,
    tests: &[GeneratedTest],
    change_set: &ChangeSet,
    base: &Codebase,
) -> (Vec<TestOutcome>, Vec<TestOutcome>) {
    let merged = base.overlay(change_set);
    let mut failing = Vec::new();
    let mut passing = Vec::new();
    for test in tests {
        let result = runner.run(&test.test_code, &merged);
        let outcome = TestOutcome {
            success: result.success,
            message: result.output,
            test: test.clone(),
        };
        if outcome.success {
            passing.push(outcome);
        } else {
            failing.push(outcome);
        }
    }
    (failing, passing)
}

/// Drive `initial` to green or to the round cap.
///
/// `on_round` fires after every testing round, including the final one.
/// Model and decoding errors abort the loop and propagate; failing tests
/// never do.
#[instrument(skip_all, fields(task = %task.id, max_rounds))]
pub fn run_repair_loop<M, R, F>(
    model: &M,
    runner: &R,
    task: &TaskSpec,
    initial: ChangeSet,
    base: &Codebase,
    max_rounds: u32,
    mut on_round: F,
) -> Result<RepairOutcome>
where
    M: Model,
    R: SnippetRunner,
    F: FnMut(&RoundReport),
{
    let mut change_set = initial;
    let mut rounds_executed = 0u32;
    loop {
        let (failing, passing) = run_tests(model, runner, &change_set, base)?;
        on_round(&RoundReport {
            round: rounds_executed,
            passing: passing.len(),
            failing: failing.len(),
        });

        if failing.is_empty() {
            info!(rounds_executed, "all tests passing");
            return Ok(RepairOutcome {
                rounds_executed,
                stop: RepairStop::Green,
                change_set,
                results: passing,
            });
        }
        if rounds_executed >= max_rounds {
            info!(
                rounds_executed,
                failing = failing.len(),
                "round cap reached with failing tests"
            );
            let mut results = passing;
            results.extend(failing);
            return Ok(RepairOutcome {
                rounds_executed,
                stop: RepairStop::IterationsExhausted { max_rounds },
                change_set,
                results,
            });
        }

        for outcome in &failing {
            debug!(target = %outcome.test.target_path, "repairing failing test");
            change_set =
                coder::repair_code(model, &change_set, &outcome.test, &outcome.message, task)?;
        }
        rounds_executed += 1;
    }
}
