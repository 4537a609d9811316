//! Shared data model for the modification pipeline.
//!
//! These types define stable contracts between components, including the wire
//! shapes exchanged with the language model (`code_changes`, `tests`,
//! `agents`). They carry no I/O and remain deterministic across runs: every
//! map is ordered so serialized output is stable.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One generated or revised file, as returned by the coder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub path: String,
    pub code: String,
}

/// An ordered set of file edits produced by a single model call.
///
/// Duplicate paths are legal in the wire format; consumers resolve them
/// last-write-wins via [`ChangeSet::files`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(rename = "code_changes")]
    pub changes: Vec<CodeChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Path -> code view of the change set, later entries overriding earlier
    /// ones for the same path.
    pub fn files(&self) -> BTreeMap<&str, &str> {
        let mut files = BTreeMap::new();
        for change in &self.changes {
            files.insert(change.path.as_str(), change.code.as_str());
        }
        files
    }
}

/// In-memory snapshot of the files under modification.
///
/// Keys are slash-separated paths relative to the snapshot root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Codebase {
    files: BTreeMap<String, String>,
}

impl Codebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(path, content)| (path.into(), content.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Snapshot with `change_set` applied on top, last write winning both
    /// across the snapshot and within the change set.
    pub fn overlay(&self, change_set: &ChangeSet) -> Codebase {
        let mut merged = self.clone();
        for change in &change_set.changes {
            merged.insert(change.path.clone(), change.code.clone());
        }
        merged
    }
}

/// Outcome of executing one snippet in the sandbox.
///
/// `success` mirrors the child's exit status; `output` is stdout on success
/// and stderr (or a sentinel) otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxResult {
    pub success: bool,
    pub output: String,
    /// Module names replaced by stand-ins during this call.
    pub stand_ins_used: BTreeSet<String>,
}

/// One self-contained unit test produced by the tester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTest {
    /// Complete runnable test source.
    pub test_code: String,
    /// Snapshot path of the code this test exercises.
    pub target_path: String,
}

/// Wire envelope for generated tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub tests: Vec<GeneratedTest>,
}

/// A generated test together with its sandbox verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub success: bool,
    /// Sandbox output: stdout for passing tests, stderr/sentinel otherwise.
    pub message: String,
    #[serde(flatten)]
    pub test: GeneratedTest,
}

/// How a planned task is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Code edits verified through the test-repair loop.
    CodeImplementation,
    /// A single prose model call (docs, summaries).
    Documentation,
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub description: String,
    #[serde(rename = "task_type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub file_paths: Vec<String>,
    /// Prompt for [`TaskKind::Documentation`] tasks.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Snapshot content for `file_paths`, attached by the planner after
    /// parsing. Paths that do not exist yet are simply absent.
    #[serde(default)]
    pub relevant_code: BTreeMap<String, String>,
}

/// A specialized agent persona with an ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAgent {
    pub name: String,
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// The full plan for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub agents: Vec<PlanAgent>,
}

impl Plan {
    pub fn task_count(&self) -> usize {
        self.agents.iter().map(|agent| agent.tasks.len()).sum()
    }
}
