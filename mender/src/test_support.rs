//! Shared fakes and builders for tests.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration tests under `tests/`.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::types::{ChangeSet, CodeChange, Codebase, SandboxResult};
use crate::io::sandbox::SnippetRunner;
use crate::model::{Model, ModelRequest};

/// A model that replays canned responses in order and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    responses: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(Into::into).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Model for ScriptedModel {
    fn complete(&self, request: &ModelRequest) -> Result<String> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model ran out of responses"))
    }
}

/// A runner that decides verdicts by substring instead of executing code.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    fail_markers: Vec<String>,
    runs: RefCell<Vec<(String, Codebase)>>,
}

impl ScriptedRunner {
    /// Every snippet passes.
    pub fn passing() -> Self {
        Self::default()
    }

    /// Snippets containing any of the markers fail; everything else passes.
    pub fn failing_when<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fail_markers: markers.into_iter().map(Into::into).collect(),
            runs: RefCell::new(Vec::new()),
        }
    }

    /// Snippets and snapshots seen so far, in call order.
    pub fn runs(&self) -> Vec<(String, Codebase)> {
        self.runs.borrow().clone()
    }
}

impl SnippetRunner for ScriptedRunner {
    fn run(&self, snippet: &str, codebase: &Codebase) -> SandboxResult {
        self.runs
            .borrow_mut()
            .push((snippet.to_string(), codebase.clone()));
        match self
            .fail_markers
            .iter()
            .find(|marker| snippet.contains(marker.as_str()))
        {
            Some(marker) => SandboxResult {
                success: false,
                output: format!("assertion failed: {marker}"),
                stand_ins_used: Default::default(),
            },
            None => SandboxResult {
                success: true,
                output: String::new(),
                stand_ins_used: Default::default(),
            },
        }
    }
}

/// Build a snapshot from `(path, content)` pairs.
pub fn codebase(files: &[(&str, &str)]) -> Codebase {
    Codebase::from_files(files.iter().copied())
}

/// Build a change set from `(path, code)` pairs.
pub fn change_set(changes: &[(&str, &str)]) -> ChangeSet {
    ChangeSet {
        changes: changes
            .iter()
            .map(|(path, code)| CodeChange {
                path: (*path).to_string(),
                code: (*code).to_string(),
            })
            .collect(),
    }
}

/// A coder reply carrying the given `(path, code)` pairs.
pub fn change_set_json(changes: &[(&str, &str)]) -> String {
    serde_json::to_string(&change_set(changes)).expect("change set serializes")
}

/// A tester reply carrying the given `(test_code, target_path)` pairs.
pub fn suite_json(tests: &[(&str, &str)]) -> String {
    let tests: Vec<_> = tests
        .iter()
        .map(|(test_code, target_path)| {
            serde_json::json!({ "test_code": test_code, "target_path": target_path })
        })
        .collect();
    serde_json::json!({ "tests": tests }).to_string()
}
