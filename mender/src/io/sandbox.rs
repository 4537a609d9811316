//! Isolated execution of Python snippets against a virtual codebase.
//!
//! Each run materializes the snapshot into a fresh temporary directory,
//! writes the snippet as the entry file, installs stand-ins for external
//! imports under a run-local directory exposed via `PYTHONPATH`, and executes
//! a child interpreter under a wall-clock budget. The directory (stand-ins
//! included) is removed on every exit path, so no run can observe another
//! run's module resolution.
//!
//! Known limit: only the entry snippet is analyzed for imports. A snapshot
//! file importing a missing external module fails inside the child and
//! surfaces through stderr.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::core::classify::is_external;
use crate::core::imports::{self, ParseError};
use crate::core::standin::StandinSet;
use crate::core::types::{Codebase, SandboxResult};
use crate::io::config::SandboxConfig;
use crate::io::process::run_command_with_timeout;

/// Fixed output reported when the child exceeds its wall-clock budget.
pub const TIMEOUT_MESSAGE: &str = "Execution timed out";

const ENTRY_FILE: &str = "__main__.py";
const STANDIN_DIR: &str = "_standins";

/// Anything that can execute a snippet against a snapshot.
///
/// The orchestration layers are written against this seam so tests can swap
/// in scripted runners without an interpreter.
pub trait SnippetRunner {
    fn run(&self, snippet: &str, codebase: &Codebase) -> SandboxResult;
}

/// The production runner: a real child interpreter in an ephemeral directory.
#[derive(Debug, Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    extra_known: BTreeSet<String>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        let extra_known = config.extra_runtime_modules.iter().cloned().collect();
        Self {
            config,
            extra_known,
        }
    }

    /// Execute `snippet` against `codebase`.
    ///
    /// Total: preparation and cleanup failures are folded into a failing
    /// [`SandboxResult`] rather than returned as errors, so a caller can
    /// treat every outcome as a test verdict.
    #[instrument(skip_all, fields(files = codebase.len()))]
    pub fn run(&self, snippet: &str, codebase: &Codebase) -> SandboxResult {
        let mut stand_ins = StandinSet::new();
        match self.run_inner(snippet, codebase, &mut stand_ins) {
            Ok(result) => result,
            Err(err) => {
                warn!("sandbox internal failure: {err:#}");
                SandboxResult {
                    success: false,
                    output: format!("sandbox error: {err:#}"),
                    stand_ins_used: stand_ins.names(),
                }
            }
        }
    }

    fn run_inner(
        &self,
        snippet: &str,
        codebase: &Codebase,
        stand_ins: &mut StandinSet,
    ) -> Result<SandboxResult> {
        let dir = TempDir::new().context("create sandbox directory")?;
        materialize_codebase(dir.path(), codebase)?;
        fs::write(dir.path().join(ENTRY_FILE), snippet).context("write entry file")?;

        // A snippet that fails to parse gets no stand-ins; the child
        // interpreter reports the syntax error as the run output.
        let imported = match imports::analyze(snippet) {
            Ok(names) => names,
            Err(ParseError { offset }) => {
                debug!(offset, "snippet failed to parse, skipping stand-ins");
                Vec::new()
            }
        };
        for name in &imported {
            if is_external(name, codebase, &self.extra_known) {
                stand_ins.register(name)?;
            }
        }

        let standin_root = dir.path().join(STANDIN_DIR);
        fs::create_dir_all(&standin_root).context("create stand-in directory")?;
        for standin in stand_ins.iter() {
            let path = standin_root.join(standin.relative_path());
            let parent = path
                .parent()
                .ok_or_else(|| anyhow!("stand-in path missing parent"))?;
            fs::create_dir_all(parent)
                .with_context(|| format!("create stand-in package {}", parent.display()))?;
            fs::write(&path, standin.render())
                .with_context(|| format!("write stand-in {}", path.display()))?;
        }

        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg("-B")
            .arg(ENTRY_FILE)
            .current_dir(dir.path())
            // Stand-ins shadow any installed package of the same name; the
            // run directory itself leads the search path because the entry
            // file lives there.
            .env("PYTHONPATH", &standin_root);

        let output = run_command_with_timeout(
            cmd,
            None,
            self.config.timeout(),
            self.config.output_limit_bytes,
        )?;

        let names = stand_ins.names();
        if output.timed_out {
            return Ok(SandboxResult {
                success: false,
                output: TIMEOUT_MESSAGE.to_string(),
                stand_ins_used: names,
            });
        }

        let success = output.status.success();
        let text = if success {
            format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                output.stdout_truncated_notice("sandbox")
            )
        } else {
            format!(
                "{}{}",
                String::from_utf8_lossy(&output.stderr),
                output.stderr_truncated_notice("sandbox")
            )
        };
        debug!(success, stand_ins = names.len(), "sandbox run finished");
        Ok(SandboxResult {
            success,
            output: text,
            stand_ins_used: names,
        })
    }
}

impl SnippetRunner for Sandbox {
    fn run(&self, snippet: &str, codebase: &Codebase) -> SandboxResult {
        Sandbox::run(self, snippet, codebase)
    }
}

fn materialize_codebase(root: &Path, codebase: &Codebase) -> Result<()> {
    for (path, content) in codebase.iter() {
        let rel = sanitize_relative(path)?;
        let full = root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&full, content).with_context(|| format!("write {}", full.display()))?;
    }
    Ok(())
}

/// Reject absolute paths and `..`/`.` components so a snapshot cannot write
/// outside its run directory.
pub(crate) fn sanitize_relative(path: &str) -> Result<PathBuf> {
    let rel = Path::new(path);
    if path.is_empty()
        || rel
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(anyhow!("path escapes the output root: {path}"));
    }
    Ok(rel.to_path_buf())
}
