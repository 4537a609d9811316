//! Persisting a run report to the output directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::io::sandbox::sanitize_relative;
use crate::pipeline::QueryReport;

/// Write `report` under `dir`.
///
/// Layout: `report.json` holds the full report, `files/` holds the final
/// content of every modified and new file at its snapshot-relative path,
/// and `trail.txt` holds the narrative one entry per line.
pub fn store_report(dir: &Path, report: &QueryReport) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;
    write_json(&dir.join("report.json"), report)?;

    let files_root = dir.join("files");
    for (path, content) in report
        .modified_files
        .iter()
        .chain(report.new_files.iter())
    {
        let rel = sanitize_relative(path)?;
        let full = files_root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&full, content).with_context(|| format!("write {}", full.display()))?;
    }

    let mut trail = report.trail.join("\n");
    trail.push('\n');
    fs::write(dir.join("trail.txt"), trail).context("write trail.txt")?;

    info!(dir = %dir.display(), "report stored");
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize report")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
