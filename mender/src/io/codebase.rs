//! Loading a snapshot of Python sources from disk.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::core::types::Codebase;

/// Read every `.py` file under `root` into an in-memory snapshot.
///
/// Paths are stored relative to `root` with the separators the platform
/// produced. Traversal order is name-sorted so repeated loads of the same
/// tree build identical snapshots.
pub fn load_codebase(root: &Path) -> Result<Codebase> {
    let mut codebase = Codebase::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_none_or(|ext| ext != "py") {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("strip prefix from {}", entry.path().display()))?;
        let content = std::fs::read_to_string(entry.path())
            .with_context(|| format!("read {}", entry.path().display()))?;
        codebase.insert(rel.to_string_lossy().into_owned(), content);
    }
    debug!(files = codebase.len(), root = %root.display(), "loaded codebase");
    Ok(codebase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_only_python_files_with_relative_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a.py"), "A = 1\n").expect("write");
        std::fs::create_dir(temp.path().join("sub")).expect("mkdir");
        std::fs::write(temp.path().join("sub/b.py"), "B = 2\n").expect("write");
        std::fs::write(temp.path().join("notes.txt"), "not code").expect("write");

        let codebase = load_codebase(temp.path()).expect("load");

        let paths: Vec<&str> = codebase.paths().collect();
        assert_eq!(paths, ["a.py", "sub/b.py"]);
        assert_eq!(codebase.get("sub/b.py"), Some("B = 2\n"));
    }

    #[test]
    fn empty_directory_loads_empty_codebase() {
        let temp = tempfile::tempdir().expect("tempdir");
        let codebase = load_codebase(temp.path()).expect("load");
        assert!(codebase.is_empty());
    }
}
