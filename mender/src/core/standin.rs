//! Stand-in module synthesis for external dependencies.
//!
//! A stand-in is a generated Python package whose module object absorbs any
//! attribute access or call, so snippets importing an uninstalled dependency
//! still run. Rendering it as a real package (directory plus `__init__.py`)
//! lets the import machinery supply genuine `__name__`, `__file__`,
//! `__spec__`, and `__loader__` metadata instead of hand-faked values.
//!
//! A [`StandinSet`] lives for exactly one sandbox run; nothing here touches
//! process-global state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use thiserror::Error;

const MODULE_MARKER: &str = "__STANDIN_MODULE__";

const TEMPLATE: &str = r#""""Auto-generated stand-in for the external module '__STANDIN_MODULE__'."""


class _Sink:
    """Absorbs attribute access and calls, producing further sinks."""

    def __init__(self, path):
        self._path = path

    def __call__(self, *args, **kwargs):
        return _Sink(self._path + "(...)")

    def __getattr__(self, name):
        if name.startswith("__") and name.endswith("__"):
            raise AttributeError(name)
        return _Sink(self._path + "." + name)

    def __repr__(self):
        return "<stand-in {}>".format(self._path)

    def __bool__(self):
        return True

    def __iter__(self):
        return iter(())

    def __len__(self):
        return 0


def __getattr__(name):
    return _Sink("__STANDIN_MODULE__." + name)
"#;

/// The name cannot be rendered as a Python module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{name}' is not a valid python module identifier")]
pub struct InvalidStandinName {
    pub name: String,
}

/// One synthesized placeholder module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standin {
    name: String,
}

impl Standin {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk location relative to the stand-in root: `<name>/__init__.py`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.name).join("__init__.py")
    }

    /// The module source for this stand-in.
    pub fn render(&self) -> String {
        TEMPLATE.replace(MODULE_MARKER, &self.name)
    }
}

/// Per-run registry of stand-ins, idempotent across repeated names.
#[derive(Debug, Default)]
pub struct StandinSet {
    entries: BTreeMap<String, Standin>,
}

impl StandinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, reusing the existing entry when already present.
    ///
    /// Accepts exactly the names Python accepts as identifiers, including
    /// non-ASCII ones.
    pub fn register(&mut self, name: &str) -> Result<&Standin, InvalidStandinName> {
        use std::sync::LazyLock;
        static IDENT_RE: LazyLock<regex::Regex> =
            LazyLock::new(|| regex::Regex::new(r"^[_\p{XID_Start}]\p{XID_Continue}*$").unwrap());

        if !IDENT_RE.is_match(name) {
            return Err(InvalidStandinName {
                name: name.to_string(),
            });
        }
        Ok(self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| Standin {
                name: name.to_string(),
            }))
    }

    /// All registered module names.
    pub fn names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Standin> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
