//! Top-level import extraction from Python source.
//!
//! The analyzer answers one question: which top-level module names does a
//! snippet import? `import a.b.c` contributes `a`; `from a.b import c`
//! contributes `a`; aliases are ignored. Names appear once each, in first-seen
//! order. Import statements are collected anywhere in the tree, including
//! inside functions and `try` blocks.

use std::cell::RefCell;

use thiserror::Error;
use tree_sitter::{Node, Parser};

/// The source could not be parsed as Python.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("python syntax error at byte {offset}")]
pub struct ParseError {
    /// Byte offset of the first error node, 0 when unknown.
    pub offset: usize,
}

// Tree-sitter parsers are cheap to reuse but not to build, so each thread
// keeps one configured for Python.
thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut parser = Parser::new();
        let _ = parser.set_language(&tree_sitter_python::LANGUAGE.into());
        parser
    });
}

/// Collect the top-level module names imported by `source`.
pub fn analyze(source: &str) -> Result<Vec<String>, ParseError> {
    let tree = PYTHON_PARSER
        .with(|parser| parser.borrow_mut().parse(source, None))
        .ok_or(ParseError { offset: 0 })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseError {
            offset: first_error_offset(root),
        });
    }

    let mut names = Vec::new();
    collect_imports(root, source, &mut names);
    Ok(names)
}

fn collect_imports(root: Node, source: &str, names: &mut Vec<String>) {
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        match node.kind() {
            "import_statement" => {
                let mut entries = node.walk();
                for entry in node.children_by_field_name("name", &mut entries) {
                    let target = match entry.kind() {
                        "aliased_import" => entry.child_by_field_name("name"),
                        _ => Some(entry),
                    };
                    if let Some(target) = target {
                        push_first_segment(node_text(target, source), names);
                    }
                }
            }
            "import_from_statement" => {
                // `from a.b import c` contributes `a`; `from .mod import c`
                // contributes `mod`; a bare `from . import c` contributes
                // nothing.
                if let Some(module) = node.child_by_field_name("module_name") {
                    if let Some(dotted) = dotted_name_of(module) {
                        push_first_segment(node_text(dotted, source), names);
                    }
                }
            }
            _ => {}
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// The `dotted_name` carrying a module path, whether the node is already one
/// or a `relative_import` wrapping one.
fn dotted_name_of(module: Node) -> Option<Node> {
    if module.kind() == "dotted_name" {
        return Some(module);
    }
    let mut cursor = module.walk();
    let mut children = module.named_children(&mut cursor);
    children.find(|child| child.kind() == "dotted_name")
}

fn push_first_segment(dotted: &str, names: &mut Vec<String>) {
    let first = dotted.split('.').next().unwrap_or_default();
    if !first.is_empty() && !names.iter().any(|name| name == first) {
        names.push(first.to_string());
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn first_error_offset(root: Node) -> usize {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return node.start_byte();
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_plain_and_aliased_imports() {
        let source = "import os\nimport numpy as np\nimport json, sys\n";
        let names = analyze(source).expect("parse");
        assert_eq!(names, vec!["os", "numpy", "json", "sys"]);
    }

    #[test]
    fn dotted_imports_contribute_first_segment() {
        let names = analyze("import os.path\nfrom requests.sessions import Session\n")
            .expect("parse");
        assert_eq!(names, vec!["os", "requests"]);
    }

    #[test]
    fn from_imports_use_source_module_not_imported_names() {
        let names = analyze("from collections import OrderedDict, defaultdict\n").expect("parse");
        assert_eq!(names, vec!["collections"]);
    }

    #[test]
    fn relative_import_with_name_contributes_it() {
        let names = analyze("from .helpers import run\nfrom . import sibling\n").expect("parse");
        assert_eq!(names, vec!["helpers"]);
    }

    #[test]
    fn nested_imports_are_found() {
        let source = "def load():\n    try:\n        import yaml\n    except ImportError:\n        import json\n";
        let names = analyze(source).expect("parse");
        assert_eq!(names, vec!["yaml", "json"]);
    }

    #[test]
    fn duplicates_keep_first_seen_order() {
        let names = analyze("import os\nimport sys\nimport os\n").expect("parse");
        assert_eq!(names, vec!["os", "sys"]);
    }

    #[test]
    fn source_without_imports_yields_empty_list() {
        let names = analyze("x = 1\nprint(x)\n").expect("parse");
        assert!(names.is_empty());
        assert!(analyze("").expect("parse").is_empty());
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = analyze("def broken(:\n    pass\n").expect_err("should not parse");
        assert!(err.to_string().contains("syntax error"));
    }
}
