//! Sandbox tests against a real interpreter.
//!
//! These need `python3` on the PATH and skip themselves when it is absent,
//! so the scripted-runner suites stay authoritative on machines without one.

use std::process::Command;
use std::time::{Duration, Instant};

use mender::io::config::SandboxConfig;
use mender::io::sandbox::{Sandbox, TIMEOUT_MESSAGE};
use mender::test_support::codebase;

fn skip_without_python3() -> bool {
    let missing = Command::new("python3").arg("--version").output().is_err();
    if missing {
        eprintln!("skipping: python3 not on PATH");
    }
    missing
}

#[test]
fn snippet_imports_codebase_modules_and_prints() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());
    let base = codebase(&[("calculator.py", "def add(a, b):\n    return a + b\n")]);

    let result = sandbox.run("from calculator import add\nprint(add(1, 3))\n", &base);

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "4");
    assert!(result.stand_ins_used.is_empty());
}

#[test]
fn package_layout_is_importable() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());
    let base = codebase(&[
        ("pkg/__init__.py", ""),
        ("pkg/mod.py", "def f():\n    return 7\n"),
    ]);

    let result = sandbox.run("from pkg.mod import f\nprint(f())\n", &base);

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "7");
}

#[test]
fn unknown_import_gets_a_stand_in() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());
    let base = codebase(&[("calculator.py", "def add(a, b):\n    return a + b\n")]);
    let snippet = "import numpy_like_fake_pkg\nfrom calculator import add\nprint(add(1, 3))\n";

    let result = sandbox.run(snippet, &base);

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "4");
    assert_eq!(result.stand_ins_used.len(), 1);
    assert!(result.stand_ins_used.contains("numpy_like_fake_pkg"));
}

/// Python identifiers are not limited to ASCII; a non-ASCII module name
/// must be stood in like any other unknown import.
#[test]
fn non_ascii_import_gets_a_stand_in() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());

    let result = sandbox.run("import café\nprint('ok')\n", &codebase(&[]));

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "ok");
    assert_eq!(result.stand_ins_used.len(), 1);
    assert!(result.stand_ins_used.contains("café"));
}

#[test]
fn stand_in_absorbs_attribute_and_call_chains() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());
    let snippet = "\
import fakepkg_qr
from fakepkg_qr import helper

fakepkg_qr.sub.fn(1)
helper('x', key=2)
value = fakepkg_qr.config.threshold
print('ok')
";

    let result = sandbox.run(snippet, &codebase(&[]));

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "ok");
    assert!(result.stand_ins_used.contains("fakepkg_qr"));
}

#[test]
fn stdlib_imports_are_not_stood_in() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());

    let result = sandbox.run("import json\nprint(json.dumps([1, 2]))\n", &codebase(&[]));

    assert!(result.success, "output: {}", result.output);
    assert_eq!(result.output.trim(), "[1, 2]");
    assert!(result.stand_ins_used.is_empty());
}

#[test]
fn failing_snippet_reports_stderr() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());

    let result = sandbox.run("raise ValueError('boom')\n", &codebase(&[]));

    assert!(!result.success);
    assert!(result.output.contains("ValueError: boom"), "output: {}", result.output);
}

/// An unparseable snippet gets no stand-ins; the interpreter reports the
/// syntax error as the run output.
#[test]
fn syntax_error_surfaces_from_the_interpreter() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());

    let result = sandbox.run("def broken(:\n", &codebase(&[]));

    assert!(!result.success);
    assert!(result.output.contains("SyntaxError"), "output: {}", result.output);
    assert!(result.stand_ins_used.is_empty());
}

#[test]
fn runaway_snippet_is_cut_off_at_the_budget() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig {
        timeout_secs: 1,
        ..SandboxConfig::default()
    });

    let started = Instant::now();
    let result = sandbox.run("while True:\n    pass\n", &codebase(&[]));

    assert!(!result.success);
    assert_eq!(result.output, TIMEOUT_MESSAGE);
    assert!(started.elapsed() < Duration::from_secs(8));
}

/// Each run resolves modules in a fresh directory: a stand-in installed for
/// one run must not satisfy the same import in a later run where the
/// classifier no longer calls it external.
#[test]
fn stand_ins_do_not_leak_across_runs() {
    if skip_without_python3() {
        return;
    }
    let sandbox = Sandbox::new(SandboxConfig::default());

    let first = sandbox.run("import fakepkg_zq\nprint('ok')\n", &codebase(&[]));
    assert!(first.success, "output: {}", first.output);
    assert!(first.stand_ins_used.contains("fakepkg_zq"));

    // The loose path match now claims the module, so no stand-in is made
    // and the import must fail for real.
    let base = codebase(&[("fakepkg_zq_utils/helpers.py", "H = 1\n")]);
    let second = sandbox.run("import fakepkg_zq\nprint('ok')\n", &base);

    assert!(!second.success);
    assert!(second.stand_ins_used.is_empty());
    assert!(
        second.output.contains("ModuleNotFoundError"),
        "output: {}",
        second.output
    );
}
