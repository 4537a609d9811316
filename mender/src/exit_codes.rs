//! Stable exit codes for mender CLI commands.

/// Command succeeded; for `mender run`, every task ended green.
pub const OK: i32 = 0;
/// Command failed due to invalid arguments/config or an internal error.
pub const INVALID: i32 = 1;
/// `mender run` finished with failing tests, or the `mender exec` snippet
/// exited nonzero.
pub const FAILING: i32 = 2;
