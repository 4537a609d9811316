//! Pure, deterministic pipeline logic. No I/O.

pub mod classify;
pub mod imports;
pub mod standin;
pub mod types;
