//! Regression tests for the `apiforge` binary.
//!
//! The tests drive the CLI as a subprocess against the design files in
//! `tests/fixtures`.

#[cfg(test)]
pub mod cli;
