//! `ace-cli` library crate.
//!
//! Command definitions live here so integration tests can drive them;
//! the binary entrypoint lives in `main.rs`.

pub mod commands;
