//! # CLI Behavior
//!
//! This is **one possible client** of the notekeep library. It is the only
//! place that knows about terminal I/O, exit codes and output formatting.
//!
//! ## Naked Execution
//!
//! Running `notekeep` with no subcommand lists every note, newest first.
//!
//! ## Output Modes
//!
//! Listing commands print a human table by default. `--json` switches to
//! machine-readable output (the same camelCase shape as export bundles).
//!
//! ## Module Structure
//!
//! - `setup`: argument parsing via clap
//! - `commands`: context setup and per-command handlers
//! - `print`: colored terminal rendering

mod commands;
mod print;
pub mod setup;

pub use commands::run;
