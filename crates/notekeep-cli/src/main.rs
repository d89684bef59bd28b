//! # Notekeep CLI
//!
//! The binary is intentionally thin: argument parsing, dispatch and
//! rendering live in `src/cli/`, and this file only invokes `cli::run()`
//! and turns an error into a non-zero exit.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/notekeep-cli/src/cli/)                   │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - context wiring + dispatch (commands.rs)                  │
//! │  - terminal rendering (print.rs)                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Façade (crates/notekeep/src/storage.rs)            │
//! │  - One async contract over SQLite or the key-value fallback │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything from the façade inward is UI agnostic. The CLI owns every
//! user-facing concern: stdout/stderr, colors, exit codes and the log
//! subscriber.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
