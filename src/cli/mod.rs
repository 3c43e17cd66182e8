//! Command line interface for kodegen_release_manager.
//!
//! Parses arguments, wires the release manager to the system collaborators
//! and reports progress and errors on the terminal.

mod args;
pub mod commands;
mod console;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use commands::execute_command;
pub use console::ConsoleListener;
pub use output::OutputManager;

/// Main CLI entry point
pub fn run() -> anyhow::Result<i32> {
    let args = Args::parse_args();
    execute_command(args)
}
