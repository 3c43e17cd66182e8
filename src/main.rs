//! Kodegen Release Manager - phased, resumable releases for Cargo workspaces.
//!
//! This binary runs release goals (prepare, perform, rollback, branch,
//! update-versions) against the workspace in the current directory.

use kodegen_release_manager::cli;
use kodegen_release_manager::cli::OutputManager;
use kodegen_release_manager::error::ReleaseError;
use std::process;

fn main() {
    env_logger::init();

    match cli::run() {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Create output manager for error display (never quiet for fatal errors)
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e:#}"));

            // Show recovery suggestions for critical errors
            if let Some(release_error) = e.downcast_ref::<ReleaseError>() {
                let suggestions = release_error.recovery_suggestions();
                if !suggestions.is_empty() {
                    let _ = output.println("\n💡 Recovery suggestions:");
                    for suggestion in suggestions {
                        let _ = output.indent(&suggestion);
                    }
                }
            }

            process::exit(1);
        }
    }
}
