//! Command execution.
//!
//! Release goals run through the [`ReleaseManager`](crate::manager::ReleaseManager);
//! `status` only reads persisted state.

mod goals;
mod status;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::ReleaseError;

use goals::execute_goal;
use status::execute_status;

/// Execute the command and return the process exit code
pub fn execute_command(args: Args) -> anyhow::Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Status { json } => execute_status(&args, &config, *json),
        _ => execute_goal(&args, &config),
    };

    match result {
        Ok(()) => {
            config.success_println(&format!("Command '{}' completed successfully", args.command.name()));
            Ok(0)
        }
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {:#}", args.command.name(), e));

            // Show recovery suggestions if available
            if let Some(release_error) = e.downcast_ref::<ReleaseError>() {
                let suggestions = release_error.recovery_suggestions();
                if !suggestions.is_empty() {
                    config.println("\n💡 Recovery suggestions:");
                    for suggestion in suggestions {
                        config.println(&format!("  • {}", suggestion));
                    }
                }
            }

            Ok(1)
        }
    }
}
