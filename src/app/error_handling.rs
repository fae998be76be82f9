//! Fatal error reporting for the binary

use crate::error::FlowError;
use tracing::error;

/// Print a fatal error and exit with a code derived from it
///
/// `FlowError` shows its user message, plus the full chain when
/// `verbose >= 1`. Other errors print their chain in verbose mode and exit
/// with 1.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    std::process::exit(report_fatal_error(&error, verbose))
}

/// Write the error report to stderr and return the exit code
pub fn report_fatal_error(error: &anyhow::Error, verbose: u8) -> i32 {
    if let Some(flow_err) = error.downcast_ref::<FlowError>() {
        eprintln!("{}", flow_err.user_message());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", flow_err.developer_message());
        }
        return flow_err.exit_code();
    }

    eprintln!("Error: {error}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }
    1
}
