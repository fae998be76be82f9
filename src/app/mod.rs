//! Application module
//!
//! Process-level concerns of the binary: command-line options, logging,
//! startup wiring and fatal error reporting.

pub mod config;
pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use error_handling::{handle_fatal_error, report_fatal_error};
pub use logging::{init_logging, SessionLogWriter};
pub use runtime::{build_model, build_orchestrator, open_session, session_store, SessionChoice};
