//! Command implementation modules
//!
//! Each command is implemented as a separate module.

pub mod datasets;
pub mod run;
pub mod sessions;

pub use datasets::run_datasets_command;
pub use run::{run_interactive, LoopCommand};
pub use sessions::run_sessions_command;
