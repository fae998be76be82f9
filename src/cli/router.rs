//! Command routing and execution

use crate::app::{SessionChoice, SessionLogWriter};
use crate::cli::args::{Cli, Commands};
use crate::cli::commands::*;
use crate::config::ConfigLoader;
use crate::session::SessionId;
use anyhow::Result;
use std::sync::Arc;

/// Load settings and execute the parsed command
pub async fn execute_command(cli: Cli, log_writer: Option<SessionLogWriter>) -> Result<()> {
    let mut settings = ConfigLoader::load(cli.config.as_deref()).await?;
    cli.apply_overrides(&mut settings);

    match cli.command {
        None => run_interactive(Arc::new(settings), SessionChoice::New, log_writer).await,
        Some(Commands::Run {
            session, resume, ..
        }) => {
            let choice = match (session, resume) {
                (Some(id), _) => SessionChoice::Resume(Some(SessionId::parse(id)?)),
                (None, true) => SessionChoice::Resume(None),
                (None, false) => SessionChoice::New,
            };
            run_interactive(Arc::new(settings), choice, log_writer).await
        }
        Some(Commands::Sessions { command }) => run_sessions_command(command, &settings).await,
        Some(Commands::Datasets) => run_datasets_command(&settings),
    }
}
