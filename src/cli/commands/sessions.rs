//! Session management commands

use crate::app::session_store;
use crate::cli::args::SessionCommands;
use crate::config::Settings;
use crate::error::{ErrorCode, FlowError};
use crate::session::{Session, SessionId};
use anyhow::Result;

/// Execute session-related commands
pub async fn run_sessions_command(command: SessionCommands, settings: &Settings) -> Result<()> {
    let store = session_store(settings);
    match command {
        SessionCommands::List => {
            let records = store.list().await?;
            if records.is_empty() {
                println!("No saved sessions.");
                return Ok(());
            }
            for record in records {
                let updated = record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();
                let session = Session::from_record(record);
                println!(
                    "{}  {:<10}  {}  {}",
                    session.id,
                    session.stage.as_str(),
                    updated,
                    session.display_name
                );
            }
        }
        SessionCommands::Delete { id } => {
            let id = SessionId::parse(id)?;
            if !store.delete(&id).await? {
                return Err(FlowError::session_with_code(
                    ErrorCode::SESSION_NOT_FOUND,
                    "Session not found",
                    Some(id.to_string()),
                )
                .into());
            }
            println!("Deleted session {}", id);
        }
    }
    Ok(())
}
