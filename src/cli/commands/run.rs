//! Interactive workflow loop

use crate::app::{
    build_model, build_orchestrator, open_session, session_store, SessionChoice, SessionLogWriter,
};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const HELP_TEXT: &str = "Commands:
  start        list available datasets
  <file.csv>   ingest a dataset
  clean        clean the ingested data
  analyze      analyze the cleaned data
  report       write the final report
  reset        start over (after the report)
  save         save the session
  status       show the session stage
  help         show this help
  exit | quit  save and leave
Anything else is answered as a question about the current dataset.";

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand<'a> {
    Empty,
    Exit,
    Save,
    Status,
    Help,
    Route(&'a str),
}

impl<'a> LoopCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => LoopCommand::Empty,
            "exit" | "quit" => LoopCommand::Exit,
            "save" => LoopCommand::Save,
            "status" => LoopCommand::Status,
            "help" => LoopCommand::Help,
            _ => LoopCommand::Route(trimmed),
        }
    }
}

/// Run the prompt loop until exit, end of input or Ctrl-C
pub async fn run_interactive(
    settings: Arc<Settings>,
    choice: SessionChoice,
    log_writer: Option<SessionLogWriter>,
) -> Result<()> {
    let manager = open_session(session_store(&settings), &choice).await?;
    if let Some(writer) = &log_writer {
        match writer.switch_to(&settings.session_log_dir(), manager.id()) {
            Ok(path) => info!("Session log: {}", path.display()),
            Err(e) => warn!("Session log unavailable: {}", e),
        }
    }

    let model = build_model(&settings)?;
    let mut orchestrator = build_orchestrator(settings.clone(), model, manager);

    println!(
        "Session {} ({})\n{}",
        orchestrator.manager().id(),
        orchestrator.manager().display_name(),
        orchestrator.stage().default_prompt()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("Interrupted at prompt");
                None
            }
        };
        let Some(line) = line else {
            save(&orchestrator).await;
            break;
        };

        match LoopCommand::parse(&line) {
            LoopCommand::Empty => continue,
            LoopCommand::Exit => {
                save(&orchestrator).await;
                break;
            }
            LoopCommand::Save => save(&orchestrator).await,
            LoopCommand::Status => println!("{}", status_line(&orchestrator)),
            LoopCommand::Help => println!("{}", HELP_TEXT),
            LoopCommand::Route(input) => {
                let reply = orchestrator.route(input).await;
                println!("\n→ {}\n", reply);
            }
        }
    }
    Ok(())
}

async fn save(orchestrator: &Orchestrator) {
    match orchestrator.manager().save_state().await {
        Ok(()) => println!("Session saved: {}", orchestrator.manager().id()),
        Err(e) => eprintln!("{}", e.user_message()),
    }
}

fn status_line(orchestrator: &Orchestrator) -> String {
    let manager = orchestrator.manager();
    format!(
        "Session {} ({}) | stage {} | file {}",
        manager.id(),
        manager.display_name(),
        manager.stage(),
        orchestrator
            .refs()
            .current_file
            .as_deref()
            .unwrap_or("none")
    )
}
