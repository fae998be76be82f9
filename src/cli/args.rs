//! CLI argument structures

use crate::config::Settings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Guided tabular data workflows: ingest, clean, analyze, report
#[derive(Parser)]
#[command(name = "tabflow")]
#[command(about = "tabflow - Guided data workflows: ingest, clean, analyze, report", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file applied after the global and local tabflow.toml
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the datasets
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding saved sessions
    #[arg(long, global = true, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply directory flags on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(dir) = &self.session_dir {
            settings.session_dir = dir.clone();
        }
    }

    /// Whether this invocation runs the interactive loop
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Commands::Run { .. }))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive workflow (default command)
    #[command(name = "run")]
    Run {
        /// Resume the session with this id
        #[arg(long, value_name = "SESSION_ID", conflicts_with = "resume")]
        session: Option<String>,

        /// Resume the most recently saved session
        #[arg(long)]
        resume: bool,

        /// Do not write a per-session log file
        #[arg(long)]
        no_session_log: bool,
    },

    /// Manage saved sessions
    #[command(name = "sessions")]
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List the datasets available for ingestion
    #[command(name = "datasets")]
    Datasets,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List saved sessions, most recent first
    List,
    /// Delete a saved session
    Delete {
        /// Session id to delete
        id: String,
    },
}
