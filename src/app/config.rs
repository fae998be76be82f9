//! Process-level options from the command line

use anyhow::Result;
use std::path::PathBuf;

/// Options that shape the process rather than the workflow
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for console logging
    pub verbose: u8,
    /// Working directory
    pub working_dir: PathBuf,
    /// Write a per-session log file
    pub session_logs: bool,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get current directory: {}", e))?;

        Ok(Self {
            verbose,
            working_dir,
            session_logs: true,
        })
    }

    pub fn with_session_logs(mut self, enabled: bool) -> Self {
        self.session_logs = enabled;
        self
    }

    /// Console filter for the verbosity level
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace,hyper=debug,reqwest=debug",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            session_logs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_verbosity() {
        let levels: Vec<&str> = (0..4)
            .map(|verbose| {
                AppConfig {
                    verbose,
                    ..AppConfig::default()
                }
                .log_level()
            })
            .collect();
        assert_eq!(levels[..3], ["warn", "info", "debug"]);
        assert!(levels[3].starts_with("trace"));
    }
}
