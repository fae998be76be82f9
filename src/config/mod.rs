//! Runtime settings for tabflow
//!
//! Settings are resolved once at startup by [`ConfigLoader`] and shared as an
//! `Arc<Settings>` with every component that needs them. Nothing in this
//! module touches process-wide state.

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod credentials;
pub mod loader;

pub use credentials::CredentialRing;
pub use loader::ConfigLoader;

use crate::sandbox::ExecutorLimits;

/// Default file name looked up in the global and working directories
pub const CONFIG_FILE_NAME: &str = "tabflow.toml";

/// Get the global tabflow directory for storing configuration
pub fn get_global_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "tabflow", "tabflow")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the tabular datasets offered to the operator
    pub data_dir: PathBuf,
    /// Directory holding one JSON record per session
    pub session_dir: PathBuf,
    /// Directory for per-session log files
    pub log_dir: PathBuf,
    /// Owning application tag written into session records
    pub app_name: String,
    /// Owning user tag written into session records
    pub user_id: String,
    /// Language model identifier
    pub model: String,
    /// Base URL of the language model REST API
    pub api_base: String,
    /// API keys, used round-robin
    pub api_keys: Vec<String>,
    /// Upper bound on a single language model call
    pub llm_timeout_secs: u64,
    /// Limits applied to generated transformation code
    pub executor: ExecutorLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_storage"),
            session_dir: PathBuf::from("session_storage"),
            log_dir: PathBuf::from("logs"),
            app_name: "tabflow".to_string(),
            user_id: "user".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_keys: Vec::new(),
            llm_timeout_secs: 120,
            executor: ExecutorLimits::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `TABFLOW_*` environment overrides
    pub fn merge_env_vars(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Split out from [`Settings::merge_env_vars`] so tests can feed values
    /// without mutating the process environment.
    pub fn merge_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup("TABFLOW_API_KEYS").or_else(|| lookup("GEMINI_API_KEYS")) {
            let parsed = parse_key_list(&keys);
            if !parsed.is_empty() {
                self.api_keys = parsed;
            }
        }

        if let Some(model) = lookup("TABFLOW_MODEL") {
            self.model = model;
        }

        if let Some(dir) = lookup("TABFLOW_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("TABFLOW_SESSION_DIR") {
            self.session_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("TABFLOW_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }

        if let Some(timeout) = lookup("TABFLOW_LLM_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(value) if value > 0 => self.llm_timeout_secs = value,
                _ => tracing::warn!("Ignoring invalid TABFLOW_LLM_TIMEOUT_SECS: {}", timeout),
            }
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Build the key rotation used by the language model client
    pub fn credential_ring(&self) -> CredentialRing {
        CredentialRing::new(self.api_keys.clone())
    }

    /// Directory for per-session log files
    pub fn session_log_dir(&self) -> PathBuf {
        self.log_dir.join("sessions")
    }
}

fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.data_dir, PathBuf::from("data_storage"));
        assert_eq!(settings.session_dir, PathBuf::from("session_storage"));
        assert_eq!(settings.llm_timeout(), Duration::from_secs(120));
        assert!(settings.api_keys.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.merge_from(lookup_from(&[
            ("TABFLOW_API_KEYS", " k1, ,k2 "),
            ("TABFLOW_MODEL", "gemini-pro"),
            ("TABFLOW_DATA_DIR", "/tmp/data"),
            ("TABFLOW_LLM_TIMEOUT_SECS", "30"),
        ]));

        assert_eq!(settings.api_keys, vec!["k1".to_string(), "k2".to_string()]);
        assert_eq!(settings.model, "gemini-pro");
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(settings.llm_timeout_secs, 30);
    }

    #[test]
    fn test_legacy_key_variable_and_bad_timeout() {
        let mut settings = Settings::default();
        settings.merge_from(lookup_from(&[
            ("GEMINI_API_KEYS", "legacy"),
            ("TABFLOW_LLM_TIMEOUT_SECS", "zero"),
        ]));

        assert_eq!(settings.api_keys, vec!["legacy".to_string()]);
        assert_eq!(settings.llm_timeout_secs, 120);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
data_dir = "datasets"
api_keys = ["a"]

[executor]
max_statements = 10
"#,
        )
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("datasets"));
        assert_eq!(settings.session_dir, PathBuf::from("session_storage"));
        assert_eq!(settings.executor.max_statements, 10);
        assert_eq!(
            settings.executor.max_output_bytes,
            ExecutorLimits::default().max_output_bytes
        );
    }
}
