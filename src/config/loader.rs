use super::{get_global_config_dir, Settings, CONFIG_FILE_NAME};
use crate::error::{ErrorCode, FlowError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Resolves [`Settings`] from defaults, config files and the environment
///
/// Files are merged key by key, so a later file only overrides the keys it
/// sets.
pub struct ConfigLoader {
    merged: toml::Table,
    settings: Settings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            merged: toml::Table::new(),
            settings: Settings::default(),
        }
    }

    /// Load the standard layering: global file, then `./tabflow.toml`,
    /// then an explicit file if given, then environment overrides
    pub async fn load(explicit: Option<&Path>) -> Result<Settings, FlowError> {
        let mut loader = Self::new();

        if let Ok(global_dir) = get_global_config_dir() {
            loader.load_optional(&global_dir.join(CONFIG_FILE_NAME)).await?;
        }
        loader.load_optional(&PathBuf::from(CONFIG_FILE_NAME)).await?;

        if let Some(path) = explicit {
            loader.load_file(path).await?;
        }

        loader.settings.merge_env_vars();
        Ok(loader.settings)
    }

    /// Load a file if it exists
    pub async fn load_optional(&mut self, path: &Path) -> Result<(), FlowError> {
        if fs::try_exists(path).await.unwrap_or(false) {
            self.load_file(path).await?;
        }
        Ok(())
    }

    /// Load a file that must exist and layer it over what is already loaded
    pub async fn load_file(&mut self, path: &Path) -> Result<(), FlowError> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            FlowError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Cannot read {}", path.display()),
            )
            .with_source(e)
        })?;

        let layer: toml::Table = toml::from_str(&content).map_err(|e| {
            FlowError::config_with_code(
                ErrorCode::CONFIG_INVALID_TOML,
                format!("Invalid configuration in {}", path.display()),
            )
            .with_source(e)
        })?;

        let mut merged = self.merged.clone();
        merge_tables(&mut merged, layer);
        let settings: Settings = toml::Value::Table(merged.clone())
            .try_into()
            .map_err(|e| {
                FlowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("Invalid value in {}", path.display()),
                )
                .with_source(e)
            })?;

        self.merged = merged;
        self.settings = settings;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay `layer` onto `base`, descending into nested tables
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tabflow.toml");
        std::fs::write(&path, "model = \"custom\"\nllm_timeout_secs = 5\n").unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_file(&path).await.unwrap();

        assert_eq!(loader.settings().model, "custom");
        assert_eq!(loader.settings().llm_timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_missing_optional_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::new();
        loader
            .load_optional(&temp.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(loader.settings(), &Settings::default());
    }

    #[tokio::test]
    async fn test_invalid_toml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tabflow.toml");
        std::fs::write(&path, "model = [").unwrap();

        let mut loader = ConfigLoader::new();
        let err = loader.load_file(&path).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_TOML);
    }

    #[tokio::test]
    async fn test_later_file_only_overrides_its_keys() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let local = temp.path().join("local.toml");
        std::fs::write(
            &global,
            "data_dir = \"shared\"\nmodel = \"base\"\n[executor]\nmax_statements = 10\n",
        )
        .unwrap();
        std::fs::write(&local, "model = \"local\"\n[executor]\nmax_output_bytes = 512\n").unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_file(&global).await.unwrap();
        loader.load_file(&local).await.unwrap();

        let settings = loader.settings();
        assert_eq!(settings.data_dir, PathBuf::from("shared"));
        assert_eq!(settings.model, "local");
        assert_eq!(settings.executor.max_statements, 10);
        assert_eq!(settings.executor.max_output_bytes, 512);
    }

    #[tokio::test]
    async fn test_wrong_value_type_keeps_previous_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tabflow.toml");
        std::fs::write(&path, "llm_timeout_secs = \"soon\"\n").unwrap();

        let mut loader = ConfigLoader::new();
        let err = loader.load_file(&path).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
        assert_eq!(loader.settings(), &Settings::default());
    }
}
