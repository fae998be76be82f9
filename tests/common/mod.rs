//! Common test utilities and helpers

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabflow::config::Settings;
use tabflow::llm::ScriptedModel;
use tabflow::orchestrator::Orchestrator;
use tabflow::session::{FileSessionStore, SessionManager, SessionStore};
use tabflow::workers::{WorkerDeps, WorkerRegistry};
use tempfile::TempDir;

pub const SALES_CSV: &str = "region,amount,units\nnorth,10,1\nsouth,,2\nnorth,10,1\neast,40,4\n";

/// A model reply carrying a cleaning plan for `code`
pub fn plan_reply(code: &str) -> String {
    serde_json::json!({"explanation": "test plan", "code": code}).to_string()
}

/// Temp data and session directories plus settings pointing at them
pub struct TestContext {
    temp_dir: TempDir,
    pub settings: Settings,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let settings = Settings {
            data_dir: temp_dir.path().join("data_storage"),
            session_dir: temp_dir.path().join("session_storage"),
            log_dir: temp_dir.path().join("logs"),
            ..Settings::default()
        };
        fs::create_dir_all(&settings.data_dir).expect("data dir");
        Self { temp_dir, settings }
    }

    pub fn with_dataset(self, name: &str, content: &str) -> Self {
        fs::write(self.settings.data_dir.join(name), content).expect("write dataset");
        self
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.settings.data_dir.join(name)
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::new(FileSessionStore::new(
            self.settings.session_dir.clone(),
            self.settings.app_name.clone(),
            self.settings.user_id.clone(),
        ))
    }

    pub async fn orchestrator(&self, model: Arc<ScriptedModel>) -> Orchestrator {
        let manager = SessionManager::new(self.store()).await.expect("session");
        self.orchestrator_for(manager, model)
    }

    pub fn orchestrator_for(&self, manager: SessionManager, model: Arc<ScriptedModel>) -> Orchestrator {
        let deps = WorkerDeps::new(Arc::new(self.settings.clone()), model);
        Orchestrator::new(manager, &WorkerRegistry::with_builtins(), &deps)
    }
}
