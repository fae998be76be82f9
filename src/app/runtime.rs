//! Startup wiring: session store, active session and orchestrator

use crate::config::Settings;
use crate::error::FlowError;
use crate::llm::{GeminiModel, LanguageModel};
use crate::orchestrator::Orchestrator;
use crate::session::{FileSessionStore, SessionId, SessionManager, SessionStore};
use crate::workers::{WorkerDeps, WorkerRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Which session the interactive loop starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChoice {
    New,
    /// A specific session, or the most recent one when `None`
    Resume(Option<SessionId>),
}

pub fn session_store(settings: &Settings) -> Arc<dyn SessionStore> {
    Arc::new(FileSessionStore::new(
        settings.session_dir.clone(),
        settings.app_name.clone(),
        settings.user_id.clone(),
    ))
}

/// Create the manager and switch it to the chosen session
///
/// A successful resume deletes the placeholder session created on startup.
/// Resuming the most recent session when none exist keeps the fresh one.
pub async fn open_session(
    store: Arc<dyn SessionStore>,
    choice: &SessionChoice,
) -> Result<SessionManager, FlowError> {
    let mut manager = SessionManager::new(store.clone()).await?;
    let placeholder = manager.id().clone();
    match choice {
        SessionChoice::New => {}
        SessionChoice::Resume(Some(id)) => {
            if let Err(e) = manager.load_state(Some(id)).await {
                remove_placeholder(store.as_ref(), &placeholder).await;
                return Err(e);
            }
        }
        SessionChoice::Resume(None) => {
            if let Err(e) = manager.load_state(None).await {
                warn!("Nothing to resume, starting a new session: {}", e);
            }
        }
    }
    if manager.id() != &placeholder {
        remove_placeholder(store.as_ref(), &placeholder).await;
    }
    info!(
        "Active session {} ({}) at stage {}",
        manager.id(),
        manager.display_name(),
        manager.stage()
    );
    Ok(manager)
}

async fn remove_placeholder(store: &dyn SessionStore, placeholder: &SessionId) {
    if let Err(e) = store.delete(placeholder).await {
        warn!("Could not remove placeholder session {}: {}", placeholder, e);
    }
}

/// Language model client for the configured backend
pub fn build_model(settings: &Settings) -> Result<Arc<dyn LanguageModel>, FlowError> {
    if settings.api_keys.is_empty() {
        warn!("No API key configured; model-backed steps will fail until one is set");
    }
    Ok(Arc::new(GeminiModel::new(settings)?))
}

pub fn build_orchestrator(
    settings: Arc<Settings>,
    model: Arc<dyn LanguageModel>,
    manager: SessionManager,
) -> Orchestrator {
    let deps = WorkerDeps::new(settings, model);
    Orchestrator::new(manager, &WorkerRegistry::with_builtins(), &deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::{InMemorySessionStore, SessionRecord};
    use crate::workflow::WorkflowStage;
    use async_trait::async_trait;

    /// Store whose deletes always fail
    struct UndeletableStore(InMemorySessionStore);

    #[async_trait]
    impl SessionStore for UndeletableStore {
        async fn create(&self) -> Result<SessionRecord> {
            self.0.create().await
        }
        async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
            self.0.get(id).await
        }
        async fn list(&self) -> Result<Vec<SessionRecord>> {
            self.0.list().await
        }
        async fn delete(&self, _id: &SessionId) -> Result<bool> {
            Err(FlowError::storage("read-only directory"))
        }
        async fn save(&self, record: &SessionRecord) -> Result<()> {
            self.0.save(record).await
        }
    }

    #[tokio::test]
    async fn test_resume_latest_without_sessions_starts_fresh() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let manager = open_session(store, &SessionChoice::Resume(None))
            .await
            .unwrap();
        assert_eq!(manager.stage(), WorkflowStage::Idle);
    }

    #[tokio::test]
    async fn test_resume_removes_placeholder() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let mut earlier = SessionManager::new(store.clone()).await.unwrap();
        earlier.set_display_name("Analysis of sales.csv");
        earlier.save_state().await.unwrap();

        let manager = open_session(store.clone(), &SessionChoice::Resume(Some(earlier.id().clone())))
            .await
            .unwrap();
        assert_eq!(manager.display_name(), "Analysis of sales.csv");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_unknown_id_fails() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let id = SessionId::parse("missing").unwrap();
        assert!(open_session(store.clone(), &SessionChoice::Resume(Some(id)))
            .await
            .is_err());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_placeholder_cleanup_keeps_resume_error() {
        let store: Arc<dyn SessionStore> = Arc::new(UndeletableStore(InMemorySessionStore::new()));
        let id = SessionId::parse("missing").unwrap();
        let Err(err) = open_session(store.clone(), &SessionChoice::Resume(Some(id))).await else {
            panic!("resuming an unknown session should fail");
        };
        assert_eq!(err.code(), crate::error::ErrorCode::SESSION_NOT_FOUND);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_succeeds_when_placeholder_cannot_be_removed() {
        let store: Arc<dyn SessionStore> = Arc::new(UndeletableStore(InMemorySessionStore::new()));
        let mut earlier = SessionManager::new(store.clone()).await.unwrap();
        earlier.set_display_name("Analysis of sales.csv");
        earlier.save_state().await.unwrap();

        let manager = open_session(store, &SessionChoice::Resume(Some(earlier.id().clone())))
            .await
            .unwrap();
        assert_eq!(manager.display_name(), "Analysis of sales.csv");
    }
}
