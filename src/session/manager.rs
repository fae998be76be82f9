//! Session manager implementation

use super::{Message, MessageRole, Session, SessionId, SessionStore};
use crate::error::{ErrorCode, FlowError, Result};
use crate::workflow::WorkflowStage;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Owns the active session and persists it through a [`SessionStore`]
///
/// All mutation happens in memory; nothing reaches the store until
/// [`SessionManager::save_state`] is called.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    session: Session,
}

impl SessionManager {
    /// Create a manager on a freshly created session
    pub async fn new(store: Arc<dyn SessionStore>) -> Result<Self> {
        let record = store.create().await?;
        Ok(Self {
            store,
            session: Session::from_record(record),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn stage(&self) -> WorkflowStage {
        self.session.stage
    }

    /// Move to `stage`, refusing anything that is not a workflow edge
    pub fn set_stage(&mut self, stage: WorkflowStage) -> Result<()> {
        let current = self.session.stage;
        if !current.can_transition_to(stage) {
            return Err(FlowError::session_with_code(
                ErrorCode::SESSION_INVALID_STATE,
                format!("Cannot move from {} to {}", current, stage),
                Some(self.session.id.to_string()),
            ));
        }
        if current != stage {
            info!("State transition: {} -> {}", current, stage);
        }
        self.session.stage = stage;
        Ok(())
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.session.message_log.push(Message::new(role, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.session.message_log
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.session.context
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.session.context.get(key)
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.session.context.insert(key.into(), value);
    }

    pub fn clear_context(&mut self) {
        self.session.context.clear();
    }

    pub fn display_name(&self) -> &str {
        &self.session.display_name
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.session.display_name = name.into();
    }

    /// Persist stage, message log, context and display name
    pub async fn save_state(&self) -> Result<()> {
        self.store.save(&self.session.to_record()).await?;
        info!("Session saved: {}", self.session.id);
        Ok(())
    }

    /// Replace the active session with a stored one
    ///
    /// With no id, the most recently saved session other than the active one
    /// is chosen. On any failure the current in-memory session is left
    /// untouched.
    pub async fn load_state(&mut self, id: Option<&SessionId>) -> Result<()> {
        let record = match id {
            Some(id) => self.store.get(id).await?.ok_or_else(|| {
                FlowError::session_with_code(
                    ErrorCode::SESSION_NOT_FOUND,
                    "Session not found",
                    Some(id.to_string()),
                )
            })?,
            None => self
                .store
                .list()
                .await?
                .into_iter()
                .find(|record| record.session_id != self.session.id)
                .ok_or_else(|| {
                    FlowError::session_with_code(
                        ErrorCode::SESSION_NOT_FOUND,
                        "No saved sessions",
                        None,
                    )
                })?,
        };

        self.session = Session::from_record(record);
        info!(
            "Session loaded: {} ({})",
            self.session.display_name, self.session.id
        );
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InMemorySessionStore, SessionRecord, DEFAULT_DISPLAY_NAME};
    use serde_json::json;

    async fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemorySessionStore::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_session_defaults() {
        let manager = manager().await;
        assert_eq!(manager.stage(), WorkflowStage::Idle);
        assert!(manager.messages().is_empty());
        assert!(manager.context().is_empty());
        assert_eq!(manager.display_name(), DEFAULT_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn test_set_stage_rejects_skips() {
        let mut manager = manager().await;
        let err = manager.set_stage(WorkflowStage::Cleaning).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SESSION_INVALID_STATE);
        assert_eq!(manager.stage(), WorkflowStage::Idle);

        manager.set_stage(WorkflowStage::Ingesting).unwrap();
        assert_eq!(manager.stage(), WorkflowStage::Ingesting);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let mut manager = manager().await;
        manager.set_stage(WorkflowStage::Ingesting).unwrap();
        manager.add_message(MessageRole::System, "Data Profile: ok");
        manager.set_context("current_file", json!("sales.csv"));
        manager.set_display_name("Analysis of sales.csv");
        manager.save_state().await.unwrap();

        let id = manager.id().clone();
        let expected = manager.session().clone();

        let mut other = SessionManager::new(manager.store().clone()).await.unwrap();
        other.load_state(Some(&id)).await.unwrap();
        assert_eq!(other.session(), &expected);
    }

    #[tokio::test]
    async fn test_load_missing_keeps_current_session() {
        let mut manager = manager().await;
        manager.set_context("current_file", json!("a.csv"));
        let before = manager.session().clone();

        let missing = SessionId::parse("missing").unwrap();
        let err = manager.load_state(Some(&missing)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SESSION_NOT_FOUND);
        assert_eq!(manager.session(), &before);
    }

    #[tokio::test]
    async fn test_load_without_id_picks_most_recent() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut manager = SessionManager::new(store.clone()).await.unwrap();
        let now = chrono::Utc::now();

        for (id, offset) in [("older", -1), ("newest", 1)] {
            let mut record = SessionRecord::new(SessionId::parse(id).unwrap(), "tabflow", "user");
            record.updated_at = now + chrono::Duration::hours(offset);
            record.state.display_name = id.to_string();
            store.save(&record).await.unwrap();
        }

        manager.load_state(None).await.unwrap();
        assert_eq!(manager.id().as_str(), "newest");
        assert_eq!(manager.display_name(), "newest");
    }

    #[tokio::test]
    async fn test_load_without_id_skips_active_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut record = SessionRecord::new(SessionId::parse("yesterday").unwrap(), "tabflow", "user");
        record.updated_at = chrono::Utc::now() - chrono::Duration::days(1);
        store.save(&record).await.unwrap();

        let mut manager = SessionManager::new(store).await.unwrap();
        manager.load_state(None).await.unwrap();
        assert_eq!(manager.id().as_str(), "yesterday");
    }

    #[tokio::test]
    async fn test_load_without_any_sessions_fails() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut manager = SessionManager::new(store.clone()).await.unwrap();
        let own = manager.id().clone();
        store.delete(&own).await.unwrap();

        let err = manager.load_state(None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SESSION_NOT_FOUND);
        assert_eq!(manager.id(), &own);
    }
}
