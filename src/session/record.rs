//! Persisted session record and the live session built from it

use super::SessionId;
use crate::workflow::WorkflowStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_DISPLAY_NAME: &str = "Untitled Session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
    Assistant,
}

/// One entry of the message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The state blob stored inside a record
///
/// Every field has a default, so a blob written by a freshly created
/// session (or an older record missing fields) still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub stage: WorkflowStage,
    pub message_log: Vec<Message>,
    pub context: BTreeMap<String, Value>,
    pub display_name: String,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            stage: WorkflowStage::Idle,
            message_log: Vec::new(),
            context: BTreeMap::new(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
        }
    }
}

/// One self-contained session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub app_name: String,
    pub user_id: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub state: SessionSnapshot,
}

impl SessionRecord {
    pub fn new(session_id: SessionId, app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id,
            app_name: app_name.into(),
            user_id: user_id.into(),
            updated_at: Utc::now(),
            state: SessionSnapshot::default(),
        }
    }
}

/// The active session held by the manager
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub app_name: String,
    pub user_id: String,
    pub stage: WorkflowStage,
    pub message_log: Vec<Message>,
    pub context: BTreeMap<String, Value>,
    pub display_name: String,
}

impl Session {
    pub fn from_record(record: SessionRecord) -> Self {
        let SessionRecord {
            session_id,
            app_name,
            user_id,
            state,
            ..
        } = record;

        Self {
            id: session_id,
            app_name,
            user_id,
            stage: state.stage,
            message_log: state.message_log,
            context: state.context,
            display_name: state.display_name,
        }
    }

    /// Capture the persisted portion of this session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.stage,
            message_log: self.message_log.clone(),
            context: self.context.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// Build the record to persist, stamped with the current time
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.id.clone(),
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            updated_at: Utc::now(),
            state: self.snapshot(),
        }
    }
}
