//! Session persistence and the active-session manager
//!
//! A session is one operator's run through the workflow: its stage, the
//! message log and the context variables threaded between stages. Each
//! session is stored as one JSON record per id by a [`SessionStore`].

pub mod manager;
pub mod record;
pub mod storage;

pub use manager::SessionManager;
pub use record::{Message, MessageRole, Session, SessionRecord, SessionSnapshot, DEFAULT_DISPLAY_NAME};
pub use storage::{FileSessionStore, InMemorySessionStore, SessionStore};

use crate::error::{ErrorCode, FlowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a session
///
/// Ids become file names, so only ASCII letters, digits, `-` and `_` are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an id supplied from outside
    pub fn parse(id: impl Into<String>) -> Result<Self, FlowError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= 128
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(id))
        } else {
            Err(FlowError::session_with_code(
                ErrorCode::SESSION_INVALID_ID,
                format!("Invalid session id '{}'", id),
                None,
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid() {
        let id = SessionId::new();
        assert!(SessionId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        for bad in ["", "..", "../etc", "a/b", "a\\b", "x.json", "has space"] {
            let err = SessionId::parse(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::SESSION_INVALID_ID, "{}", bad);
        }
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<SessionId>("\"ok-id_1\"").is_ok());
        assert!(serde_json::from_str::<SessionId>("\"../../x\"").is_err());
    }
}
