//! Session storage backend implementations

use super::{SessionId, SessionRecord};
use crate::error::{ErrorCode, FlowError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Trait for session storage backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new empty session
    async fn create(&self) -> Result<SessionRecord>;

    /// Load a session; `None` when no record exists
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// List every readable session, most recently saved first
    async fn list(&self) -> Result<Vec<SessionRecord>>;

    /// Delete a session; returns whether a record was removed
    async fn delete(&self, id: &SessionId) -> Result<bool>;

    /// Replace the stored record for `record.session_id`
    async fn save(&self, record: &SessionRecord) -> Result<()>;
}

fn sort_most_recent_first(records: &mut [SessionRecord]) {
    records.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
}

/// File-based session storage: one `<id>.json` per session
pub struct FileSessionStore {
    base_path: PathBuf,
    app_name: String,
    user_id: String,
}

impl FileSessionStore {
    pub fn new(
        base_path: impl Into<PathBuf>,
        app_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            app_name: app_name.into(),
            user_id: user_id.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    async fn read_record(&self, id: &SessionId, path: &Path) -> Result<SessionRecord> {
        let json = fs::read_to_string(path).await.map_err(|e| {
            FlowError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                "Failed to read session file",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;

        serde_json::from_str(&json).map_err(|e| {
            FlowError::session_with_code(
                ErrorCode::SESSION_CORRUPTED,
                "Session file is not a valid record",
                Some(id.to_string()),
            )
            .with_source(e)
        })
    }
}

/// Replace `path` with `bytes` so readers see either the old or the new file
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self) -> Result<SessionRecord> {
        let record = SessionRecord::new(SessionId::new(), &self.app_name, &self.user_id);
        self.save(&record).await?;
        debug!("Created session {}", record.session_id);
        Ok(record)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let path = self.session_path(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        self.read_record(id, &path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<SessionRecord>> {
        let mut records = Vec::new();

        if !fs::try_exists(&self.base_path).await.unwrap_or(false) {
            return Ok(records);
        }

        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(id) = SessionId::parse(stem) else {
                debug!("Skipping non-session file {}", path.display());
                continue;
            };

            match self.read_record(&id, &path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable session {}: {}", id, e),
            }
        }

        sort_most_recent_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        let path = self.session_path(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        Ok(true)
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;

        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            FlowError::storage_with_code(
                ErrorCode::STORAGE_SERIALIZATION_ERROR,
                "Failed to serialize session",
                None,
            )
            .with_source(e)
        })?;

        let path = self.session_path(&record.session_id);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &json))
            .await
            .map_err(|e| FlowError::storage("Session write task failed").with_source(e))?
            .map_err(|e| {
                FlowError::storage_with_code(
                    ErrorCode::STORAGE_IO_ERROR,
                    "Failed to write session file",
                    Some(path),
                )
                .with_source(e)
            })
    }
}

/// In-memory storage for tests and ephemeral runs
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    app_name: String,
    user_id: String,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            app_name: "tabflow".to_string(),
            user_id: "user".to_string(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> Result<SessionRecord> {
        let record = SessionRecord::new(SessionId::new(), &self.app_name, &self.user_id);
        self.save(&record).await?;
        Ok(record)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<SessionRecord>> {
        let mut records: Vec<_> = self.sessions.read().await.values().cloned().collect();
        sort_most_recent_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }
}
