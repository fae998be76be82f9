//! Round-robin API key rotation

use std::sync::atomic::{AtomicUsize, Ordering};

/// Cycles through the configured API keys
///
/// Rotation only happens when a caller asks for the next key.
#[derive(Debug, Default)]
pub struct CredentialRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Return the next key, advancing the rotation
    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(self.keys[index].as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
