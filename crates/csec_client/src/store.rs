//! Persisted credential pair: one short-lived access token and one
//! long-lived refresh token, stored as JSON under the keys
//! `csec_access_token` and `csec_refresh_token`. The pair is set and
//! cleared together, never one half at a time.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(rename = "csec_access_token")]
    access: String,
    #[serde(rename = "csec_refresh_token")]
    refresh: String,
}

/// Process-wide credential store shared by the REST and streaming
/// clients. Mutations write through to disk before updating memory.
pub struct TokenStore {
    path: PathBuf,
    tokens: Mutex<Option<StoredTokens>>,
}

impl TokenStore {
    /// Open the store at `path`, loading any persisted pair. A missing
    /// file means logged out; an unreadable one is treated the same.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tokens = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(tokens) => Some(tokens),
                Err(err) => {
                    warn!(path = %path.display(), %err, "ignoring malformed token file");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            path,
            tokens: Mutex::new(tokens),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.lock().ok()?.as_ref().map(|t| t.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.lock().ok()?.as_ref().map(|t| t.refresh.clone())
    }

    /// Replace the stored pair. Persists first; memory is only updated
    /// once the file write succeeded.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        let tokens = StoredTokens {
            access: access.to_string(),
            refresh: refresh.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&tokens)?;
        std::fs::write(&self.path, contents)?;
        if let Ok(mut guard) = self.tokens.lock() {
            *guard = Some(tokens);
        }
        Ok(())
    }

    /// Drop both tokens and delete the backing file. Safe to call when
    /// already logged out.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        if let Ok(mut guard) = self.tokens.lock() {
            *guard = None;
        }
        Ok(())
    }
}

/// Token store persistence error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
