//! Persisted preview state: string keys mapped to JSON strings.
//!
//! The browser app keeps the same keys in local storage; this service mirrors them
//! behind `PreferenceStore` so the backend (memory, file, Redis) is swappable.
//! Mutation is last-writer-wins; no locking beyond what each backend needs.

pub mod file;
pub mod redis_store;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

pub use self::file::FileStore;
pub use self::redis_store::RedisStore;

// ────────────────────────────────────────────────────────────────────────────
// Key names
// ────────────────────────────────────────────────────────────────────────────

pub const KEY_SECTION_ORDER: &str = "cv-section-order";
pub const KEY_HIDDEN_SECTIONS: &str = "cv-hidden-sections";
pub const KEY_CUSTOMIZATION: &str = "cv-customization";
pub const KEY_RECRUITMENT_BANNER: &str = "cv-recruitment-banner";
pub const KEY_MAX_PAGES: &str = "cv-max-pages";
pub const KEY_MARGIN_TOP: &str = "cv-margin-top";
pub const KEY_MARGIN_BOTTOM: &str = "cv-margin-bottom";
pub const KEY_MARGIN_LEFT: &str = "cv-margin-left";
pub const KEY_MARGIN_RIGHT: &str = "cv-margin-right";
pub const KEY_PRESETS: &str = "cv-presets";
pub const KEY_FORM_DATA: &str = "cv-form-data";
pub const KEY_SPACING_SETTINGS: &str = "cv-spacing-settings";

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Store trait
// ────────────────────────────────────────────────────────────────────────────

/// Durable string-keyed, JSON-valued storage.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads and decodes a key, treating every failure as "absent".
///
/// Missing keys are silent; unreadable or malformed values are logged and dropped.
pub async fn load_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted state; using defaults");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Malformed persisted state; using defaults");
            None
        }
    }
}

/// Encodes `value` as JSON and writes it under `key`.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn PreferenceStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// Keys are fixed identifiers; anything outside `[a-z0-9-]` is rejected so a key can
/// never escape the file store directory or collide across Redis namespaces.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. State is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
