//! Scoped key/value persistence
//!
//! One record per key: the secure token record, the language preference,
//! and one record per cache domain (`tablesStore`, `menuStore`,
//! `draftOrder`). Records are written on every successful population and
//! read once at process start.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Key of the secure token record
pub const KEY_AUTH_TOKEN: &str = "authToken";
/// Key of the language preference record
pub const KEY_LANGUAGE: &str = "language";
/// Key of the tables cache record
pub const KEY_TABLES_STORE: &str = "tablesStore";
/// Key of the menu cache record
pub const KEY_MENU_STORE: &str = "menuStore";
/// Key of the draft order record
pub const KEY_DRAFT_ORDER: &str = "draftOrder";

/// String-record store scoped to this client installation
pub trait ScopedStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn put(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn delete(&self, key: &str) -> Result<(), ClientError>;
}

/// Read a JSON record
pub fn read_record<T: DeserializeOwned>(
    store: &dyn ScopedStore,
    key: &str,
) -> Result<Option<T>, ClientError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Write a JSON record
pub fn write_record<T: Serialize>(
    store: &dyn ScopedStore,
    key: &str,
    value: &T,
) -> Result<(), ClientError> {
    let raw = serde_json::to_string_pretty(value)?;
    store.put(key, &raw)
}

/// Persisted cache envelope: payload tagged with the restaurant it was
/// fetched for and when
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    pub restaurant_id: Option<String>,
    pub last_updated_at: u64,
}

/// File-backed store: one JSON file per key under a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> Result<(), ClientError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ClientError::Persistence(format!("create {:?}: {}", self.dir, e)))
    }
}

impl ScopedStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| ClientError::Persistence(format!("read {:?}: {}", path, e)))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.ensure_dir()?;
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .map_err(|e| ClientError::Persistence(format!("write {:?}: {}", path, e)))
    }

    fn delete(&self, key: &str) -> Result<(), ClientError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| ClientError::Persistence(format!("delete {:?}: {}", path, e)))?;
        }
        Ok(())
    }
}

/// In-memory store (tests)
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ClientError> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Secure record holding the session token
///
/// Persistence failures are reported but never block the in-memory session:
/// a token that could not be written is still used for the remainder of the
/// process lifetime.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn ScopedStore>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    saved_at: u64,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn ScopedStore>) -> Self {
        Self { store }
    }

    pub fn save_token(&self, token: &str) -> Result<(), ClientError> {
        let record = TokenRecord {
            token: token.to_string(),
            saved_at: shared::util::now_millis(),
        };
        write_record(self.store.as_ref(), KEY_AUTH_TOKEN, &record)
    }

    pub fn load_token(&self) -> Result<Option<String>, ClientError> {
        Ok(read_record::<TokenRecord>(self.store.as_ref(), KEY_AUTH_TOKEN)?.map(|r| r.token))
    }

    pub fn clear_token(&self) -> Result<(), ClientError> {
        self.store.delete(KEY_AUTH_TOKEN)
    }

    /// Language preference record
    pub fn save_language(&self, language: &str) -> Result<(), ClientError> {
        self.store.put(KEY_LANGUAGE, language)
    }

    pub fn load_language(&self) -> Result<Option<String>, ClientError> {
        self.store.get(KEY_LANGUAGE)
    }
}
