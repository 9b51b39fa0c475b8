//! Persistent key/value storage and the credential view on top of it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";

/// A flat string-to-string store that outlives the process.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, used by tests and when nothing should be persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON file store. Every mutation rewrites the whole file; the in-memory
/// view always reflects the last requested mutation even if the write failed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_local_dir().ok_or(StoreError::NoDirectory("data"))?;
        Ok(data_dir.join("feedchat").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// A bearer token and the username it was issued for.
///
/// A restored credential may lack a username if the store was written by
/// something else; a credential created by login always has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub username: Option<String>,
}

/// The `token`/`username` pair inside a [`KeyValueStore`].
pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn load(&self) -> Option<Credential> {
        let token = self.backend.get(TOKEN_KEY).filter(|t| !t.trim().is_empty())?;
        let username = self.backend.get(USERNAME_KEY).filter(|u| !u.is_empty());
        Some(Credential { token, username })
    }

    /// Writes both entries. If either write fails the pair is cleared again so a
    /// token is never left behind without its username.
    pub fn save(&mut self, token: &str, username: &str) -> Result<(), StoreError> {
        let result = self
            .backend
            .set(TOKEN_KEY, token)
            .and_then(|()| self.backend.set(USERNAME_KEY, username));
        if result.is_err() {
            let _ = self.clear();
        }
        result
    }

    /// Removes both entries, attempting the second even if the first fails.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let token = self.backend.remove(TOKEN_KEY);
        let username = self.backend.remove(USERNAME_KEY);
        token.and(username)
    }
}
