use moka::sync::Cache;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Key the authentication token is stored under.
pub const AUTH_TOKEN_KEY: &str = "jhi-authenticationToken";

/// Key/value credential storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Session-scoped credentials, forgotten after an idle period.
pub struct SessionStore {
    cache: Cache<String, String>,
}

impl SessionStore {
    pub fn new(time_to_idle: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_idle(time_to_idle)
                .build(),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

impl CredentialStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.cache.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.cache.invalidate(key);
    }
}

/// Persistent credentials backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store. A missing or unreadable file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt credential file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) => {
                debug!("No credential file at {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!("Failed to create {}: {}", parent.display(), e);
                    return;
                }
            }
        }
        let content = match serde_json::to_string_pretty(entries) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to serialize credentials: {}", e);
                return;
            }
        };
        let tmp = self.path.with_extension("tmp");
        let written = std::fs::write(&tmp, content).and_then(|_| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            error!("Failed to write credential file {}: {}", self.path.display(), e);
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.remove(key).is_some() {
                self.persist(&entries);
            }
        }
    }
}

/// Local-first, session-fallback token lookup.
#[derive(Clone)]
pub struct Credentials {
    local: Arc<dyn CredentialStore>,
    session: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(local: Arc<dyn CredentialStore>, session: Arc<dyn CredentialStore>) -> Self {
        Self { local, session }
    }

    /// The access token, if either store holds a non-empty one.
    pub fn token(&self) -> Option<String> {
        let present = |v: &String| !v.is_empty();
        self.local
            .get(AUTH_TOKEN_KEY)
            .filter(present)
            .or_else(|| self.session.get(AUTH_TOKEN_KEY).filter(present))
    }
}
