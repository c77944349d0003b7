//! Credential storage for HubSpot token payloads
//!
//! Payloads are serialized to JSON and written to a key-value store under
//! `hubspot:<user_id>:<org_id>`. One entry per identity; a new authorization
//! overwrites the previous entry. Nothing here expires or deletes entries.
//!
//! Backends implement `KeyValueStore`: Redis for deployments
//! (`redis_store::RedisStore`), a JSON file for single-node setups, and an
//! in-memory map for development and tests.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identity::IdentityPair;
use crate::token::TokenPayload;

/// Boxed future returned by `KeyValueStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Minimal GET/SET string store.
///
/// Uses `Pin<Box<dyn Future>>` return types so stores can sit behind
/// `Arc<dyn KeyValueStore>`.
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logging and the health endpoint
    fn backend(&self) -> &str;

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;
}

/// Typed view over a `KeyValueStore` for HubSpot token payloads.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub fn backend(&self) -> &str {
        self.inner.backend()
    }

    /// Serialize and store a payload, replacing any previous entry.
    pub async fn save(&self, identity: &IdentityPair, payload: &TokenPayload) -> Result<()> {
        let key = identity.credential_key();
        let json = serde_json::to_string(payload)
            .map_err(|e| Error::CredentialParse(format!("serializing token payload: {e}")))?;
        self.inner.set(&key, json).await?;
        info!(
            user_id = identity.user_id,
            org_id = identity.org_id,
            backend = self.backend(),
            "stored hubspot credentials"
        );
        Ok(())
    }

    /// Load the payload stored for an identity.
    ///
    /// Returns `Error::NotFound` when the identity never completed the flow.
    pub async fn load(&self, identity: &IdentityPair) -> Result<TokenPayload> {
        let key = identity.credential_key();
        let json = self
            .inner
            .get(&key)
            .await?
            .ok_or_else(|| Error::NotFound("No credentials found for HubSpot".into()))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::CredentialParse(format!("parsing stored payload for {key}: {e}")))
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.state.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.state.lock().await.insert(key.to_string(), value);
            Ok(())
        })
    }
}

/// JSON file mapping keys to serialized payloads.
///
/// All writes use atomic temp-file + rename to prevent corruption on crash.
/// A tokio Mutex serializes concurrent writes from parallel callbacks.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Load the store from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` (cold start).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded credential file");
            entries
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty store");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn backend(&self) -> &str {
        "file"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.state.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.insert(key.to_string(), value);
            debug!(key, "updated credential file entry");
            write_atomic(&self.path, &state).await
        })
    }
}

/// Write the store to a file atomically.
///
/// Writes a temporary file in the same directory, then renames it over the
/// target. The file holds OAuth tokens, so it is created 0600 on unix.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credential file: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".hubspot-credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential file");
    Ok(())
}
