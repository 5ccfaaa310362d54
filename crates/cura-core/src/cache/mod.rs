//! Local cache store.
//!
//! An advisory, per-identity key/value store for serialized view state.
//! Entries are addressed by a namespace and a scope (the signed-in
//! principal). Reads never fail: a missing, unparseable or tampered entry
//! is simply absent. Nothing is authoritative here; the backend always is.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::{SqliteBackend, SCHEMA};

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Cart, ChatTranscript, EntityKind};

/// Cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Flat key of an entry, `<namespace>_<scope>`.
pub fn cache_key(namespace: &str, scope: &str) -> String {
    format!("{}_{}", namespace, scope)
}

/// SHA-256 of a payload, hex encoded.
pub fn payload_digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Logical area of cached state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(Cow<'static, str>);

impl Namespace {
    pub const CHAT: Namespace = Namespace(Cow::Borrowed("chat"));
    pub const CART: Namespace = Namespace(Cow::Borrowed("cart"));
    pub const PROFILE: Namespace = Namespace(Cow::Borrowed("profile"));
    pub const USER_NAME: Namespace = Namespace(Cow::Borrowed("userName"));

    pub fn new(name: impl Into<String>) -> Self {
        Namespace(Cow::Owned(name.into()))
    }

    /// Namespace mirroring the collection of one entity kind.
    pub fn entities(kind: EntityKind) -> Self {
        Namespace(Cow::Borrowed(kind.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity an entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheScope(String);

impl CacheScope {
    /// Scope for the signed-in principal; none when signed out.
    pub fn for_principal(principal: Option<&str>) -> Option<Self> {
        principal
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| CacheScope(p.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub namespace: String,
    pub scope: String,
    pub payload: String,
    pub digest: String,
    pub last_written: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(namespace: &str, scope: &str, payload: String) -> Self {
        Self {
            namespace: namespace.to_string(),
            scope: scope.to_string(),
            digest: payload_digest(&payload),
            payload,
            last_written: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        cache_key(&self.namespace, &self.scope)
    }
}

/// Storage behind a [`LocalCache`].
pub trait CacheBackend {
    fn read(&self, namespace: &str, scope: &str) -> CacheResult<Option<StoredEntry>>;

    /// Insert or overwrite.
    fn write(&self, entry: &StoredEntry) -> CacheResult<()>;

    fn delete(&self, namespace: &str, scope: &str) -> CacheResult<bool>;

    /// Remove every entry of one scope.
    fn delete_scope(&self, scope: &str) -> CacheResult<usize>;
}

/// Typed cache over a backend.
///
/// Every operation takes an optional scope. Without one (nobody signed in)
/// loads are absent and writes are skipped.
pub struct LocalCache<B = SqliteBackend> {
    backend: B,
}

impl LocalCache<SqliteBackend> {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> CacheResult<Self> {
        Ok(Self::new(SqliteBackend::open(path)?))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::new(SqliteBackend::open_in_memory()?))
    }
}

impl<B: CacheBackend> LocalCache<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Strict read: corrupt entries are errors.
    pub fn try_load<T: DeserializeOwned>(
        &self,
        namespace: &Namespace,
        scope: Option<&CacheScope>,
    ) -> CacheResult<Option<T>> {
        let Some(scope) = scope else {
            return Ok(None);
        };
        let Some(entry) = self.backend.read(namespace.as_str(), scope.as_str())? else {
            return Ok(None);
        };

        if payload_digest(&entry.payload) != entry.digest {
            return Err(CacheError::Corrupt {
                key: entry.key(),
                reason: "digest mismatch".to_string(),
            });
        }
        let value = serde_json::from_str(&entry.payload).map_err(|e| CacheError::Corrupt {
            key: entry.key(),
            reason: e.to_string(),
        })?;
        debug!(namespace = %namespace, scope = %scope, "cache hit");
        Ok(Some(value))
    }

    /// Read an entry. Unreadable entries are logged and treated as absent.
    pub fn load<T: DeserializeOwned>(
        &self,
        namespace: &Namespace,
        scope: Option<&CacheScope>,
    ) -> Option<T> {
        match self.try_load(namespace, scope) {
            Ok(value) => value,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Strict write. Returns false when skipped for lack of a scope.
    pub fn try_save<T: Serialize + ?Sized>(
        &self,
        namespace: &Namespace,
        scope: Option<&CacheScope>,
        value: &T,
    ) -> CacheResult<bool> {
        let Some(scope) = scope else {
            return Ok(false);
        };
        let payload = serde_json::to_string(value)?;
        self.backend
            .write(&StoredEntry::new(namespace.as_str(), scope.as_str(), payload))?;
        Ok(true)
    }

    /// Write an entry, last write wins. Failures are logged, not returned.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        namespace: &Namespace,
        scope: Option<&CacheScope>,
        value: &T,
    ) {
        if let Err(e) = self.try_save(namespace, scope, value) {
            warn!(namespace = %namespace, error = %e, "cache write failed");
        }
    }

    pub fn clear(&self, namespace: &Namespace, scope: Option<&CacheScope>) {
        let Some(scope) = scope else {
            return;
        };
        if let Err(e) = self.backend.delete(namespace.as_str(), scope.as_str()) {
            warn!(namespace = %namespace, scope = %scope, error = %e, "cache clear failed");
        }
    }

    /// Drop everything cached for one identity.
    pub fn clear_scope(&self, scope: &CacheScope) {
        match self.backend.delete_scope(scope.as_str()) {
            Ok(n) => debug!(scope = %scope, entries = n, "cleared cache scope"),
            Err(e) => warn!(scope = %scope, error = %e, "cache clear failed"),
        }
    }

    // =========================================================================
    // Local-only state
    // =========================================================================

    pub fn cart(&self, scope: Option<&CacheScope>) -> Cart {
        self.load(&Namespace::CART, scope).unwrap_or_default()
    }

    pub fn save_cart(&self, scope: Option<&CacheScope>, cart: &Cart) {
        self.save(&Namespace::CART, scope, cart);
    }

    /// Cached transcript, capped at `max_messages`.
    pub fn chat(&self, scope: Option<&CacheScope>, max_messages: usize) -> ChatTranscript {
        let mut transcript: ChatTranscript = self
            .load(&Namespace::CHAT, scope)
            .unwrap_or_else(|| ChatTranscript::with_capacity(max_messages));
        transcript.set_capacity(max_messages);
        transcript
    }

    pub fn save_chat(&self, scope: Option<&CacheScope>, transcript: &ChatTranscript) {
        self.save(&Namespace::CHAT, scope, transcript);
    }

    pub fn display_name(&self, scope: Option<&CacheScope>) -> Option<String> {
        self.load(&Namespace::USER_NAME, scope)
    }

    pub fn set_display_name(&self, scope: Option<&CacheScope>, name: &str) {
        self.save(&Namespace::USER_NAME, scope, name);
    }
}
