//! Key-value store abstraction used for group lookups.
//!
//! The engine never sees a storage format. It asks a [`StoreRegistry`] for the
//! backend registered under the configured store type, opens a read-only
//! [`StoreHandle`] for a single fetch and drops it again.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use memory::MemoryBackend;
pub use sqlite::{GroupDatabase, SqliteBackend};

/// Failure reported by a concrete backend, before store context is attached.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Format(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown store type: {store_type}")]
    UnknownStoreType { store_type: String },

    #[error("Could not open {store_type} store {}: {source}", path.display())]
    OpenFailed {
        store_type: String,
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("Could not read from {store_type} store {}: {source}", path.display())]
    ReadFailed {
        store_type: String,
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    pub(crate) fn open_failed(store_type: &str, path: &Path, source: BackendError) -> Self {
        StoreError::OpenFailed {
            store_type: store_type.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn read_failed(store_type: &str, path: &Path, source: BackendError) -> Self {
        StoreError::ReadFailed {
            store_type: store_type.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn store_type(&self) -> &str {
        match self {
            StoreError::UnknownStoreType { store_type }
            | StoreError::OpenFailed { store_type, .. }
            | StoreError::ReadFailed { store_type, .. } => store_type,
        }
    }
}

/// How a username is turned into lookup key bytes.
///
/// Some DBM flavors store keys with their C string terminator, so the key
/// length includes a trailing NUL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEncoding {
    #[default]
    Plain,
    NulTerminated,
}

impl KeyEncoding {
    pub fn encode_key(&self, username: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(username.len() + 1);
        key.extend_from_slice(username.as_bytes());
        if *self == KeyEncoding::NulTerminated {
            key.push(0);
        }
        key
    }

    /// Inverse of [`KeyEncoding::encode_key`] for listing stored keys.
    pub fn decode_key(&self, key: &[u8]) -> String {
        let key = match (self, key.split_last()) {
            (KeyEncoding::NulTerminated, Some((0, rest))) => rest,
            _ => key,
        };
        String::from_utf8_lossy(key).into_owned()
    }
}

/// Stored values are read as C strings: everything from the first NUL byte
/// on is dropped.
pub fn value_to_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// An open, read-only store. Dropping the handle closes it.
pub trait StoreHandle {
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError>;
}

/// A store variant selectable by name in the resource configuration.
pub trait StoreBackend: Send + Sync {
    fn key_encoding(&self) -> KeyEncoding;

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StoreHandle>, BackendError>;
}

/// Store backends by type name. Names are matched case-insensitively.
#[derive(Clone)]
pub struct StoreRegistry {
    backends: HashMap<String, Arc<dyn StoreBackend>>,
}

impl StoreRegistry {
    /// A registry without any backends.
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// `default` and `sqlite` use plain keys, `sqlite-nul` and its alias
    /// `netscape` store keys with a trailing NUL byte.
    pub fn with_defaults() -> Self {
        let plain: Arc<dyn StoreBackend> = Arc::new(SqliteBackend::new(KeyEncoding::Plain));
        let nul: Arc<dyn StoreBackend> = Arc::new(SqliteBackend::new(KeyEncoding::NulTerminated));

        let mut registry = Self::empty();
        registry.register_shared("default", plain.clone());
        registry.register_shared("sqlite", plain);
        registry.register_shared("sqlite-nul", nul.clone());
        registry.register_shared("netscape", nul);
        registry
    }

    pub fn register<B: StoreBackend + 'static>(&mut self, name: &str, backend: B) {
        self.register_shared(name, Arc::new(backend));
    }

    pub fn register_shared(&mut self, name: &str, backend: Arc<dyn StoreBackend>) {
        self.backends.insert(name.to_lowercase(), backend);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StoreBackend>, StoreError> {
        self.backends
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| StoreError::UnknownStoreType {
                store_type: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
