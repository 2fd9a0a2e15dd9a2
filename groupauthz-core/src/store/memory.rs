use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BackendError, KeyEncoding, StoreBackend, StoreHandle};

/// In-process backend holding a fixed set of entries. The configured path is
/// ignored.
///
/// The backend counts the handles it gave out that are still alive, which lets
/// embedders (and tests) check that every lookup released its handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<HashMap<Vec<u8>, Vec<u8>>>,
    encoding: KeyEncoding,
    open_handles: Arc<AtomicUsize>,
    opened_total: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new(encoding: KeyEncoding) -> Self {
        Self {
            encoding,
            ..Default::default()
        }
    }

    /// Build a backend from `user -> value` pairs, encoding keys with
    /// `encoding`.
    pub fn with_entries<I, K, V>(encoding: KeyEncoding, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (encoding.encode_key(k.as_ref()), v.as_ref().to_vec()))
            .collect();
        Self {
            entries: Arc::new(entries),
            encoding,
            ..Default::default()
        }
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

impl StoreBackend for MemoryBackend {
    fn key_encoding(&self) -> KeyEncoding {
        self.encoding
    }

    fn open_read_only(&self, _path: &Path) -> Result<Box<dyn StoreHandle>, BackendError> {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            entries: self.entries.clone(),
            open_handles: self.open_handles.clone(),
        }))
    }
}

struct MemoryHandle {
    entries: Arc<HashMap<Vec<u8>, Vec<u8>>>,
    open_handles: Arc<AtomicUsize>,
}

impl StoreHandle for MemoryHandle {
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.entries.get(key).cloned())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
