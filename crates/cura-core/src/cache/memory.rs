//! In-process cache backend.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{CacheBackend, CacheResult, StoredEntry};

/// Cache held in a map; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<(String, String), StoredEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl CacheBackend for MemoryBackend {
    fn read(&self, namespace: &str, scope: &str) -> CacheResult<Option<StoredEntry>> {
        let key = (namespace.to_string(), scope.to_string());
        Ok(self.entries.borrow().get(&key).cloned())
    }

    fn write(&self, entry: &StoredEntry) -> CacheResult<()> {
        let key = (entry.namespace.clone(), entry.scope.clone());
        self.entries.borrow_mut().insert(key, entry.clone());
        Ok(())
    }

    fn delete(&self, namespace: &str, scope: &str) -> CacheResult<bool> {
        let key = (namespace.to_string(), scope.to_string());
        Ok(self.entries.borrow_mut().remove(&key).is_some())
    }

    fn delete_scope(&self, scope: &str) -> CacheResult<usize> {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(_, s), _| s != scope);
        Ok(before - entries.len())
    }
}
