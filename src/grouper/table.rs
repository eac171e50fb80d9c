use crate::grouper::session::ExceptionGrouper;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedGrouper = Arc<Mutex<ExceptionGrouper>>;

/// Per-source exception groupers, created lazily on first use.
///
/// The outer lock only covers lookup and insert-if-absent. Callers must still
/// deliver a given key's lines in order and one at a time; the inner mutex
/// makes that contract memory-safe, it does not restore line order.
#[derive(Debug, Default)]
pub struct GrouperTable {
    groupers: Mutex<HashMap<String, SharedGrouper>>,
}

impl GrouperTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SharedGrouper>> {
        self.groupers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Grouper for `source_key`, inserting a fresh idle one if absent
    pub fn get_or_create(&self, source_key: &str) -> SharedGrouper {
        let mut groupers = self.lock();
        if let Some(grouper) = groupers.get(source_key) {
            return Arc::clone(grouper);
        }
        let grouper = SharedGrouper::default();
        groupers.insert(source_key.to_string(), Arc::clone(&grouper));
        grouper
    }

    /// Detach the grouper for a source that has ended
    pub fn remove(&self, source_key: &str) -> Option<SharedGrouper> {
        self.lock().remove(source_key)
    }

    pub fn contains(&self, source_key: &str) -> bool {
        self.lock().contains_key(source_key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
