use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::Canonical;

/// Session-scoped read-through cache of canonical responses, keyed by endpoint string.
///
/// Unbounded and without expiry; entries live as long as the last clone. Clones share the
/// same entries, which lets a caller hand the facade a cache and keep a handle to inspect it.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, Canonical>>>,
}

impl ResponseCache {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Canonical>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Canonical> {
        self.lock().get(key).cloned()
    }

    /// Last writer wins when two requests for the same key race.
    pub fn put(&self, key: &str, value: Canonical) {
        self.lock().insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize { self.lock().len() }

    pub fn is_empty(&self) -> bool { self.lock().is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationKind, SourceList};

    #[test]
    fn clones_share_entries() {
        let cache = ResponseCache::new();
        let handle = cache.clone();
        cache.put("/info/1", Canonical::empty(OperationKind::Detail));
        assert!(handle.get("/info/1").is_some());
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn last_writer_wins() {
        let cache = ResponseCache::new();
        cache.put("/sources/1", Canonical::empty(OperationKind::Sources));
        let newer = Canonical::Sources(SourceList { results: Vec::new() });
        cache.put("/sources/1", newer.clone());
        assert_eq!(cache.get("/sources/1"), Some(newer));
        assert_eq!(cache.len(), 1);
    }
}
