use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Concurrent key-to-state map with one lock per entry.
///
/// Lookup goes through the sharded map; the per-entry mutex is taken only
/// after the map guard has been released, so two requests contend only when
/// they share a key. Insertion is construct-if-absent: two concurrent first
/// touches of the same key observe exactly one state instance.
pub(crate) struct KeyedStore<S> {
    entries: DashMap<String, Arc<Mutex<S>>>,
}

impl<S> KeyedStore<S> {
    pub(crate) fn new() -> Self {
        KeyedStore {
            entries: DashMap::new(),
        }
    }

    /// Run `body` under the entry lock for `key`, constructing the state
    /// with `init` if the key has none.
    pub(crate) fn with_entry<T>(
        &self,
        key: &str,
        init: impl FnOnce() -> S,
        body: impl FnOnce(&mut S) -> T,
    ) -> T {
        let cell = match self.entries.get(key) {
            Some(entry) => Arc::clone(entry.value()),
            None => Arc::clone(
                self.entries
                    .entry(key.to_owned())
                    .or_insert_with(|| Arc::new(Mutex::new(init())))
                    .value(),
            ),
        };

        let mut state = cell.lock();
        body(&mut state)
    }

    /// Drop the state for `key`, if any. The next touch constructs afresh.
    pub(crate) fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry whose state fails `keep`.
    pub(crate) fn retain(&self, mut keep: impl FnMut(&S) -> bool) {
        self.entries.retain(|_, cell| keep(&cell.lock()));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
