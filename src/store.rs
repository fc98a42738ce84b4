//! Versioned key-value store for session and room records.
//!
//! Requests are stateless, so concurrent submits and polls can race on the
//! same record. Every mutation is a read-modify-write conditioned on the
//! version observed at read time; a conflict sends the caller back to the
//! read. The in-memory implementation performs the compare-and-swap under
//! the map's shard lock, so two writers can never both win.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CasError {
    #[error("record no longer exists")]
    Missing,
    #[error("record was modified concurrently")]
    Conflict,
}

/// Storage contract consumed by the game core. Get/insert/compare-and-swap
/// over opaque string ids; no process-wide mutable state outside an
/// implementation of this trait.
pub trait Store<T: Clone>: Send + Sync {
    fn get(&self, id: &str) -> Option<Versioned<T>>;

    /// Insert a fresh record at version 0. Returns false if the id is taken.
    fn insert(&self, id: &str, value: T) -> bool;

    /// Replace the record only if its version still matches `expected`.
    /// Returns the new version on success.
    fn cas(&self, id: &str, expected: u64, value: T) -> Result<u64, CasError>;

    fn remove(&self, id: &str) -> Option<T>;

    /// Snapshot of all records, for listings and sweeps.
    fn entries(&self) -> Vec<(String, Versioned<T>)>;
}

pub struct MemoryStore<T> {
    map: DashMap<String, Versioned<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Store<T> for MemoryStore<T> {
    fn get(&self, id: &str) -> Option<Versioned<T>> {
        self.map.get(id).map(|r| r.clone())
    }

    fn insert(&self, id: &str, value: T) -> bool {
        match self.map.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Versioned { version: 0, value });
                true
            }
        }
    }

    fn cas(&self, id: &str, expected: u64, value: T) -> Result<u64, CasError> {
        match self.map.entry(id.to_string()) {
            Entry::Vacant(_) => Err(CasError::Missing),
            Entry::Occupied(mut slot) => {
                if slot.get().version != expected {
                    return Err(CasError::Conflict);
                }
                let next = expected + 1;
                slot.insert(Versioned {
                    version: next,
                    value,
                });
                Ok(next)
            }
        }
    }

    fn remove(&self, id: &str) -> Option<T> {
        self.map.remove(id).map(|(_, v)| v.value)
    }

    fn entries(&self) -> Vec<(String, Versioned<T>)> {
        self.map
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let store = MemoryStore::new();
        assert!(store.insert("a", 7u32));
        let read = store.get("a").unwrap();
        assert_eq!(read.version, 0);
        assert_eq!(read.value, 7);
    }

    #[test]
    fn double_insert_is_refused() {
        let store = MemoryStore::new();
        assert!(store.insert("a", 1u32));
        assert!(!store.insert("a", 2u32));
        assert_eq!(store.get("a").unwrap().value, 1);
    }

    #[test]
    fn cas_succeeds_once_per_version() {
        let store = MemoryStore::new();
        store.insert("a", 1u32);

        // two writers read version 0; only the first commit lands
        assert_eq!(store.cas("a", 0, 2), Ok(1));
        assert_eq!(store.cas("a", 0, 3), Err(CasError::Conflict));
        assert_eq!(store.get("a").unwrap().value, 2);

        assert_eq!(store.cas("a", 1, 3), Ok(2));
    }

    #[test]
    fn cas_on_removed_record_reports_missing() {
        let store = MemoryStore::new();
        store.insert("a", 1u32);
        store.remove("a");
        assert_eq!(store.cas("a", 0, 2), Err(CasError::Missing));
    }

    #[test]
    fn entries_snapshots_everything() {
        let store = MemoryStore::new();
        store.insert("a", 1u32);
        store.insert("b", 2u32);
        let mut ids: Vec<_> = store.entries().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
