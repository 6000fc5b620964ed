//! Per-session cache of directory entries.
//!
//! Holds the last known state of every entry a session bound, looked up or
//! found, keyed by name. Updates diff against the cached state instead of
//! reading the entry again.

use dirodm_proto::{DirectoryEntry, Dn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    pub fn stores(&self) -> u64 {
        self.stores.load(AtomicOrdering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Map from name to the last known entry.
#[derive(Debug, Default)]
pub struct EntryCache {
    entries: HashMap<Dn, DirectoryEntry>,
    stats: CacheStats,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry, replacing any previous state for the name.
    ///
    /// # Panics
    ///
    /// If the entry's name differs from `dn`.
    pub fn store(&mut self, dn: Dn, entry: DirectoryEntry) -> Option<DirectoryEntry> {
        assert_eq!(&dn, entry.dn(), "cached entry stored under a different name");
        self.stats.stores.fetch_add(1, AtomicOrdering::Relaxed);
        self.entries.insert(dn, entry)
    }

    /// Get the cached entry for a name.
    pub fn retrieve(&self, dn: &Dn) -> Option<&DirectoryEntry> {
        let found = self.entries.get(dn);
        let counter = if found.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
        found
    }

    pub fn remove(&mut self, dn: &Dn) -> Option<DirectoryEntry> {
        self.entries.remove(dn)
    }

    pub fn contains(&self, dn: &Dn) -> bool {
        self.entries.contains_key(dn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
