//! Hashed key index.
//!
//! Keys are never stored, only their 64-bit hash. Two distinct keys with the
//! same hash share one entry and the later write wins.

use rustc_hash::FxHashMap;

use crate::entry::PackedEntry;

/// `hash(key) -> PackedEntry` map.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    map: FxHashMap<u64, PackedEntry>,
}

impl KeyIndex {
    /// Create an empty index with room for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Entry for `hash`, if any.
    #[inline]
    #[must_use]
    pub fn get(&self, hash: u64) -> Option<PackedEntry> {
        self.map.get(&hash).copied().filter(|e| !e.is_none())
    }

    /// Store `entry` for `hash`, replacing any previous one.
    pub fn insert(&mut self, hash: u64, entry: PackedEntry) {
        self.map.insert(hash, entry);
    }

    /// Shift every entry starting at or after `from` down by `width`.
    ///
    /// Called after `width` rule slots ending at `from` were removed from the
    /// rule table. Returns how many entries moved.
    pub fn rebase(&mut self, from: u32, width: u32) -> usize {
        let mut moved = 0;
        for entry in self.map.values_mut() {
            let (lo, hi) = entry.decode();
            if lo >= from {
                *entry = PackedEntry::encode(lo - width, hi - width);
                moved += 1;
            }
        }
        moved
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no key is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Forget every key.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
