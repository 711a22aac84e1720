//! Pluggable 64-bit key hashing.
//!
//! The store only ever sees `hash(key)`. Any deterministic function works;
//! closures can be passed directly.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Maps a key to the 64-bit value the index is keyed by.
pub trait KeyHasher: Send + Sync {
    /// Hash `key`.
    fn sum64(&self, key: &[u8]) -> u64;
}

/// Default hasher built on `rustc-hash`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FxKeyHasher;

impl KeyHasher for FxKeyHasher {
    fn sum64(&self, key: &[u8]) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(key);
        hasher.finish()
    }
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn sum64(&self, key: &[u8]) -> u64 {
        self(key)
    }
}
