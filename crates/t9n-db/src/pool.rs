//! Transaction buffers and their reuse pool.
//!
//! A [`TxnBuffer`] holds the staged writes of one transaction: the
//! translation bytes in a private buffer and an ordered log of
//! `(key hash, span)` records. [`TxnPool`] recycles buffers so that
//! transaction churn does not reallocate.
//!
//! # Invariants
//!
//! 1. A buffer handed out by [`TxnPool::get`] is always empty.
//! 2. [`TxnPool::put`] resets before parking; a stale log can never leak into
//!    the next transaction.
//! 3. The pool keeps at most `max_idle` buffers; extras are dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::arena::Span;

/// Idle buffers kept by [`TxnPool::default`].
pub const DEFAULT_MAX_IDLE: usize = 16;

/// One staged write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnRecord {
    /// Hash of the key.
    pub hash: u64,
    /// Translation bytes in the owning buffer.
    pub span: Span,
}

/// Staged writes of one transaction.
#[derive(Debug, Clone, Default)]
pub struct TxnBuffer {
    data: String,
    log: Vec<TxnRecord>,
}

impl TxnBuffer {
    /// Copy `translation` into the buffer and log it under `hash`.
    pub fn stage(&mut self, hash: u64, translation: &str) {
        let offset = self.data.len() as u32;
        self.data.push_str(translation);
        self.log.push(TxnRecord {
            hash,
            span: Span::new(offset, translation.len() as u32),
        });
    }

    /// Number of staged records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Staged `(hash, translation)` pairs in staging order.
    pub fn records(&self) -> impl Iterator<Item = (u64, &str)> {
        self.log
            .iter()
            .filter_map(|record| Some((record.hash, self.data.get(record.span.range())?)))
    }

    /// Most recent translation staged under `hash`.
    #[must_use]
    pub fn latest(&self, hash: u64) -> Option<&str> {
        let record = self.log.iter().rev().find(|record| record.hash == hash)?;
        self.data.get(record.span.range())
    }

    /// Concatenated staged translations.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Clear data and log, keeping capacity.
    pub fn reset(&mut self) {
        self.data.clear();
        self.log.clear();
    }
}

/// Explicit, injectable pool of [`TxnBuffer`]s.
///
/// Share one pool between stores with `Arc<TxnPool>`.
#[derive(Debug)]
pub struct TxnPool {
    idle: Mutex<Vec<TxnBuffer>>,
    max_idle: usize,
}

impl Default for TxnPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl TxnPool {
    /// Create a pool that parks at most `max_idle` buffers.
    #[must_use]
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take an empty buffer, reusing a parked one when possible.
    #[must_use]
    pub fn get(&self) -> TxnBuffer {
        self.lock().pop().unwrap_or_default()
    }

    /// Reset `buffer` and park it for reuse.
    pub fn put(&self, mut buffer: TxnBuffer) {
        buffer.reset();
        let mut idle = self.lock();
        if idle.len() < self.max_idle {
            idle.push(buffer);
        }
    }

    /// Number of parked buffers.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TxnBuffer>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keeps_order_and_bytes() {
        let mut buf = TxnBuffer::default();
        buf.stage(1, "qwerty");
        buf.stage(2, "foo");
        buf.stage(1, "bar");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.data(), "qwertyfoobar");
        let records: Vec<_> = buf.records().collect();
        assert_eq!(records, vec![(1, "qwerty"), (2, "foo"), (1, "bar")]);
    }

    #[test]
    fn latest_returns_last_record_for_hash() {
        let mut buf = TxnBuffer::default();
        assert_eq!(buf.latest(1), None);
        buf.stage(1, "first");
        buf.stage(2, "other");
        buf.stage(1, "second");
        assert_eq!(buf.latest(1), Some("second"));
        assert_eq!(buf.latest(2), Some("other"));
        assert_eq!(buf.latest(3), None);
    }

    #[test]
    fn recycled_buffer_is_empty() {
        let pool = TxnPool::new(4);
        let mut buf = pool.get();
        buf.stage(7, "stale");
        let capacity = buf.data.capacity();
        pool.put(buf);
        assert_eq!(pool.idle(), 1);

        let reused = pool.get();
        assert!(reused.is_empty());
        assert!(reused.data().is_empty());
        assert_eq!(reused.records().count(), 0);
        assert!(reused.data.capacity() >= capacity);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn pool_caps_idle_buffers() {
        let pool = TxnPool::new(2);
        for _ in 0..5 {
            pool.put(TxnBuffer::default());
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn default_pool_cap() {
        let pool = TxnPool::default();
        for _ in 0..DEFAULT_MAX_IDLE + 3 {
            pool.put(TxnBuffer::default());
        }
        assert_eq!(pool.idle(), DEFAULT_MAX_IDLE);
    }
}
