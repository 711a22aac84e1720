//! Reader/writer lock with a switchable enforcement policy.
//!
//! [`LockPolicy::Enforced`] is a plain `RwLock`. [`LockPolicy::Unchecked`]
//! is meant for single-threaded bulk loads: it only takes the uncontended
//! fast path, and contention, which means the caller broke the
//! single-threaded promise, is counted and logged before falling back to a
//! blocking acquire. Memory safety never depends on the policy.
//!
//! Poisoned locks are recovered; a panic in another thread must not turn
//! every later lookup into a panic too.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

/// How strictly the store lock synchronizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LockPolicy {
    /// Multiple readers, single writer.
    #[default]
    Enforced = 0,
    /// Caller guarantees no concurrent access.
    Unchecked = 1,
}

impl LockPolicy {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Unchecked,
            _ => Self::Enforced,
        }
    }
}

/// `RwLock` wrapper honouring a runtime [`LockPolicy`].
#[derive(Debug)]
pub struct PolicyLock<T> {
    inner: RwLock<T>,
    policy: AtomicU8,
    contended: AtomicU64,
}

impl<T> PolicyLock<T> {
    /// Wrap `value` under `policy`.
    pub fn new(value: T, policy: LockPolicy) -> Self {
        Self {
            inner: RwLock::new(value),
            policy: AtomicU8::new(policy as u8),
            contended: AtomicU64::new(0),
        }
    }

    /// Current policy.
    #[must_use]
    pub fn policy(&self) -> LockPolicy {
        LockPolicy::from_u8(self.policy.load(Ordering::Acquire))
    }

    /// Switch the policy for subsequent acquisitions.
    pub fn set_policy(&self, policy: LockPolicy) {
        self.policy.store(policy as u8, Ordering::Release);
    }

    /// Times an `Unchecked` acquisition found the lock held.
    #[must_use]
    pub fn contention_count(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    /// Shared access under the current policy.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        if self.policy() == LockPolicy::Unchecked {
            match self.inner.try_read() {
                Ok(guard) => return guard,
                Err(TryLockError::Poisoned(poisoned)) => return recover(poisoned, "read"),
                Err(TryLockError::WouldBlock) => self.report_contention("read"),
            }
        }
        self.inner
            .read()
            .unwrap_or_else(|poisoned| recover(poisoned, "read"))
    }

    /// Exclusive access under the current policy.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        if self.policy() == LockPolicy::Unchecked {
            match self.inner.try_write() {
                Ok(guard) => return guard,
                Err(TryLockError::Poisoned(poisoned)) => return recover(poisoned, "write"),
                Err(TryLockError::WouldBlock) => self.report_contention("write"),
            }
        }
        self.write_enforced()
    }

    /// Exclusive access that always blocks, whatever the policy.
    pub fn write_enforced(&self) -> RwLockWriteGuard<'_, T> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| recover(poisoned, "write"))
    }

    fn report_contention(&self, mode: &'static str) {
        let total = self.contended.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(mode, total, "lock contended under unchecked policy");
    }
}

fn recover<G>(poisoned: PoisonError<G>, mode: &'static str) -> G {
    tracing::warn!(mode, "recovering poisoned store lock");
    poisoned.into_inner()
}
