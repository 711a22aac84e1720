#![forbid(unsafe_code)]

//! Scoped transactions.
//!
//! [`Transaction`] wraps [`TranslationDb::begin`] and friends in a guard:
//! writes go through the guard, and a guard dropped without
//! [`commit`](Transaction::commit) rolls back.
//!
//! A guard is bound to the transaction it opened, not to whatever
//! transaction the store has open later. If that transaction is finished
//! behind the guard's back (a direct [`TranslationDb::rollback`], say), the
//! guard's writes fail with [`I18nError::TransactionClosed`] and its drop
//! leaves any newer transaction alone.
//!
//! # Usage
//!
//! ```
//! use t9n_db::TranslationDb;
//!
//! let db = TranslationDb::default();
//! let mut txn = db.transaction()?;
//! txn.set("en.title", "Inventory")?
//!     .set("en.count", "{0} Empty|[1,*] Items")?;
//! assert_eq!(db.get("en.title", "-"), "-");
//! assert_eq!(txn.commit()?, 2);
//! assert_eq!(db.get("en.title", "-"), "Inventory");
//! # Ok::<(), t9n_db::I18nError>(())
//! ```
//!
//! # Invariants
//!
//! 1. At most one transaction is open per store.
//! 2. A guard finalizes exactly once: commit, rollback, or drop.
//! 3. A guard only ever acts on its own transaction.

use std::fmt;

use crate::db::{TranslationDb, TxnId};
use crate::error::I18nError;

/// RAII guard over the store's open transaction.
pub struct Transaction<'db> {
    db: &'db TranslationDb,
    id: TxnId,
    /// Whether the transaction has been committed or rolled back.
    finalized: bool,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("staged", &self.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl<'db> Transaction<'db> {
    pub(crate) fn begin(db: &'db TranslationDb) -> Result<Self, I18nError> {
        let id = db.open()?;
        Ok(Self {
            db,
            id,
            finalized: false,
        })
    }

    /// Stage `translation` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::TransactionClosed`] if this transaction was
    /// finished through the store directly.
    pub fn set(&mut self, key: &str, translation: &str) -> Result<&mut Self, I18nError> {
        self.db.stage(self.id, key, translation)?;
        Ok(self)
    }

    /// Whether this guard's transaction is still open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.finalized && self.db.is_open(self.id)
    }

    /// Number of staged records; `0` once the transaction closed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.db.staged_in(self.id)
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply staged writes. Returns the number applied.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::TransactionClosed`] if this transaction was
    /// finished through the store directly; nothing is applied.
    pub fn commit(mut self) -> Result<usize, I18nError> {
        self.finalized = true;
        self.db.commit_txn(self.id)
    }

    /// Discard staged writes. A no-op if the transaction already closed.
    pub fn rollback(mut self) {
        self.finalized = true;
        self.db.rollback_txn(self.id);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finalized {
            self.db.rollback_txn(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_rolls_back() {
        let db = TranslationDb::default();
        {
            let mut txn = db.transaction().unwrap();
            txn.set("k", "v").unwrap();
            assert_eq!(txn.len(), 1);
        }
        assert!(!db.in_transaction());
        assert!(!db.contains("k"));
    }

    #[test]
    fn explicit_rollback() {
        let db = TranslationDb::default();
        let mut txn = db.transaction().unwrap();
        txn.set("a", "1").unwrap().set("b", "2").unwrap();
        txn.rollback();
        assert!(!db.contains("a"));
        assert_eq!(db.pool().idle(), 1);
    }

    #[test]
    fn guard_blocks_second_transaction() {
        let db = TranslationDb::default();
        let txn = db.transaction().unwrap();
        assert!(txn.is_empty());
        assert_eq!(db.transaction().unwrap_err(), I18nError::TransactionOpen);
        drop(txn);
        assert!(db.transaction().is_ok());
    }

    #[test]
    fn commit_applies() {
        let db = TranslationDb::default();
        let mut txn = db.transaction().unwrap();
        txn.set("k", "{0} none|[1,*] some").unwrap();
        assert_eq!(txn.commit(), Ok(1));
        assert_eq!(db.get_plural("k", "", 4), "some");
    }

    #[test]
    fn stale_guard_leaves_newer_transaction_alone() {
        let db = TranslationDb::default();
        let mut stale = db.transaction().unwrap();
        db.rollback();
        assert!(!stale.is_active());

        db.begin().unwrap();
        db.set("k", "v");
        assert_eq!(stale.set("x", "y").unwrap_err(), I18nError::TransactionClosed);
        assert_eq!(stale.len(), 0);
        drop(stale);

        assert!(db.in_transaction());
        assert_eq!(db.commit(), 1);
        assert_eq!(db.get("k", "<none>"), "v");
        assert!(!db.contains("x"));
    }

    #[test]
    fn stale_guard_commit_is_rejected() {
        let db = TranslationDb::default();
        let mut txn = db.transaction().unwrap();
        txn.set("k", "v").unwrap();
        assert_eq!(db.commit(), 1);
        assert_eq!(txn.commit(), Err(I18nError::TransactionClosed));
        assert_eq!(db.get("k", ""), "v");
    }
}
