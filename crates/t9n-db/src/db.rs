//! The translation store.
//!
//! # Invariants
//!
//! 1. **Lookups never fail**: a missing key, an unmatched count or an empty
//!    payload resolves to the caller's default (or `""`).
//!
//! 2. **Isolation**: while a transaction is open, `get*` observe only
//!    committed state; staged writes become visible together on commit.
//!
//! 3. **Atomic commit**: commit holds the exclusive lock for the whole batch
//!    regardless of the lock policy, so readers see all staged writes or
//!    none.
//!
//! 4. **Thread safety**: `TranslationDb` is `Send + Sync`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Key never set (or reset) | Default returned |
//! | No matching rule | Count outside every range | Default returned |
//! | Hash collision | Two keys, one hash | Later write shadows earlier |
//! | Second `begin` | Transaction already open | `Err(I18nError::TransactionOpen)` |
//! | Stale handle | [`Transaction`] outlived its transaction | Writes return `Err(I18nError::TransactionClosed)`; drop is a no-op |
//! | Unchecked contention | Concurrent use under `LockPolicy::Unchecked` | Counted, logged, then blocks |
//!
//! # Lock order
//!
//! The pending-transaction slot is always taken before the storage lock,
//! never after.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use t9n_replace::PlaceholderReplacer;

use crate::config::DbConfig;
use crate::error::I18nError;
use crate::hasher::{FxKeyHasher, KeyHasher};
use crate::lock::{LockPolicy, PolicyLock};
use crate::pool::{TxnBuffer, TxnPool};
use crate::storage::Storage;
use crate::txn::Transaction;

/// Point-in-time counters of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbStats {
    /// Indexed keys.
    pub keys: usize,
    /// Rule slots, live or abandoned.
    pub rules: usize,
    /// Arena bytes, live or abandoned.
    pub arena_len: usize,
    /// Records staged in the open transaction (0 if none).
    pub staged: usize,
    /// Contended acquisitions observed under `LockPolicy::Unchecked`.
    pub contended: u64,
}

/// Generation of one `begin`; ties a [`Transaction`] handle to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TxnId(u64);

/// The open transaction and the generation it was opened under.
#[derive(Debug)]
struct OpenTxn {
    id: TxnId,
    buffer: TxnBuffer,
}

/// Embedded translation store with plural rules and staged transactions.
///
/// # Example
///
/// ```
/// use t9n_db::TranslationDb;
/// use t9n_replace::PlaceholderReplacer;
///
/// let db = TranslationDb::default();
/// db.set("en.greeting", "Hello");
/// db.set("en.apples", "{0} No apples|{1} One apple|[2,*] !count apples");
///
/// assert_eq!(db.get("en.greeting", ""), "Hello");
/// assert_eq!(db.get("en.missing", "fallback"), "fallback");
/// assert_eq!(db.get_plural("en.apples", "", 0), "No apples");
///
/// let mut repl = PlaceholderReplacer::new();
/// repl.add_kv("!count", "5");
/// assert_eq!(db.get_plural_with("en.apples", "", 5, &repl), "5 apples");
/// ```
pub struct TranslationDb {
    hasher: Arc<dyn KeyHasher>,
    storage: PolicyLock<Storage>,
    pending: Mutex<Option<OpenTxn>>,
    next_txn: AtomicU64,
    pool: Arc<TxnPool>,
}

impl fmt::Debug for TranslationDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationDb")
            .field("stats", &self.stats())
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

impl Default for TranslationDb {
    fn default() -> Self {
        Self::new(FxKeyHasher)
    }
}

impl TranslationDb {
    /// Create a store with `hasher` and the default configuration.
    #[must_use]
    pub fn new(hasher: impl KeyHasher + 'static) -> Self {
        Self::from_parts(
            Arc::new(hasher),
            &DbConfig::default(),
            Arc::new(TxnPool::default()),
        )
    }

    /// Start building a store.
    #[must_use]
    pub fn builder() -> DbBuilder {
        DbBuilder::default()
    }

    fn from_parts(hasher: Arc<dyn KeyHasher>, config: &DbConfig, pool: Arc<TxnPool>) -> Self {
        Self {
            hasher,
            storage: PolicyLock::new(Storage::with_config(config), config.policy),
            pending: Mutex::new(None),
            next_txn: AtomicU64::new(0),
            pool,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store `translation` under `key`.
    ///
    /// If a locale is needed it is part of the key, e.g. `"en.menu.open"`.
    /// Empty keys or translations are ignored. While a transaction is open
    /// the write is staged instead of applied.
    pub fn set(&self, key: &str, translation: &str) {
        if key.is_empty() || translation.is_empty() {
            return;
        }
        let hash = self.hash(key);
        {
            let mut pending = self.pending_slot();
            if let Some(open) = pending.as_mut() {
                self.stage_into(&mut open.buffer, hash, translation);
                return;
            }
        }
        self.storage.write().write(hash, translation);
    }

    /// Drop every translation. Staged transaction records are kept and
    /// apply to the emptied store on commit.
    pub fn reset(&self) {
        let cleared = self.storage.write().reset();
        tracing::info!(keys = cleared, "store reset");
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Translation of `key`, or `default`.
    #[must_use]
    pub fn get(&self, key: &str, default: &str) -> String {
        self.resolve(key, default, 1)
    }

    /// Translation of `key` selected by `count`, or `default`.
    #[must_use]
    pub fn get_plural(&self, key: &str, default: &str, count: i64) -> String {
        self.resolve(key, default, count)
    }

    /// Like [`get`](Self::get), then substitutes `replacer`'s placeholders.
    #[must_use]
    pub fn get_with(&self, key: &str, default: &str, replacer: &PlaceholderReplacer) -> String {
        self.get_plural_with(key, default, 1, replacer)
    }

    /// Like [`get_plural`](Self::get_plural), then substitutes
    /// `replacer`'s placeholders.
    #[must_use]
    pub fn get_plural_with(
        &self,
        key: &str,
        default: &str,
        count: i64,
        replacer: &PlaceholderReplacer,
    ) -> String {
        let resolved = self.resolve(key, default, count);
        if resolved.is_empty() || replacer.is_empty() {
            return resolved;
        }
        replacer.commit(&resolved)
    }

    /// Whether `key` has a committed translation.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        !key.is_empty() && self.storage.read().contains(self.hash(key))
    }

    fn resolve(&self, key: &str, default: &str, count: i64) -> String {
        if key.is_empty() {
            return String::new();
        }
        let hash = self.hash(key);
        let found = self.storage.read().lookup(hash, count);
        found.unwrap_or_else(|| default.to_owned())
    }

    // ========================================================================
    // Policy
    // ========================================================================

    /// Switch between enforced and unchecked locking.
    ///
    /// Use [`LockPolicy::Unchecked`] only while a single thread touches the
    /// store, e.g. during an initial bulk load.
    pub fn set_policy(&self, policy: LockPolicy) {
        self.storage.set_policy(policy);
        tracing::debug!(?policy, "lock policy changed");
    }

    /// Current lock policy.
    #[must_use]
    pub fn policy(&self) -> LockPolicy {
        self.storage.policy()
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open a transaction; subsequent [`set`](Self::set) calls are staged.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::TransactionOpen`] if one is already open.
    pub fn begin(&self) -> Result<(), I18nError> {
        self.open().map(|_| ())
    }

    pub(crate) fn open(&self) -> Result<TxnId, I18nError> {
        let mut pending = self.pending_slot();
        if pending.is_some() {
            return Err(I18nError::TransactionOpen);
        }
        let id = TxnId(self.next_txn.fetch_add(1, Ordering::Relaxed));
        *pending = Some(OpenTxn {
            id,
            buffer: self.pool.get(),
        });
        tracing::debug!(txn = id.0, "transaction opened");
        Ok(id)
    }

    /// Open a transaction behind an RAII guard that rolls back on drop.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::TransactionOpen`] if one is already open.
    pub fn transaction(&self) -> Result<Transaction<'_>, I18nError> {
        Transaction::begin(self)
    }

    /// Apply every staged write atomically and close the transaction.
    ///
    /// Returns the number of applied records; `0` if none was open.
    pub fn commit(&self) -> usize {
        self.commit_matching(None).unwrap_or(0)
    }

    /// Commit only if `id` is still the open transaction.
    pub(crate) fn commit_txn(&self, id: TxnId) -> Result<usize, I18nError> {
        self.commit_matching(Some(id)).ok_or(I18nError::TransactionClosed)
    }

    fn commit_matching(&self, id: Option<TxnId>) -> Option<usize> {
        let mut pending = self.pending_slot();
        let open = take_matching(&mut pending, id)?;
        let applied = open.buffer.len();
        {
            let mut storage = self.storage.write_enforced();
            for (hash, translation) in open.buffer.records() {
                storage.write(hash, translation);
            }
        }
        drop(pending);
        self.pool.put(open.buffer);
        tracing::debug!(txn = open.id.0, records = applied, "transaction committed");
        Some(applied)
    }

    /// Discard every staged write and close the transaction.
    pub fn rollback(&self) {
        self.rollback_matching(None);
    }

    /// Roll back only if `id` is still the open transaction.
    pub(crate) fn rollback_txn(&self, id: TxnId) -> bool {
        self.rollback_matching(Some(id))
    }

    fn rollback_matching(&self, id: Option<TxnId>) -> bool {
        let Some(open) = take_matching(&mut self.pending_slot(), id) else {
            return false;
        };
        tracing::debug!(txn = open.id.0, records = open.buffer.len(), "transaction rolled back");
        self.pool.put(open.buffer);
        true
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.pending_slot().is_some()
    }

    /// Whether `id` is still the open transaction.
    pub(crate) fn is_open(&self, id: TxnId) -> bool {
        self.pending_slot().as_ref().is_some_and(|open| open.id == id)
    }

    /// Stage a write into transaction `id`.
    ///
    /// Empty keys or translations are ignored, as with [`set`](Self::set).
    pub(crate) fn stage(&self, id: TxnId, key: &str, translation: &str) -> Result<(), I18nError> {
        let mut pending = self.pending_slot();
        let open = pending
            .as_mut()
            .filter(|open| open.id == id)
            .ok_or(I18nError::TransactionClosed)?;
        if !key.is_empty() && !translation.is_empty() {
            self.stage_into(&mut open.buffer, self.hash(key), translation);
        }
        Ok(())
    }

    /// Stage unless it would change nothing: the latest record for `hash`
    /// in this transaction, or else the committed text, already equals
    /// `translation`.
    fn stage_into(&self, txn: &mut TxnBuffer, hash: u64, translation: &str) {
        let unchanged = match txn.latest(hash) {
            Some(staged) => staged == translation,
            None => self
                .storage
                .read()
                .raw(hash)
                .is_some_and(|raw| raw == translation.as_bytes()),
        };
        if unchanged {
            tracing::trace!(hash, "unchanged translation not staged");
            return;
        }
        txn.stage(hash, translation);
    }

    /// Number of records staged in the open transaction.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.pending_slot().as_ref().map_or(0, |open| open.buffer.len())
    }

    /// Number of records staged in transaction `id`; `0` once it closed.
    pub(crate) fn staged_in(&self, id: TxnId) -> usize {
        self.pending_slot()
            .as_ref()
            .filter(|open| open.id == id)
            .map_or(0, |open| open.buffer.len())
    }

    /// Run `f` against the open transaction's buffer.
    pub fn inspect_staged<R>(&self, f: impl FnOnce(Option<&TxnBuffer>) -> R) -> R {
        f(self.pending_slot().as_ref().map(|open| &open.buffer))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> DbStats {
        let staged = self.staged();
        let storage = self.storage.read();
        DbStats {
            keys: storage.key_count(),
            rules: storage.rule_count(),
            arena_len: storage.arena_len(),
            staged,
            contended: self.storage.contention_count(),
        }
    }

    /// The pool transaction buffers are drawn from.
    #[must_use]
    pub fn pool(&self) -> &Arc<TxnPool> {
        &self.pool
    }

    fn hash(&self, key: &str) -> u64 {
        self.hasher.sum64(key.as_bytes())
    }

    fn pending_slot(&self) -> MutexGuard<'_, Option<OpenTxn>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Take the open transaction if it is `id` (or if `id` is `None`).
fn take_matching(slot: &mut Option<OpenTxn>, id: Option<TxnId>) -> Option<OpenTxn> {
    let stale = matches!((slot.as_ref(), id), (Some(open), Some(id)) if open.id != id);
    if stale { None } else { slot.take() }
}

/// Builder for [`TranslationDb`].
#[derive(Default)]
pub struct DbBuilder {
    hasher: Option<Arc<dyn KeyHasher>>,
    config: DbConfig,
    pool: Option<Arc<TxnPool>>,
}

impl fmt::Debug for DbBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbBuilder")
            .field("has_hasher", &self.hasher.is_some())
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}

impl DbBuilder {
    /// Key hasher (required).
    #[must_use]
    pub fn hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    /// Key hasher shared with other stores.
    #[must_use]
    pub fn shared_hasher(mut self, hasher: Arc<dyn KeyHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Store configuration.
    #[must_use]
    pub fn config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    /// Transaction buffer pool; a private one is created otherwise.
    #[must_use]
    pub fn pool(mut self, pool: Arc<TxnPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the store.
    ///
    /// # Errors
    ///
    /// Returns [`I18nError::NoHasher`] if no hasher was given.
    pub fn build(self) -> Result<TranslationDb, I18nError> {
        let hasher = self.hasher.ok_or(I18nError::NoHasher)?;
        let pool = self.pool.unwrap_or_default();
        Ok(TranslationDb::from_parts(hasher, &self.config, pool))
    }
}
