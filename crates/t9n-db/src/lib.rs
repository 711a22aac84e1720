#![forbid(unsafe_code)]

//! Embedded translation store.
//!
//! Keys are hashed to 64 bits; translations live in one byte arena and are
//! split into range plural rules on write (`{0} none|[1,19] some|[20,*] many`).
//! Lookups select a rule by count and optionally substitute placeholders.
//! Writes can be staged in a transaction and applied atomically.

pub mod arena;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod hasher;
pub mod index;
pub mod lock;
pub mod plural;
pub mod pool;
pub mod rule;
pub mod storage;
pub mod txn;

pub use arena::Span;
pub use config::DbConfig;
pub use db::{DbBuilder, DbStats, TranslationDb};
pub use entry::PackedEntry;
pub use error::I18nError;
pub use hasher::{FxKeyHasher, KeyHasher};
pub use lock::LockPolicy;
pub use pool::{TxnBuffer, TxnPool};
pub use txn::Transaction;

pub use t9n_replace::PlaceholderReplacer;
