//! Errors surfaced by the store.
//!
//! Lookups never fail: missing keys and unmatched counts resolve to the
//! caller's default. The only hard errors are construction without a hasher,
//! opening a second transaction, and writing through a handle whose
//! transaction has already finished.

/// Errors from store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I18nError {
    /// The builder finished without a key hasher.
    NoHasher,
    /// A transaction is already bound to the store.
    TransactionOpen,
    /// The transaction behind a handle was already committed or rolled back.
    TransactionClosed,
}

impl std::fmt::Display for I18nError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHasher => write!(f, "no key hasher provided"),
            Self::TransactionOpen => write!(f, "a transaction is already open on this store"),
            Self::TransactionClosed => write!(f, "transaction is no longer open"),
        }
    }
}

impl std::error::Error for I18nError {}
