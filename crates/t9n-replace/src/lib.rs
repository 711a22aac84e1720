#![forbid(unsafe_code)]

//! Placeholder substitution for resolved translations.
//!
//! # Role in t9n
//! `t9n-replace` is the text layer that runs *after* a translation has been
//! resolved. It knows nothing about keys, rules or arenas: callers collect
//! `(placeholder, value)` pairs in a [`PlaceholderReplacer`] and hand it to
//! the store at lookup time.
//!
//! # Primary responsibilities
//! - **BatchReplace**: single-pass multi-pattern literal substitution.
//! - **PlaceholderReplacer**: owned, reusable accumulation of pairs.

pub mod batch;
pub mod placeholder;

pub use batch::BatchReplace;
pub use placeholder::PlaceholderReplacer;
