//! Reusable placeholder accumulation.
//!
//! A [`PlaceholderReplacer`] copies every pair it is given into one private
//! buffer and keeps only offsets, so the caller's strings may be dropped
//! right after `add_kv` returns. `reset` keeps the allocations for reuse.

use std::ops::Range;

use smallvec::SmallVec;

use crate::batch::BatchReplace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pair {
    key: (u32, u32),
    value: (u32, u32),
}

/// Ordered list of `(placeholder, replacement)` pairs.
///
/// # Example
///
/// ```
/// use t9n_replace::PlaceholderReplacer;
///
/// let mut repl = PlaceholderReplacer::new();
/// repl.add_kv("!user", "John Ruth")
///     .add_solid_kv("!val:8000")
///     .add_kv("!cur", "USD");
///
/// assert_eq!(
///     repl.commit("Balance of !user: !val !cur"),
///     "Balance of John Ruth: 8000 USD"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlaceholderReplacer {
    buf: String,
    pairs: SmallVec<[Pair; 4]>,
}

impl PlaceholderReplacer {
    /// Create an empty replacer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placeholder and its replacement.
    ///
    /// Empty placeholders are ignored.
    pub fn add_kv(&mut self, placeholder: &str, replacement: &str) -> &mut Self {
        if placeholder.is_empty() {
            return self;
        }
        let key = self.copy_in(placeholder);
        let value = self.copy_in(replacement);
        self.pairs.push(Pair { key, value });
        self
    }

    /// Add a pair written as `"<placeholder>:<replacement>"`.
    ///
    /// Splits on the first `:` not preceded by a backslash. Input without a
    /// separator, or with nothing after it, is ignored.
    pub fn add_solid_kv(&mut self, solid: &str) -> &mut Self {
        let Some(colon) = find_separator(solid.as_bytes()) else {
            return self;
        };
        if colon + 1 >= solid.len() {
            return self;
        }
        let (placeholder, replacement) = (&solid[..colon], &solid[colon + 1..]);
        self.add_kv(placeholder, replacement)
    }

    /// Number of accumulated pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over the pairs in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter_map(|pair| Some((self.slice(pair.key)?, self.slice(pair.value)?)))
    }

    /// Replace every accumulated placeholder in `raw`.
    ///
    /// With no pairs the input is returned unchanged.
    #[must_use]
    pub fn commit(&self, raw: &str) -> String {
        let mut batch = BatchReplace::new(raw);
        for (placeholder, replacement) in self.pairs() {
            batch.push(placeholder, replacement);
        }
        batch.commit()
    }

    /// Forget all pairs, keeping the buffers.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pairs.clear();
    }

    fn copy_in(&mut self, s: &str) -> (u32, u32) {
        let offset = self.buf.len() as u32;
        self.buf.push_str(s);
        (offset, s.len() as u32)
    }

    fn slice(&self, (offset, len): (u32, u32)) -> Option<&str> {
        self.buf.get(range(offset, len))
    }
}

fn range(offset: u32, len: u32) -> Range<usize> {
    let start = offset as usize;
    start..start.saturating_add(len as usize)
}

fn find_separator(bytes: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b':' => return Some(i),
            _ => i += 1,
        }
    }
    None
}
