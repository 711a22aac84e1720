//! Single-pass multi-pattern literal replacement.
//!
//! # Invariants
//!
//! 1. **Single pass**: the source is scanned once, left to right. Inserted
//!    replacement text is never rescanned, so `a -> b` and `b -> a` swap
//!    instead of cascading.
//!
//! 2. **Registration order breaks ties**: at a given position the first
//!    registered pattern that matches wins, even if a later one is longer.
//!
//! 3. **Literal matching**: patterns have no syntax; empty patterns are
//!    ignored.
//!
//! # Complexity
//!
//! `O(n * p)` in the worst case for `n` source bytes and `p` patterns. A
//! first-byte table skips positions no pattern can start at, which keeps the
//! common case (a handful of `!token` placeholders) close to a plain copy.

use smallvec::SmallVec;

/// Batch of literal replacements applied over one source string.
///
/// # Example
///
/// ```
/// use t9n_replace::BatchReplace;
///
/// let out = BatchReplace::new("Hello !name, you have !n messages")
///     .pair("!name", "Ada")
///     .pair("!n", "3")
///     .commit();
/// assert_eq!(out, "Hello Ada, you have 3 messages");
/// ```
#[derive(Debug, Clone)]
pub struct BatchReplace<'a> {
    src: &'a str,
    pairs: SmallVec<[(&'a str, &'a str); 8]>,
    starts: [bool; 256],
}

impl<'a> BatchReplace<'a> {
    /// Start a batch over `src`.
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pairs: SmallVec::new(),
            starts: [false; 256],
        }
    }

    /// Register a replacement. Empty patterns are ignored.
    #[must_use]
    pub fn pair(mut self, pattern: &'a str, replacement: &'a str) -> Self {
        self.push(pattern, replacement);
        self
    }

    /// Register a replacement in place. Empty patterns are ignored.
    pub fn push(&mut self, pattern: &'a str, replacement: &'a str) {
        let Some(&first) = pattern.as_bytes().first() else {
            return;
        };
        self.starts[usize::from(first)] = true;
        self.pairs.push((pattern, replacement));
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pattern is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Run the replacement and return the result.
    #[must_use]
    pub fn commit(&self) -> String {
        if self.pairs.is_empty() {
            return self.src.to_owned();
        }

        let bytes = self.src.as_bytes();
        let mut out = String::with_capacity(self.src.len());
        let mut run_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if !self.starts[usize::from(bytes[i])] {
                i += 1;
                continue;
            }
            let rest = &bytes[i..];
            match self
                .pairs
                .iter()
                .find(|(pattern, _)| rest.starts_with(pattern.as_bytes()))
            {
                Some(&(pattern, replacement)) => {
                    // A match of a valid UTF-8 pattern always starts and ends
                    // on a char boundary, so these slices cannot split a char.
                    out.push_str(&self.src[run_start..i]);
                    out.push_str(replacement);
                    i += pattern.len();
                    run_start = i;
                }
                None => i += 1,
            }
        }

        out.push_str(&self.src[run_start..]);
        out
    }
}
