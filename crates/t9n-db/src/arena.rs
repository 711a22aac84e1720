//! Append-only byte arena with offset views.
//!
//! # Design
//! - Append-only: bytes are only ever added at the end; the one exception
//!   is [`Arena::overwrite`], which rewrites an already written region in
//!   place without changing the length.
//! - Views are [`Span`]s (offset + length), not pointers, so growing the
//!   backing `Vec` never invalidates them.
//! - Abandoned regions are never reclaimed. Only [`Arena::clear`] shrinks
//!   the arena, and it invalidates every outstanding span.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Stale span | Span read after `clear` | `get` returns `None` |
//! | Foreign span | Span from another arena | `get` returns `None` or unrelated bytes |
//! | Overflow | Arena grows past `u32::MAX` bytes | `push` panics |

use std::ops::Range;

/// View into an [`Arena`]: a byte offset and a length.
///
/// Spans do not borrow the arena. They are validated on every access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Offset of the first byte.
    pub offset: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// The empty span at offset zero.
    pub const EMPTY: Self = Self { offset: 0, len: 0 };

    /// Create a span.
    #[inline]
    #[must_use]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Whether the span covers no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exclusive end offset, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    /// Span from the start of `self` to the end of `last`.
    ///
    /// Used to rebuild the contiguous raw text of consecutive rules.
    #[inline]
    #[must_use]
    pub const fn through(self, last: Span) -> Span {
        Span::new(self.offset, last.end().saturating_sub(self.offset))
    }

    /// The span as a `usize` range.
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start.saturating_add(self.len as usize)
    }
}

/// Growable byte buffer holding all translation text of a store.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    bytes: Vec<u8>,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty arena with `capacity` bytes reserved.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Total bytes written, live or abandoned.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append `data` and return its span.
    ///
    /// # Panics
    ///
    /// Panics if the arena would exceed `u32::MAX` bytes.
    pub fn push(&mut self, data: &[u8]) -> Span {
        let offset = self.bytes.len();
        assert!(
            offset
                .checked_add(data.len())
                .is_some_and(|end| end <= u32::MAX as usize),
            "arena exceeds u32::MAX bytes"
        );
        self.bytes.extend_from_slice(data);
        Span::new(offset as u32, data.len() as u32)
    }

    /// Rewrite `data.len()` bytes starting at `offset`.
    ///
    /// The region must already be written; returns `None` (and leaves the
    /// arena untouched) if it is not.
    pub fn overwrite(&mut self, offset: u32, data: &[u8]) -> Option<Span> {
        let span = Span::new(offset, u32::try_from(data.len()).ok()?);
        self.bytes.get_mut(span.range())?.copy_from_slice(data);
        Some(span)
    }

    /// Bytes behind `span`, or `None` if it lies outside the arena.
    #[inline]
    #[must_use]
    pub fn get(&self, span: Span) -> Option<&[u8]> {
        self.bytes.get(span.range())
    }

    /// Drop all bytes. Every span handed out so far becomes stale.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// The whole arena.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
