//! Packed rule-range entries.
//!
//! An entry is the half-open range `[lo, hi)` of rule-table indices owned
//! by one key, packed into a single `u64` (`lo` high, `hi` low). The value
//! `0` is reserved for "no entry"; every stored entry has `hi > lo`.

use std::ops::Range;

/// Half-open rule-table range packed into 64 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedEntry(u64);

impl PackedEntry {
    /// The reserved "no entry" value.
    pub const NONE: Self = Self(0);

    /// Pack `[lo, hi)`.
    ///
    /// Callers must keep `lo <= hi`; other inputs round-trip but describe
    /// no meaningful range.
    #[inline]
    #[must_use]
    pub const fn encode(lo: u32, hi: u32) -> Self {
        Self(((lo as u64) << 32) | hi as u64)
    }

    /// Unpack into `(lo, hi)`.
    #[inline]
    #[must_use]
    pub const fn decode(self) -> (u32, u32) {
        ((self.0 >> 32) as u32, self.0 as u32)
    }

    /// Whether this is [`PackedEntry::NONE`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Number of rules in the range.
    #[inline]
    #[must_use]
    pub const fn rule_count(self) -> u32 {
        let (lo, hi) = self.decode();
        hi.saturating_sub(lo)
    }

    /// The range as rule-table indices.
    #[inline]
    #[must_use]
    pub fn range(self) -> Range<usize> {
        let (lo, hi) = self.decode();
        lo as usize..hi as usize
    }

    /// The packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuild an entry from [`PackedEntry::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}
