//! Plural rules and the rule table.
//!
//! A [`Rule`] is one `|`-separated clause of a translation: a count range
//! plus two views into the arena, the payload (`text`) and the complete
//! source chunk including formula and trailing delimiter (`raw`).
//!
//! # Invariants
//!
//! 1. Rules of one translation are contiguous in the table and keep their
//!    declaration order.
//! 2. The `raw` spans of consecutive rules of one translation are adjacent
//!    in the arena, so their union is the original text.

use std::ops::Range;

use crate::arena::Span;
use crate::entry::PackedEntry;

/// Low bound written as `*`.
pub const UNBOUNDED_LOW: i32 = i32::MIN;
/// High bound written as `*`.
pub const UNBOUNDED_HIGH: i32 = i32::MAX;

/// One plural clause: `[low, high)` and its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rule {
    /// Inclusive low bound; [`UNBOUNDED_LOW`] means no bound.
    pub low: i32,
    /// Exclusive high bound; [`UNBOUNDED_HIGH`] means no bound.
    pub high: i32,
    /// Payload text.
    pub text: Span,
    /// Source chunk including formula prefix and trailing `|`.
    pub raw: Span,
}

impl Rule {
    /// Whether `count` falls into `[low, high)`.
    ///
    /// The sentinel bounds are open-ended, so counts outside the `i32`
    /// range still match a `*` bound.
    #[inline]
    #[must_use]
    pub fn matches(&self, count: i64) -> bool {
        let above = self.low == UNBOUNDED_LOW || count >= i64::from(self.low);
        let below = self.high == UNBOUNDED_HIGH || count < i64::from(self.high);
        above && below
    }
}

/// Append-mostly list of rules shared by every key of a store.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Create an empty table with room for `capacity` rules.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rules: Vec::with_capacity(capacity),
        }
    }

    /// Number of rules, live or abandoned.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append one rule.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Replace the rule at `index`. Returns `false` if out of range.
    pub fn set(&mut self, index: usize, rule: Rule) -> bool {
        match self.rules.get_mut(index) {
            Some(slot) => {
                *slot = rule;
                true
            }
            None => false,
        }
    }

    /// Rules covered by `entry`; empty when the range is out of bounds.
    #[inline]
    #[must_use]
    pub fn slice(&self, entry: PackedEntry) -> &[Rule] {
        self.rules.get(entry.range()).unwrap_or(&[])
    }

    /// Remove `range`, shifting every later rule down.
    pub fn remove(&mut self, range: Range<usize>) {
        if range.start < range.end && range.end <= self.rules.len() {
            self.rules.drain(range);
        }
    }

    /// Drop every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }
}
