//! Lock-free storage core: arena, rule table and index together.
//!
//! Everything here assumes the caller already holds the right lock mode;
//! [`TranslationDb`](crate::TranslationDb) owns that concern.
//!
//! # Write path
//!
//! ```text
//! write(hash, text)
//!   unseen key ─────────────────────────────► append
//!   seen key ── len(text) <= len(old raw)
//!            └─ rules(text) <= rules(old) ──► overwrite in place
//!                                               └─ fewer rules? compact
//!            otherwise ─────────────────────► append (old spans abandoned)
//! ```
//!
//! # Invariants
//!
//! 1. Every indexed entry points at a live, contiguous rule range.
//! 2. Compaction removes rule slots only from the updated key's own range
//!    and rebases every entry past the gap, so other keys keep resolving.
//! 3. Rewriting a key with identical text never grows the arena.

use crate::arena::{Arena, Span};
use crate::config::DbConfig;
use crate::entry::PackedEntry;
use crate::index::KeyIndex;
use crate::plural;
use crate::rule::RuleTable;

/// Arena, rule table and key index of one store.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    arena: Arena,
    rules: RuleTable,
    index: KeyIndex,
}

impl Storage {
    /// Empty storage with the reservations from `config`.
    #[must_use]
    pub fn with_config(config: &DbConfig) -> Self {
        Self {
            arena: Arena::with_capacity(config.arena_capacity),
            rules: RuleTable::with_capacity(config.rule_capacity),
            index: KeyIndex::with_capacity(config.key_capacity),
        }
    }

    /// Store `text` under `hash` and return the new entry.
    pub fn write(&mut self, hash: u64, text: &str) -> PackedEntry {
        match self.index.get(hash) {
            Some(entry) => self.update(hash, entry, text),
            None => self.append(hash, text),
        }
    }

    fn append(&mut self, hash: u64, text: &str) -> PackedEntry {
        let span = self.arena.push(text.as_bytes());
        let lo = self.rules.len() as u32;
        for rule in plural::parse_rules(text.as_bytes(), span) {
            self.rules.push(rule);
        }
        let entry = PackedEntry::encode(lo, self.rules.len() as u32);
        self.index.insert(hash, entry);
        tracing::debug!(hash, len = text.len(), rules = entry.rule_count(), "translation appended");
        entry
    }

    fn update(&mut self, hash: u64, entry: PackedEntry, text: &str) -> PackedEntry {
        let old_rules = self.rules.slice(entry);
        let Some(old_raw) = plural::raw_span(old_rules) else {
            return self.append(hash, text);
        };
        let old_count = old_rules.len();
        if text.len() > old_raw.len as usize || plural::count_rules(text.as_bytes()) > old_count {
            return self.append(hash, text);
        }
        let Some(span) = self.arena.overwrite(old_raw.offset, text.as_bytes()) else {
            return self.append(hash, text);
        };

        let (lo, hi) = entry.decode();
        let parsed = plural::parse_rules(text.as_bytes(), span);
        let new_hi = lo + parsed.len() as u32;
        for (slot, rule) in (lo as usize..).zip(parsed) {
            self.rules.set(slot, rule);
        }
        if new_hi < hi {
            self.compact(new_hi, hi);
        }

        let entry = PackedEntry::encode(lo, new_hi);
        self.index.insert(hash, entry);
        tracing::debug!(hash, len = text.len(), rules = entry.rule_count(), "translation updated in place");
        entry
    }

    /// Remove rule slots `[from, to)` and rebase entries past them.
    fn compact(&mut self, from: u32, to: u32) {
        self.rules.remove(from as usize..to as usize);
        let rebased = self.index.rebase(to, to - from);
        tracing::debug!(removed = to - from, rebased, "rule table compacted");
    }

    /// Resolve `hash` for `count`.
    ///
    /// Returns `None` when the key is unknown, no rule matches, or the
    /// matching payload is empty.
    #[must_use]
    pub fn lookup(&self, hash: u64, count: i64) -> Option<String> {
        let entry = self.index.get(hash)?;
        let rule = plural::select(self.rules.slice(entry), count)?;
        let payload = self.arena.get(rule.text)?;
        if payload.is_empty() {
            return None;
        }
        Some(plural::materialize(payload))
    }

    /// Full original text stored under `hash`.
    #[must_use]
    pub fn raw(&self, hash: u64) -> Option<&[u8]> {
        let span = self.raw_span(hash)?;
        self.arena.get(span)
    }

    fn raw_span(&self, hash: u64) -> Option<Span> {
        let entry = self.index.get(hash)?;
        plural::raw_span(self.rules.slice(entry))
    }

    /// Whether `hash` has an entry.
    #[must_use]
    pub fn contains(&self, hash: u64) -> bool {
        self.index.get(hash).is_some()
    }

    /// Entry stored for `hash`.
    #[must_use]
    pub fn entry(&self, hash: u64) -> PackedEntry {
        self.index.get(hash).unwrap_or(PackedEntry::NONE)
    }

    /// Drop every key, rule and byte. Returns the number of keys dropped.
    pub fn reset(&mut self) -> usize {
        let keys = self.index.len();
        self.index.clear();
        self.rules.clear();
        self.arena.clear();
        keys
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Number of rule slots, live or abandoned.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Arena length in bytes, live or abandoned.
    #[must_use]
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(key: &str) -> u64 {
        use crate::hasher::{FxKeyHasher, KeyHasher};
        FxKeyHasher.sum64(key.as_bytes())
    }

    fn set(storage: &mut Storage, key: &str, text: &str) -> PackedEntry {
        storage.write(hash(key), text)
    }

    fn get(storage: &Storage, key: &str, count: i64) -> String {
        storage.lookup(hash(key), count).unwrap_or_default()
    }

    #[test]
    fn overwrite_longer_appends_shorter_reuses() {
        let mut s = Storage::default();
        set(&mut s, "key1", "Lorem ipsum dolor sit amet, consectetur adipiscing elit.");
        set(
            &mut s,
            "key2",
            "Aenean congue quis nisl ut vulputate. Sed lacus dolor, tempor nec elit sit amet, congue dapibus purus. Pellentesque a lectus vel leo finibus scelerisque.",
        );
        set(
            &mut s,
            "key3",
            "Aliquam blandit mauris mauris, eget bibendum lacus tempus non. Duis orci leo, sagittis sed lorem eu, pulvinar elementum leo.",
        );

        let longer = "Nunc lacinia, purus finibus consectetur ullamcorper, nisi elit laoreet augue, vitae tincidunt tellus velit sit amet arcu.";
        let before = s.arena_len();
        assert_eq!(set(&mut s, "key1", longer).decode(), (3, 4));
        assert_eq!(s.arena_len(), before + longer.len());
        assert_eq!(get(&s, "key1", 1), longer);

        let shorter = "Quisque sit amet viverra ligula. Praesent sagittis, sapien ut rutrum porttitor, dolor ligula accumsan velit, ut lacinia tellus tellus nec tortor.";
        let before = s.arena_len();
        assert_eq!(set(&mut s, "key2", shorter).decode(), (1, 2));
        assert_eq!(s.arena_len(), before);
        assert_eq!(get(&s, "key2", 1), shorter);
    }

    #[test]
    fn overwrite_plural_ranges() {
        let mut s = Storage::default();
        set(&mut s, "key1", "There is one apple|There are many apples");
        set(&mut s, "key2", "{0} There are none|[1,19] There are some|[20,*] There are many");
        set(&mut s, "key3", "{1} :value minute ago|[2,*] :value minutes ago");

        let t9n = "{0} There are none|{1} There is one|[2,*] There are :count";

        assert_eq!(set(&mut s, "key1", t9n).decode(), (7, 10));
        assert_eq!(get(&s, "key1", 1), "There is one");

        assert_eq!(set(&mut s, "key2", t9n).decode(), (2, 5));
        assert_eq!(get(&s, "key2", 1), "There is one");
        assert_eq!(get(&s, "key2", 10), "There are :count");
        assert_eq!(get(&s, "key3", 5), ":value minutes ago");
    }

    #[test]
    fn identical_rewrite_keeps_arena() {
        let mut s = Storage::default();
        set(&mut s, "k", "{0} none|[1,*] some");
        let len = s.arena_len();
        let rules = s.rule_count();
        set(&mut s, "k", "{0} none|[1,*] some");
        assert_eq!(s.arena_len(), len);
        assert_eq!(s.rule_count(), rules);
        assert_eq!(get(&s, "k", 0), "none");
    }

    #[test]
    fn shrinking_rules_compacts_and_rebases() {
        let mut s = Storage::default();
        set(&mut s, "a", "{0} zero|{1} one|[2,*] many");
        set(&mut s, "b", "{1} single|[2,*] plural");
        set(&mut s, "c", "plain");
        assert_eq!(s.rule_count(), 6);

        let entry = set(&mut s, "a", "just one");
        assert_eq!(entry.decode(), (0, 1));
        assert_eq!(s.rule_count(), 4);

        assert_eq!(s.entry(hash("b")).decode(), (1, 3));
        assert_eq!(s.entry(hash("c")).decode(), (3, 4));
        assert_eq!(get(&s, "a", 7), "");
        assert_eq!(get(&s, "a", 1), "just one");
        assert_eq!(get(&s, "b", 1), "single");
        assert_eq!(get(&s, "b", 9), "plural");
        assert_eq!(get(&s, "c", 1), "plain");
    }

    #[test]
    fn more_rules_forces_append() {
        let mut s = Storage::default();
        set(&mut s, "k", "a long single clause");
        let len = s.arena_len();
        let entry = set(&mut s, "k", "x|y");
        assert_eq!(entry.decode(), (1, 3));
        assert_eq!(s.arena_len(), len + 3);
    }

    #[test]
    fn raw_round_trips_full_text() {
        let mut s = Storage::default();
        let text = r"[*,0] neg|{0} zero\|nil|[1,*] pos|";
        set(&mut s, "k", text);
        assert_eq!(s.raw(hash("k")), Some(text.as_bytes()));
        assert_eq!(s.raw(hash("missing")), None);
    }

    #[test]
    fn raw_after_in_place_shrink_is_new_text() {
        let mut s = Storage::default();
        set(&mut s, "k", "{1} one|[2,*] many");
        set(&mut s, "k", "{1} 1|[2,*] n");
        assert_eq!(s.raw(hash("k")), Some(&b"{1} 1|[2,*] n"[..]));
    }

    #[test]
    fn empty_payload_reads_as_missing() {
        let mut s = Storage::default();
        set(&mut s, "k", "{0}|[1,*] some");
        assert_eq!(s.lookup(hash("k"), 0), None);
        assert_eq!(get(&s, "k", 3), "some");
    }

    #[test]
    fn reset_empties_everything() {
        let mut s = Storage::with_config(&DbConfig::default());
        set(&mut s, "k", "v");
        assert!(s.contains(hash("k")));
        assert_eq!(s.reset(), 1);
        assert_eq!((s.key_count(), s.rule_count(), s.arena_len()), (0, 0, 0));
        assert!(!s.contains(hash("k")));
        assert!(s.entry(hash("k")).is_none());
    }
}
