//! Store configuration.

use crate::lock::LockPolicy;

/// Tuning knobs for a [`TranslationDb`](crate::TranslationDb).
///
/// Capacities are initial reservations only; every structure grows on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Lock policy the store starts with.
    pub policy: LockPolicy,
    /// Bytes reserved for the text arena.
    pub arena_capacity: usize,
    /// Slots reserved in the rule table.
    pub rule_capacity: usize,
    /// Keys reserved in the index.
    pub key_capacity: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            policy: LockPolicy::Enforced,
            arena_capacity: 4 * 1024,
            rule_capacity: 64,
            key_capacity: 64,
        }
    }
}

impl DbConfig {
    /// Configuration for a bulk load: unchecked locking, larger reservations.
    ///
    /// Switch the store back to [`LockPolicy::Enforced`] before serving
    /// concurrent lookups.
    #[must_use]
    pub fn bulk_load(expected_keys: usize) -> Self {
        Self {
            policy: LockPolicy::Unchecked,
            arena_capacity: expected_keys.saturating_mul(32),
            rule_capacity: expected_keys.saturating_mul(2),
            key_capacity: expected_keys,
        }
    }

    /// Set the initial lock policy.
    #[must_use]
    pub fn with_policy(mut self, policy: LockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the arena reservation.
    #[must_use]
    pub fn with_arena_capacity(mut self, bytes: usize) -> Self {
        self.arena_capacity = bytes;
        self
    }

    /// Set the rule table reservation.
    #[must_use]
    pub fn with_rule_capacity(mut self, rules: usize) -> Self {
        self.rule_capacity = rules;
        self
    }

    /// Set the index reservation.
    #[must_use]
    pub fn with_key_capacity(mut self, keys: usize) -> Self {
        self.key_capacity = keys;
        self
    }
}
