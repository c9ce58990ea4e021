//! StatModifier - a single contribution to a stat's value

use crate::category::CategorySet;
use serde::{Deserialize, Serialize};

/// How a modifier combines with the running value during recomputation.
///
/// Application order is fixed: Override (if any visible one exists, it wins
/// outright) → Additive → PercentAdditive → Multiplicative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Added to the base value.
    Additive,
    /// Percent bonus in percent units (20.0 = +20%). All visible percent
    /// bonuses are summed and applied as a single multiplier - they do not
    /// compound with each other.
    PercentAdditive,
    /// Applied as its own sequential multiplication, in ledger insertion
    /// order. These compound.
    Multiplicative,
    /// Replaces the computed value outright. Among visible overrides the
    /// highest priority wins, ties broken by most recent insertion.
    Override,
}

/// An immutable-after-creation contribution to one stat.
///
/// A modifier is a value object: once added to a ledger it is never edited
/// in place. Refreshing a modifier means re-adding it under the same id,
/// which replaces the old entry and unconditionally invalidates the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct StatModifier {
    /// Unique within one collection. Re-adding the same id replaces.
    pub id: String,
    /// Target stat id; may be a conditional-extension derived id, which the
    /// collection resolves to the base stat on insertion.
    pub stat_id: String,
    /// Primary numeric payload, interpreted per `kind`.
    pub value: f64,
    /// Auxiliary payload for consumers (e.g. the max of a rolled range).
    /// Not used by the resolution algorithm.
    pub secondary_value: f64,
    pub kind: ModifierKind,
    /// Human-readable origin label ("iron_ring", "haste_buff", ...). Used
    /// for bulk removal when a source is unequipped or dispelled.
    pub source: String,
    /// Override tie-breaking; higher wins.
    pub priority: i32,
    /// Inactive modifiers stay in the ledger but contribute nothing.
    pub active: bool,
    /// Category gate. Empty means unconditional; non-empty means the owning
    /// stat value's active set must contain every bit for this modifier to
    /// be visible.
    pub required_categories: CategorySet,
    /// Lifetime in seconds; <= 0 means permanent.
    pub duration: f64,
    /// Session clock time at which the modifier was applied. Stamped by the
    /// session when a timed modifier is registered with the sweeper.
    pub created_at: f64,
}

impl StatModifier {
    /// Create a permanent, unconditional modifier.
    pub fn new(
        id: impl Into<String>,
        stat_id: impl Into<String>,
        value: f64,
        kind: ModifierKind,
        source: impl Into<String>,
    ) -> Self {
        StatModifier {
            id: id.into(),
            stat_id: stat_id.into(),
            value,
            secondary_value: 0.0,
            kind,
            source: source.into(),
            priority: 0,
            active: true,
            required_categories: CategorySet::empty(),
            duration: 0.0,
            created_at: 0.0,
        }
    }

    /// Set the secondary payload.
    pub fn with_secondary_value(mut self, value: f64) -> Self {
        self.secondary_value = value;
        self
    }

    /// Set the override priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Gate this modifier behind a category mask.
    pub fn with_required_categories(mut self, categories: CategorySet) -> Self {
        self.required_categories = categories;
        self
    }

    /// Give this modifier a finite lifetime in seconds.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Stamp the application time (session clock seconds).
    pub fn with_created_at(mut self, now: f64) -> Self {
        self.created_at = now;
        self
    }

    /// Mark the modifier as initially inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this modifier expires on its own.
    pub fn is_temporary(&self) -> bool {
        self.duration > 0.0
    }

    /// Session clock time at which this modifier expires. Meaningless for
    /// permanent modifiers.
    pub fn expires_at(&self) -> f64 {
        self.created_at + self.duration
    }

    /// Whether the modifier has run out at session time `now`.
    pub fn has_expired(&self, now: f64) -> bool {
        self.is_temporary() && now - self.created_at >= self.duration
    }

    /// Seconds of lifetime left at session time `now`, clamped at zero.
    pub fn remaining(&self, now: f64) -> f64 {
        if !self.is_temporary() {
            return f64::INFINITY;
        }
        (self.expires_at() - now).max(0.0)
    }
}
