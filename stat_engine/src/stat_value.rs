//! StatValue - per-stat modifier ledger and cached recomputation

use crate::category::CategorySet;
use crate::modifier::{ModifierKind, StatModifier};
use crate::registry::StatDefinition;
use std::cell::Cell;
use std::rc::Rc;

/// Two floats closer than this are treated as equal by the epsilon-aware
/// setters, so refreshing a base value to itself does not invalidate the
/// cache.
pub const VALUE_EPSILON: f64 = 1e-9;

/// One stat on one entity: a base value, the modifier ledger, the dynamic
/// active-category set, and a memoized effective value.
///
/// The ledger is a `Vec` on purpose: insertion order is the determinism
/// contract. Multiplicative modifiers apply in insertion order and override
/// ties resolve to the most recently inserted, so the container's iteration
/// order *is* the documented policy, not an accident.
///
/// The cache uses `Cell` so `value()` can memoize through `&self`; the
/// engine is single-threaded by design.
#[derive(Debug, Clone)]
pub struct StatValue {
    definition: Rc<StatDefinition>,
    base_value: f64,
    /// Dynamic per-instance categories gating conditional modifiers.
    /// Distinct from `definition.categories`, which is static grouping.
    active_categories: CategorySet,
    ledger: Vec<StatModifier>,
    cached: Cell<f64>,
    dirty: Cell<bool>,
}

impl StatValue {
    /// Create a stat value starting at the definition's default.
    pub fn new(definition: Rc<StatDefinition>) -> Self {
        let base = definition.default_value;
        Self::with_base(definition, base)
    }

    /// Create a stat value with an explicit starting base.
    pub fn with_base(definition: Rc<StatDefinition>, base_value: f64) -> Self {
        StatValue {
            definition,
            base_value,
            active_categories: CategorySet::empty(),
            ledger: Vec::new(),
            cached: Cell::new(0.0),
            dirty: Cell::new(true),
        }
    }

    pub fn definition(&self) -> &Rc<StatDefinition> {
        &self.definition
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Set the base value. Marks dirty only if the value actually changed.
    pub fn set_base_value(&mut self, value: f64) {
        if (value - self.base_value).abs() > VALUE_EPSILON {
            self.base_value = value;
            self.dirty.set(true);
        }
    }

    pub fn active_categories(&self) -> CategorySet {
        self.active_categories
    }

    /// Replace the active-category set. This is the single hook that makes
    /// conditional modifiers activate or deactivate without being re-added.
    pub fn set_active_categories(&mut self, categories: CategorySet) {
        if categories != self.active_categories {
            self.active_categories = categories;
            self.dirty.set(true);
        }
    }

    /// OR categories into the active set.
    pub fn add_active_categories(&mut self, categories: CategorySet) {
        self.set_active_categories(self.active_categories | categories);
    }

    /// Clear categories from the active set.
    pub fn remove_active_categories(&mut self, categories: CategorySet) {
        self.set_active_categories(self.active_categories - categories);
    }

    /// Add a modifier. A duplicate id replaces the existing entry (remove
    /// then append), since sources legitimately refresh their own modifiers;
    /// the replacement lands at the end of the ledger.
    pub fn add_modifier(&mut self, modifier: StatModifier) {
        self.ledger.retain(|m| m.id != modifier.id);
        self.ledger.push(modifier);
        self.dirty.set(true);
    }

    /// Remove a modifier by id. Returns whether anything was removed;
    /// removing a missing id is a no-op.
    pub fn remove_modifier(&mut self, id: &str) -> bool {
        let before = self.ledger.len();
        self.ledger.retain(|m| m.id != id);
        let removed = self.ledger.len() != before;
        if removed {
            self.dirty.set(true);
        }
        removed
    }

    /// Remove every modifier contributed by `source`, returning the count.
    pub fn remove_modifiers_from_source(&mut self, source: &str) -> usize {
        let before = self.ledger.len();
        self.ledger.retain(|m| m.source != source);
        let removed = before - self.ledger.len();
        if removed > 0 {
            self.dirty.set(true);
        }
        removed
    }

    /// The full ledger, in insertion order.
    pub fn modifiers(&self) -> &[StatModifier] {
        &self.ledger
    }

    pub fn modifier(&self, id: &str) -> Option<&StatModifier> {
        self.ledger.iter().find(|m| m.id == id)
    }

    /// A modifier is visible iff it is active and its category gate is
    /// satisfied by the current active set.
    fn is_visible(&self, modifier: &StatModifier) -> bool {
        modifier.active
            && (modifier.required_categories.is_empty()
                || self
                    .active_categories
                    .contains_all(modifier.required_categories))
    }

    /// Currently visible modifiers, in ledger insertion order.
    pub fn visible_modifiers(&self) -> impl Iterator<Item = &StatModifier> {
        self.ledger.iter().filter(|m| self.is_visible(m))
    }

    /// Visible modifiers of one combination kind, in insertion order.
    pub fn visible_modifiers_of_kind(
        &self,
        kind: ModifierKind,
    ) -> impl Iterator<Item = &StatModifier> {
        self.visible_modifiers().filter(move |m| m.kind == kind)
    }

    /// The effective value. Recomputes only when dirty; otherwise a cache
    /// read. Pure with respect to repeated calls.
    pub fn value(&self) -> f64 {
        if self.dirty.get() {
            self.cached.set(self.recompute());
            self.dirty.set(false);
        }
        self.cached.get()
    }

    /// Whether the next `value()` call will recompute.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// The fixed-order resolution algorithm.
    ///
    /// 1. Visibility filter (active + category gate).
    /// 2. Override: highest priority wins, ties to the most recently
    ///    inserted; if one exists its value is the result and the
    ///    remaining steps are skipped entirely.
    /// 3. Additive: base plus the sum of visible additive values.
    /// 4. PercentAdditive: one `(1 + sum/100)` multiplier over the summed
    ///    percents - summed, never compounded.
    /// 5. Multiplicative: each visible multiplier applied sequentially in
    ///    insertion order - these compound.
    /// 6. Clamp to the definition's range, rounding if integer-valued.
    fn recompute(&self) -> f64 {
        let mut winner: Option<&StatModifier> = None;
        for m in self.visible_modifiers_of_kind(ModifierKind::Override) {
            match winner {
                // Forward iteration makes >= pick the most recent on ties.
                Some(current) if m.priority < current.priority => {}
                _ => winner = Some(m),
            }
        }
        if let Some(overriding) = winner {
            return self.definition.clamp(overriding.value);
        }

        let additive: f64 = self
            .visible_modifiers_of_kind(ModifierKind::Additive)
            .map(|m| m.value)
            .sum();
        let percent: f64 = self
            .visible_modifiers_of_kind(ModifierKind::PercentAdditive)
            .map(|m| m.value)
            .sum();

        let mut result = (self.base_value + additive) * (1.0 + percent / 100.0);
        for m in self.visible_modifiers_of_kind(ModifierKind::Multiplicative) {
            result *= m.value;
        }

        self.definition.clamp(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn definition(min: f64, max: f64) -> Rc<StatDefinition> {
        Rc::new(StatDefinition::new("damage", "Damage", 0.0, min, max, CategorySet::OFFENSE).unwrap())
    }

    fn unbounded() -> Rc<StatDefinition> {
        definition(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn additive(id: &str, value: f64) -> StatModifier {
        StatModifier::new(id, "damage", value, ModifierKind::Additive, "test")
    }

    fn percent(id: &str, value: f64) -> StatModifier {
        StatModifier::new(id, "damage", value, ModifierKind::PercentAdditive, "test")
    }

    fn multiplicative(id: &str, value: f64) -> StatModifier {
        StatModifier::new(id, "damage", value, ModifierKind::Multiplicative, "test")
    }

    #[test]
    fn test_value_without_modifiers_is_base() {
        let stat = StatValue::with_base(unbounded(), 42.0);
        assert!((stat.value() - 42.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 10.0));
        stat.add_modifier(percent("p", 50.0));
        stat.add_modifier(multiplicative("m", 1.1));
        let first = stat.value();
        for _ in 0..10 {
            assert_eq!(stat.value(), first);
        }
    }

    #[test]
    fn test_additive_sums_onto_base() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 30.0));
        stat.add_modifier(additive("b", -10.0));
        assert!((stat.value() - 120.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_percent_sums_not_compounds() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(percent("p1", 20.0));
        stat.add_modifier(percent("p2", 30.0));
        // 100 * 1.5 = 150, not 100 * 1.2 * 1.3 = 156.
        assert!((stat.value() - 150.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_multiplicative_compounds_in_insertion_order() {
        let mut stat = StatValue::with_base(unbounded(), 10.0);
        stat.add_modifier(multiplicative("m1", 2.0));
        stat.add_modifier(multiplicative("m2", 1.5));
        assert!((stat.value() - 30.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_override_dominates_everything_else() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 500.0));
        stat.add_modifier(percent("p", 300.0));
        stat.add_modifier(multiplicative("m", 10.0));
        stat.add_modifier(StatModifier::new("o", "damage", 77.0, ModifierKind::Override, "test").with_priority(5));
        assert!((stat.value() - 77.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_override_highest_priority_wins() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(StatModifier::new("low", "damage", 10.0, ModifierKind::Override, "test").with_priority(1));
        stat.add_modifier(StatModifier::new("high", "damage", 20.0, ModifierKind::Override, "test").with_priority(9));
        stat.add_modifier(StatModifier::new("mid", "damage", 15.0, ModifierKind::Override, "test").with_priority(5));
        assert!((stat.value() - 20.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_override_tie_breaks_to_most_recent() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(StatModifier::new("first", "damage", 10.0, ModifierKind::Override, "test").with_priority(5));
        stat.add_modifier(StatModifier::new("second", "damage", 20.0, ModifierKind::Override, "test").with_priority(5));
        assert!((stat.value() - 20.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_full_pipeline_order() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 50.0));
        stat.add_modifier(percent("p1", 40.0));
        stat.add_modifier(percent("p2", 30.0));
        stat.add_modifier(multiplicative("m1", 1.2));
        stat.add_modifier(multiplicative("m2", 1.15));
        // (100 + 50) * 1.70 * 1.2 * 1.15
        let expected = 150.0 * 1.70 * 1.2 * 1.15;
        assert!((stat.value() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_conditional_gating_round_trip() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("fire_bonus", 40.0).with_required_categories(CategorySet::FIRE));
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);

        stat.set_active_categories(CategorySet::FIRE);
        assert!((stat.value() - 140.0).abs() < VALUE_EPSILON);

        stat.set_active_categories(CategorySet::empty());
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_gate_requires_all_bits() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(
            additive("combo", 40.0)
                .with_required_categories(CategorySet::FIRE | CategorySet::PROJECTILE),
        );
        stat.set_active_categories(CategorySet::FIRE);
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);
        stat.add_active_categories(CategorySet::PROJECTILE);
        assert!((stat.value() - 140.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_inactive_modifier_contributes_nothing() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 50.0).inactive());
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_clamping() {
        let mut stat = StatValue::with_base(definition(0.0, 100.0), 50.0);
        stat.add_modifier(additive("huge", 1e6));
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);
        stat.add_modifier(additive("negative", -1e9));
        assert!((stat.value()).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_integer_rounding() {
        let def = Rc::new(
            StatDefinition::new("level", "Level", 1.0, 1.0, 100.0, CategorySet::empty())
                .unwrap()
                .as_integer(),
        );
        let mut stat = StatValue::with_base(def, 10.0);
        stat.add_modifier(StatModifier::new("p", "level", 17.0, ModifierKind::PercentAdditive, "test"));
        // 10 * 1.17 = 11.7 -> 12
        assert!((stat.value() - 12.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_duplicate_id_replaces() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("ring", 10.0));
        stat.add_modifier(additive("ring", 25.0));
        assert_eq!(stat.modifiers().len(), 1);
        assert!((stat.value() - 125.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_replacement_moves_to_ledger_end() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(StatModifier::new("a", "damage", 1.0, ModifierKind::Override, "t").with_priority(5));
        stat.add_modifier(StatModifier::new("b", "damage", 2.0, ModifierKind::Override, "t").with_priority(5));
        // Refreshing "a" re-inserts it after "b", so it now wins the tie.
        stat.add_modifier(StatModifier::new("a", "damage", 3.0, ModifierKind::Override, "t").with_priority(5));
        assert!((stat.value() - 3.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_remove_modifier() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(additive("a", 10.0));
        assert!(stat.remove_modifier("a"));
        assert!(!stat.remove_modifier("a"));
        assert!((stat.value() - 100.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_remove_by_source() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        stat.add_modifier(StatModifier::new("a", "damage", 10.0, ModifierKind::Additive, "sword"));
        stat.add_modifier(StatModifier::new("b", "damage", 20.0, ModifierKind::Additive, "sword"));
        stat.add_modifier(StatModifier::new("c", "damage", 5.0, ModifierKind::Additive, "ring"));
        assert_eq!(stat.remove_modifiers_from_source("sword"), 2);
        assert_eq!(stat.remove_modifiers_from_source("sword"), 0);
        assert!((stat.value() - 105.0).abs() < VALUE_EPSILON);
    }

    #[test]
    fn test_epsilon_setter_does_not_dirty() {
        let mut stat = StatValue::with_base(unbounded(), 100.0);
        let _ = stat.value();
        assert!(!stat.is_dirty());
        stat.set_base_value(100.0);
        assert!(!stat.is_dirty());
        stat.set_active_categories(CategorySet::empty());
        assert!(!stat.is_dirty());
        stat.set_base_value(101.0);
        assert!(stat.is_dirty());
    }

    proptest! {
        #[test]
        fn prop_value_is_deterministic(base in -1e6f64..1e6, add in -1e3f64..1e3, pct in -90f64..300.0) {
            let mut stat = StatValue::with_base(unbounded(), base);
            stat.add_modifier(additive("a", add));
            stat.add_modifier(percent("p", pct));
            let first = stat.value();
            prop_assert_eq!(stat.value(), first);
        }

        #[test]
        fn prop_value_stays_in_range(base in -1e6f64..1e6, add in -1e6f64..1e6, mult in -10f64..10.0) {
            let mut stat = StatValue::with_base(definition(0.0, 100.0), base);
            stat.add_modifier(additive("a", add));
            stat.add_modifier(multiplicative("m", mult));
            let value = stat.value();
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }
}
