//! StatCollection - per-entity map of stat values

use crate::category::CategorySet;
use crate::modifier::StatModifier;
use crate::registry::{StatDefinition, StatRegistry};
use crate::stat_value::{StatValue, VALUE_EPSILON};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Notification raised by a collection after a mutation, delivered
/// synchronously and in mutation order through [`StatCollection::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatEvent {
    /// One stat's effective value changed.
    StatChanged { id: String, value: f64 },
    /// Something in the collection changed. Emitted once per drain, after
    /// the per-stat events, as the coarse signal for consumers that only
    /// care that *a* change happened.
    CollectionChanged,
}

/// All stat values owned by one entity.
///
/// Stat values are materialized lazily the first time an id is touched by a
/// write; ids are normalized (lowercase + alias hop) through the shared
/// registry before every lookup. Writes to unregistered ids synthesize an
/// uncategorized fallback definition with a warning - misuse is never fatal.
#[derive(Debug)]
pub struct StatCollection {
    registry: Rc<StatRegistry>,
    stats: HashMap<String, StatValue>,
    events: Vec<StatEvent>,
}

impl StatCollection {
    pub fn new(registry: Rc<StatRegistry>) -> Self {
        StatCollection {
            registry,
            stats: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Rc<StatRegistry> {
        &self.registry
    }

    /// Fetch or lazily materialize the stat value for `id`.
    ///
    /// Direct mutation through the returned reference bypasses event
    /// emission; the named collection methods are the eventful surface.
    pub fn get_or_create(&mut self, id: &str) -> &mut StatValue {
        let canonical = self.registry.normalize_id(id);
        let registry = &self.registry;
        self.stats.entry(canonical).or_insert_with_key(|key| {
            let definition = registry.definition(key).unwrap_or_else(|| {
                warn!(id = %key, "materializing unregistered stat with fallback definition");
                Rc::new(StatDefinition::fallback(key))
            });
            StatValue::new(definition)
        })
    }

    /// Read-only lookup; does not materialize.
    pub fn stat(&self, id: &str) -> Option<&StatValue> {
        self.stats.get(&self.registry.normalize_id(id))
    }

    /// Effective value of `id`, or a fallback without materializing:
    /// the registered default if the stat exists in the registry, otherwise
    /// the caller-supplied default.
    pub fn get_value(&self, id: &str, default: f64) -> f64 {
        let canonical = self.registry.normalize_id(id);
        if let Some(stat) = self.stats.get(&canonical) {
            return stat.value();
        }
        match self.registry.definition(&canonical) {
            Some(def) => def.clamp(def.default_value),
            None => {
                debug!(id = %canonical, "read of unknown stat, returning caller default");
                default
            }
        }
    }

    /// Set the base value of `id`, materializing it if needed.
    pub fn set_base_value(&mut self, id: &str, value: f64) {
        let canonical = self.registry.normalize_id(id);
        let before = self.get_value(&canonical, 0.0);
        self.get_or_create(&canonical).set_base_value(value);
        self.emit_if_changed(&canonical, before);
    }

    /// Add a modifier, resolving conditional-extension targets.
    ///
    /// If the modifier targets a derived extension id, the target is
    /// rewritten to the base stat and the extension's category mask is
    /// folded into the modifier's own gate. Returns the canonical id the
    /// modifier landed on.
    pub fn add_modifier(&mut self, mut modifier: StatModifier) -> String {
        let (canonical, extra) = self.registry.resolve_target(&modifier.stat_id);
        if !extra.is_empty() {
            modifier.required_categories |= extra;
        }
        modifier.stat_id = canonical.clone();
        let before = self.get_value(&canonical, 0.0);
        self.get_or_create(&canonical).add_modifier(modifier);
        self.emit_if_changed(&canonical, before);
        canonical
    }

    /// Remove a modifier by id from whichever stat holds it. Returns false
    /// if no stat does.
    pub fn remove_modifier(&mut self, modifier_id: &str) -> bool {
        let holder = self
            .stats
            .iter()
            .find(|(_, stat)| stat.modifier(modifier_id).is_some())
            .map(|(id, _)| id.clone());
        let Some(stat_id) = holder else {
            return false;
        };
        let before = self.get_value(&stat_id, 0.0);
        if let Some(stat) = self.stats.get_mut(&stat_id) {
            stat.remove_modifier(modifier_id);
        }
        self.emit_if_changed(&stat_id, before);
        true
    }

    /// Remove every modifier contributed by `source` across all stats,
    /// returning the total count removed.
    pub fn remove_modifiers_from_source(&mut self, source: &str) -> usize {
        let ids: Vec<String> = self.stats.keys().cloned().collect();
        let mut removed = 0;
        for stat_id in ids {
            let before = self.get_value(&stat_id, 0.0);
            let count = match self.stats.get_mut(&stat_id) {
                Some(stat) => stat.remove_modifiers_from_source(source),
                None => 0,
            };
            if count > 0 {
                removed += count;
                self.emit_if_changed(&stat_id, before);
            }
        }
        removed
    }

    /// Replace the active-category set of `id`.
    pub fn set_active_categories(&mut self, id: &str, categories: CategorySet) {
        let canonical = self.registry.normalize_id(id);
        let before = self.get_value(&canonical, 0.0);
        self.get_or_create(&canonical)
            .set_active_categories(categories);
        self.emit_if_changed(&canonical, before);
    }

    /// OR categories into the active set of `id`.
    pub fn add_active_categories(&mut self, id: &str, categories: CategorySet) {
        let canonical = self.registry.normalize_id(id);
        let current = self
            .stat(&canonical)
            .map(|s| s.active_categories())
            .unwrap_or_default();
        self.set_active_categories(&canonical, current | categories);
    }

    /// Clear categories from the active set of `id`.
    pub fn remove_active_categories(&mut self, id: &str, categories: CategorySet) {
        let canonical = self.registry.normalize_id(id);
        let current = self
            .stat(&canonical)
            .map(|s| s.active_categories())
            .unwrap_or_default();
        self.set_active_categories(&canonical, current - categories);
    }

    /// Materialized stats whose *definition* carries every bit of `mask`.
    /// This filters on static grouping categories, not the dynamic
    /// active sets.
    pub fn stats_in_category(&self, mask: CategorySet) -> impl Iterator<Item = &StatValue> {
        self.stats
            .values()
            .filter(move |stat| stat.definition().categories.contains_all(mask))
    }

    /// Hand the pending notification queue to the consumer. Per-stat events
    /// come first in mutation order, then one `CollectionChanged` if there
    /// was any change since the last drain.
    pub fn drain_events(&mut self) -> Vec<StatEvent> {
        let mut events = std::mem::take(&mut self.events);
        if !events.is_empty() {
            events.push(StatEvent::CollectionChanged);
        }
        events
    }

    /// Whether any notification is waiting to be drained.
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// All materialized stats, in unspecified order. Use the report module
    /// for deterministic output.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatValue)> {
        self.stats.iter()
    }

    fn emit_if_changed(&mut self, canonical: &str, before: f64) {
        let after = self.get_value(canonical, 0.0);
        if (after - before).abs() > VALUE_EPSILON {
            self.events.push(StatEvent::StatChanged {
                id: canonical.to_string(),
                value: after,
            });
        }
    }
}
