//! StatSession - the session root owning collections and the sweeper

use crate::collection::StatCollection;
use crate::modifier::StatModifier;
use crate::registry::StatRegistry;
use crate::sweeper::TimedModifierSweeper;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Owns every entity's [`StatCollection`] plus the [`TimedModifierSweeper`],
/// and wires the two together.
///
/// The registry is frozen (`Rc`) before the session is built; collections
/// share it read-only. `tick` drives the sweep from the game's update loop
/// and applies expirations through the normal removal path, so expiry emits
/// the same change events as an explicit removal would.
#[derive(Debug)]
pub struct StatSession {
    registry: Rc<StatRegistry>,
    collections: HashMap<String, StatCollection>,
    sweeper: TimedModifierSweeper,
}

impl StatSession {
    pub fn new(registry: Rc<StatRegistry>) -> Self {
        StatSession {
            registry,
            collections: HashMap::new(),
            sweeper: TimedModifierSweeper::new(),
        }
    }

    pub fn with_poll_interval(registry: Rc<StatRegistry>, poll_interval: f64) -> Self {
        StatSession {
            registry,
            collections: HashMap::new(),
            sweeper: TimedModifierSweeper::with_poll_interval(poll_interval),
        }
    }

    pub fn registry(&self) -> &Rc<StatRegistry> {
        &self.registry
    }

    /// Session clock in seconds (the sweeper's clock).
    pub fn now(&self) -> f64 {
        self.sweeper.now()
    }

    pub fn sweeper(&self) -> &TimedModifierSweeper {
        &self.sweeper
    }

    /// Fetch or create the collection for an entity. Idempotent.
    pub fn spawn(&mut self, entity: impl Into<String>) -> &mut StatCollection {
        let registry = &self.registry;
        self.collections
            .entry(entity.into())
            .or_insert_with(|| StatCollection::new(Rc::clone(registry)))
    }

    /// Destroy an entity's collection, deregistering all of its temporary
    /// modifiers from the sweep set so no orphaned entries remain.
    pub fn despawn(&mut self, entity: &str) -> bool {
        let removed = self.collections.remove(entity).is_some();
        if removed {
            let dropped = self.sweeper.remove_entity(entity);
            debug!(entity, dropped, "despawned entity");
        }
        removed
    }

    pub fn collection(&self, entity: &str) -> Option<&StatCollection> {
        self.collections.get(entity)
    }

    pub fn collection_mut(&mut self, entity: &str) -> Option<&mut StatCollection> {
        self.collections.get_mut(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.collections.len()
    }

    /// Add a modifier to an entity, stamping the session clock onto it and
    /// tracking it with the sweeper if it is temporary. This is the
    /// preferred path for timed modifiers; untracked timed modifiers added
    /// straight to a collection never expire.
    pub fn add_modifier(&mut self, entity: &str, modifier: StatModifier) {
        let modifier = modifier.with_created_at(self.sweeper.now());
        let duration = modifier.duration;
        let modifier_id = modifier.id.clone();
        let stat_id = self.spawn(entity.to_string()).add_modifier(modifier);
        if duration > 0.0 {
            self.sweeper.register(entity, stat_id, modifier_id, duration);
        } else {
            // Replace-by-id may turn a timed modifier permanent; the old
            // sweep entry must not evict the replacement later.
            self.sweeper.deregister(entity, &modifier_id);
        }
    }

    /// Remove a modifier from an entity and drop its sweep entry if any.
    pub fn remove_modifier(&mut self, entity: &str, modifier_id: &str) -> bool {
        self.sweeper.deregister(entity, modifier_id);
        match self.collections.get_mut(entity) {
            Some(collection) => collection.remove_modifier(modifier_id),
            None => false,
        }
    }

    /// Advance the session clock and evict expired temporary modifiers.
    /// Returns the number of modifiers removed this tick.
    pub fn tick(&mut self, delta: f64) -> usize {
        let mut removed = 0;
        for entry in self.sweeper.poll(delta) {
            if let Some(collection) = self.collections.get_mut(&entry.entity) {
                if collection.remove_modifier(&entry.modifier_id) {
                    removed += 1;
                    debug!(
                        entity = %entry.entity,
                        stat = %entry.stat_id,
                        modifier = %entry.modifier_id,
                        "expired temporary modifier"
                    );
                }
            }
        }
        removed
    }
}
