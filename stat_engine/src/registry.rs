//! StatRegistry - session-wide catalog of stat definitions

use crate::category::CategorySet;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

/// Registration-time error. Nothing here is fatal to a running session;
/// these only surface while the registry is being built.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("stat `{id}`: min {min} is greater than max {max}")]
    MalformedRange { id: String, min: f64, max: f64 },
    #[error("conditional extension on `{0}` requires a non-empty category mask")]
    EmptyExtensionMask(String),
    #[error("conditional extension target `{0}` is not registered")]
    UnknownExtensionBase(String),
}

/// Immutable metadata for one stat.
///
/// Definitions are shared read-only across every stat value that references
/// them (`Rc<StatDefinition>`); a registry is frozen into an `Rc` before any
/// collection is built, so post-startup mutation is ruled out by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct StatDefinition {
    /// Canonical id, lowercased. Identity for all lookups.
    pub id: String,
    pub display_name: String,
    pub description: String,
    /// Base value a freshly materialized stat starts with.
    pub default_value: f64,
    /// Round the effective value to the nearest integer.
    pub is_integer: bool,
    pub min: f64,
    pub max: f64,
    /// Static grouping categories. Distinct from the *dynamic* active set
    /// carried by each stat value instance.
    pub categories: CategorySet,
    /// Display template; `{value}` is replaced by the formatted number.
    pub format_template: String,
}

impl StatDefinition {
    /// Create a definition. Rejects a malformed range (`min > max`) rather
    /// than swapping, so a bad registration can never reach recomputation.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: f64,
        min: f64,
        max: f64,
        categories: CategorySet,
    ) -> Result<Self, RegistryError> {
        let id = id.into().to_ascii_lowercase();
        if min > max {
            return Err(RegistryError::MalformedRange { id, min, max });
        }
        Ok(StatDefinition {
            id,
            display_name: display_name.into(),
            description: String::new(),
            default_value,
            is_integer: false,
            min,
            max,
            categories,
            format_template: "{value}".to_string(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the stat as integer-valued; effective values are rounded.
    pub fn as_integer(mut self) -> Self {
        self.is_integer = true;
        self
    }

    pub fn with_format(mut self, template: impl Into<String>) -> Self {
        self.format_template = template.into();
        self
    }

    /// Synthesized definition for an id nobody registered: unbounded range,
    /// zero default, no categories. Lets writes to unknown ids proceed
    /// instead of failing.
    pub(crate) fn fallback(id: &str) -> Self {
        StatDefinition {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            default_value: 0.0,
            is_integer: false,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            categories: CategorySet::empty(),
            format_template: "{value}".to_string(),
        }
    }

    /// Clamp a raw computed value into this definition's range, rounding if
    /// the stat is integer-valued.
    pub fn clamp(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.is_integer {
            clamped.round()
        } else {
            clamped
        }
    }

    /// Render a value through the display template.
    pub fn format_value(&self, value: f64) -> String {
        let rendered = if self.is_integer {
            format!("{}", value.round() as i64)
        } else {
            format!("{:.2}", value)
        };
        self.format_template.replace("{value}", &rendered)
    }
}

/// A registered "base stat, but only when these categories are active"
/// target. The derived id is valid only as a modifier target; no stat value
/// is ever materialized under it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExtension {
    pub base_id: String,
    pub required_categories: CategorySet,
    pub display_suffix: String,
    pub derived_id: String,
}

/// Deterministic synthetic id for a conditional extension, e.g.
/// `crit_chance@fire+spell`.
pub fn derived_extension_id(base_id: &str, categories: CategorySet) -> String {
    format!(
        "{}@{}",
        base_id.to_ascii_lowercase(),
        categories.names().join("+")
    )
}

/// Session-wide catalog of stat definitions, aliases, and conditional
/// extensions.
///
/// Built mutably at startup, then frozen into an `Rc<StatRegistry>` and
/// handed to collections. Lookups on unknown ids return `None` with a debug
/// log - never an error.
#[derive(Debug, Default)]
pub struct StatRegistry {
    definitions: HashMap<String, Rc<StatDefinition>>,
    /// alias (lowercased) -> canonical id. Single hop only; chains are
    /// flattened at registration.
    aliases: HashMap<String, String>,
    /// derived id -> extension.
    extensions: HashMap<String, ConditionalExtension>,
}

impl StatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a definition (idempotent upsert). Stat values
    /// that already captured the old `Rc` keep it, which the immutability
    /// contract permits.
    pub fn register(&mut self, definition: StatDefinition) {
        self.definitions
            .insert(definition.id.clone(), Rc::new(definition));
    }

    /// Convenience wrapper building the definition inline.
    pub fn register_stat(
        &mut self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: f64,
        min: f64,
        max: f64,
        categories: CategorySet,
    ) -> Result<(), RegistryError> {
        let definition = StatDefinition::new(id, display_name, default_value, min, max, categories)?;
        self.register(definition);
        Ok(())
    }

    /// Register an alias for a canonical id.
    ///
    /// An unknown target is allowed (stats may be registered after their
    /// aliases for load-order independence) but logged, since it usually
    /// means a typo. If the target is itself an alias, it is flattened to
    /// its canonical id here so no alias chain can ever form.
    pub fn register_alias(&mut self, alias: impl Into<String>, canonical_id: impl Into<String>) {
        let alias = alias.into().to_ascii_lowercase();
        let mut canonical = canonical_id.into().to_ascii_lowercase();
        if let Some(target) = self.aliases.get(&canonical) {
            canonical = target.clone();
        }
        if !self.definitions.contains_key(&canonical) {
            warn!(alias = %alias, target = %canonical, "alias registered for unknown stat");
        }
        // Earlier aliases may point at the id that just became an alias
        // itself; rewrite them so every entry stays a single hop.
        for target in self.aliases.values_mut() {
            if *target == alias {
                *target = canonical.clone();
            }
        }
        self.aliases.insert(alias, canonical);
    }

    /// Register a conditional extension on a base stat, returning the
    /// deterministic derived id to use as a modifier target.
    pub fn register_extension(
        &mut self,
        base_id: &str,
        required_categories: CategorySet,
        display_suffix: impl Into<String>,
    ) -> Result<String, RegistryError> {
        let base = self.normalize_id(base_id);
        if required_categories.is_empty() {
            return Err(RegistryError::EmptyExtensionMask(base));
        }
        if !self.definitions.contains_key(&base) {
            return Err(RegistryError::UnknownExtensionBase(base));
        }
        let derived_id = derived_extension_id(&base, required_categories);
        self.extensions.insert(
            derived_id.clone(),
            ConditionalExtension {
                base_id: base,
                required_categories,
                display_suffix: display_suffix.into(),
                derived_id: derived_id.clone(),
            },
        );
        Ok(derived_id)
    }

    /// Resolve an id to its canonical form: lowercase, then a single alias
    /// hop if one is registered.
    pub fn normalize_id(&self, id: &str) -> String {
        let lowered = id.to_ascii_lowercase();
        match self.aliases.get(&lowered) {
            Some(canonical) => canonical.clone(),
            None => lowered,
        }
    }

    /// Look up a definition by id or alias. Unknown ids are not an error.
    pub fn definition(&self, id: &str) -> Option<Rc<StatDefinition>> {
        let canonical = self.normalize_id(id);
        let found = self.definitions.get(&canonical).cloned();
        if found.is_none() {
            debug!(id, %canonical, "lookup of unregistered stat");
        }
        found
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.definitions.contains_key(&self.normalize_id(id))
    }

    /// Look up a conditional extension by its derived id.
    pub fn extension(&self, derived_id: &str) -> Option<&ConditionalExtension> {
        self.extensions.get(&derived_id.to_ascii_lowercase())
    }

    /// All extensions registered on a base stat.
    pub fn extensions_of<'a>(
        &'a self,
        base_id: &str,
    ) -> impl Iterator<Item = &'a ConditionalExtension> {
        let base = self.normalize_id(base_id);
        self.extensions
            .values()
            .filter(move |ext| ext.base_id == base)
    }

    /// Resolve a modifier target to `(canonical base id, extra required
    /// categories)`. Extension targets fold their category mask into the
    /// modifier; plain ids resolve with an empty extra mask.
    pub fn resolve_target(&self, id: &str) -> (String, CategorySet) {
        let lowered = id.to_ascii_lowercase();
        if let Some(ext) = self.extensions.get(&lowered) {
            return (ext.base_id.clone(), ext.required_categories);
        }
        (self.normalize_id(id), CategorySet::empty())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Rc<StatDefinition>> {
        self.definitions.values()
    }

    /// Registry preloaded with a small core stat set. Games are expected to
    /// replace or extend this via [`crate::config`] or their own
    /// registration calls.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Errors are impossible here: every range below is well-formed.
        let defs = [
            StatDefinition::new("health", "Health", 100.0, 0.0, 100_000.0, CategorySet::VITAL | CategorySet::DEFENSE),
            StatDefinition::new("mana", "Mana", 50.0, 0.0, 100_000.0, CategorySet::VITAL | CategorySet::RESOURCE),
            StatDefinition::new("armour", "Armour", 0.0, 0.0, 100_000.0, CategorySet::DEFENSE),
            StatDefinition::new("evasion", "Evasion", 0.0, 0.0, 100_000.0, CategorySet::DEFENSE),
            StatDefinition::new("fire_resistance", "Fire Resistance", 0.0, -100.0, 90.0, CategorySet::DEFENSE | CategorySet::RESISTANCE | CategorySet::FIRE),
            StatDefinition::new("cold_resistance", "Cold Resistance", 0.0, -100.0, 90.0, CategorySet::DEFENSE | CategorySet::RESISTANCE | CategorySet::COLD),
            StatDefinition::new("lightning_resistance", "Lightning Resistance", 0.0, -100.0, 90.0, CategorySet::DEFENSE | CategorySet::RESISTANCE | CategorySet::LIGHTNING),
            StatDefinition::new("damage", "Damage", 0.0, 0.0, 1_000_000.0, CategorySet::OFFENSE),
            StatDefinition::new("attack_speed", "Attack Speed", 1.0, 0.1, 10.0, CategorySet::OFFENSE | CategorySet::SPEED),
            StatDefinition::new("cast_speed", "Cast Speed", 1.0, 0.1, 10.0, CategorySet::OFFENSE | CategorySet::SPEED | CategorySet::SPELL),
            StatDefinition::new("crit_chance", "Critical Chance", 5.0, 0.0, 100.0, CategorySet::OFFENSE | CategorySet::CRITICAL),
            StatDefinition::new("crit_multiplier", "Critical Multiplier", 150.0, 100.0, 1000.0, CategorySet::OFFENSE | CategorySet::CRITICAL),
            StatDefinition::new("movement_speed", "Movement Speed", 100.0, 10.0, 400.0, CategorySet::UTILITY | CategorySet::MOVEMENT | CategorySet::SPEED),
            StatDefinition::new("cooldown_reduction", "Cooldown Reduction", 0.0, 0.0, 80.0, CategorySet::UTILITY),
        ];
        // Every range above is well-formed, so no entry is ever skipped.
        for def in defs.into_iter().flatten() {
            registry.register(def);
        }
        if let Ok(d) = StatDefinition::new("level", "Level", 1.0, 1.0, 100.0, CategorySet::UTILITY) {
            registry.register(d.as_integer());
        }

        registry.register_alias("hp", "health");
        registry.register_alias("life", "health");
        registry.register_alias("mp", "mana");
        registry.register_alias("armor", "armour");
        registry.register_alias("crit", "crit_chance");

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_range_rejected() {
        let err = StatDefinition::new("oops", "Oops", 0.0, 10.0, 5.0, CategorySet::empty());
        assert!(matches!(
            err,
            Err(RegistryError::MalformedRange { min, max, .. }) if min == 10.0 && max == 5.0
        ));
    }

    #[test]
    fn test_register_is_upsert() {
        let mut registry = StatRegistry::new();
        registry
            .register_stat("health", "Health", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        let first = registry.definition("health").unwrap();
        registry
            .register_stat("health", "Hit Points", 120.0, 0.0, 2000.0, CategorySet::VITAL)
            .unwrap();
        let second = registry.definition("health").unwrap();
        assert_eq!(second.display_name, "Hit Points");
        // The earlier Rc capture still sees the original definition.
        assert_eq!(first.display_name, "Health");
    }

    #[test]
    fn test_id_lookup_is_case_insensitive() {
        let mut registry = StatRegistry::new();
        registry
            .register_stat("Health", "Health", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        assert!(registry.is_registered("HEALTH"));
        assert!(registry.definition("heAlth").is_some());
    }

    #[test]
    fn test_alias_resolution() {
        let mut registry = StatRegistry::new();
        registry
            .register_stat("health", "Health", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        registry.register_alias("hp", "health");
        assert_eq!(registry.normalize_id("HP"), "health");
        assert_eq!(registry.definition("hp").unwrap().id, "health");
    }

    #[test]
    fn test_alias_before_target_resolves_at_lookup_time() {
        let mut registry = StatRegistry::new();
        registry.register_alias("hp", "health");
        assert!(registry.definition("hp").is_none());
        registry
            .register_stat("health", "Health", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        assert_eq!(registry.definition("hp").unwrap().id, "health");
    }

    #[test]
    fn test_alias_chains_are_flattened() {
        let mut registry = StatRegistry::new();
        registry
            .register_stat("health", "Health", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        registry.register_alias("hp", "health");
        // "life" points at the alias "hp"; it must land on "health" directly.
        registry.register_alias("life", "hp");
        assert_eq!(registry.normalize_id("life"), "health");
    }

    #[test]
    fn test_aliased_id_becoming_an_alias_rewrites_earlier_entries() {
        let mut registry = StatRegistry::new();
        // "hp" -> "health" is registered first; "health" then turns out to
        // be an alias of "hit_points" itself.
        registry.register_alias("hp", "health");
        registry.register_alias("health", "hit_points");
        registry
            .register_stat("hit_points", "Hit Points", 100.0, 0.0, 1000.0, CategorySet::VITAL)
            .unwrap();
        assert_eq!(registry.normalize_id("hp"), "hit_points");
        assert_eq!(registry.normalize_id("health"), "hit_points");
        assert!(registry.definition("hp").is_some());
    }

    #[test]
    fn test_unregistered_lookup_returns_none() {
        let registry = StatRegistry::new();
        assert!(registry.definition("nonexistent").is_none());
        assert!(!registry.is_registered("nonexistent"));
    }

    #[test]
    fn test_extension_derived_id_is_deterministic() {
        let mut registry = StatRegistry::with_defaults();
        let id_a = registry
            .register_extension("crit_chance", CategorySet::FIRE | CategorySet::SPELL, "with Fire spells")
            .unwrap();
        let id_b = derived_extension_id("crit_chance", CategorySet::SPELL | CategorySet::FIRE);
        assert_eq!(id_a, id_b);
        // Declaration order of the flags, not argument order.
        assert_eq!(id_a, "crit_chance@spell+fire");
    }

    #[test]
    fn test_extension_requires_nonempty_mask() {
        let mut registry = StatRegistry::with_defaults();
        let err = registry.register_extension("crit_chance", CategorySet::empty(), "");
        assert!(matches!(err, Err(RegistryError::EmptyExtensionMask(_))));
    }

    #[test]
    fn test_extension_requires_registered_base() {
        let mut registry = StatRegistry::new();
        let err = registry.register_extension("ghost", CategorySet::FIRE, "");
        assert!(matches!(err, Err(RegistryError::UnknownExtensionBase(_))));
    }

    #[test]
    fn test_resolve_target_folds_extension_mask() {
        let mut registry = StatRegistry::with_defaults();
        let derived = registry
            .register_extension("crit_chance", CategorySet::FIRE, "with Fire skills")
            .unwrap();
        let (base, extra) = registry.resolve_target(&derived);
        assert_eq!(base, "crit_chance");
        assert_eq!(extra, CategorySet::FIRE);

        let (base, extra) = registry.resolve_target("crit");
        assert_eq!(base, "crit_chance");
        assert!(extra.is_empty());
    }

    #[test]
    fn test_extensions_of_base() {
        let mut registry = StatRegistry::with_defaults();
        registry
            .register_extension("damage", CategorySet::FIRE, "with Fire skills")
            .unwrap();
        registry
            .register_extension("damage", CategorySet::PROJECTILE, "with Projectiles")
            .unwrap();
        assert_eq!(registry.extensions_of("damage").count(), 2);
        assert_eq!(registry.extensions_of("health").count(), 0);
    }

    #[test]
    fn test_clamp_and_integer_rounding() {
        let def = StatDefinition::new("level", "Level", 1.0, 1.0, 100.0, CategorySet::empty())
            .unwrap()
            .as_integer();
        assert!((def.clamp(41.6) - 42.0).abs() < f64::EPSILON);
        assert!((def.clamp(-5.0) - 1.0).abs() < f64::EPSILON);
        assert!((def.clamp(250.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_value() {
        let def = StatDefinition::new("crit", "Crit", 5.0, 0.0, 100.0, CategorySet::empty())
            .unwrap()
            .with_format("{value}%");
        assert_eq!(def.format_value(12.5), "12.50%");
    }

    #[test]
    fn test_with_defaults_has_aliases() {
        let registry = StatRegistry::with_defaults();
        assert!(registry.is_registered("hp"));
        assert_eq!(registry.normalize_id("armor"), "armour");
        assert!(registry.len() >= 15);
    }
}
