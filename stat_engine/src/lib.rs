//! stat_engine - Stat modifier resolution engine for game entities
//!
//! This library provides:
//! - StatRegistry: session-wide catalog of stat definitions, aliases, and
//!   conditional extensions
//! - StatCollection: per-entity stat values with lazy materialization and
//!   change notifications
//! - StatModifier: additive / percent / multiplicative / override
//!   contributions, optionally category-gated and time-limited
//! - TimedModifierSweeper + StatSession: fixed-interval expiry of
//!   temporary modifiers across all entities

pub mod category;
pub mod collection;
pub mod config;
pub mod modifier;
pub mod prelude;
pub mod registry;
pub mod report;
pub mod session;
pub mod stat_value;
pub mod sweeper;

// Re-export core types for convenience
pub use category::CategorySet;
pub use collection::{StatCollection, StatEvent};
pub use config::{load_registry, parse_registry, ConfigError};
pub use modifier::{ModifierKind, StatModifier};
pub use registry::{
    derived_extension_id, ConditionalExtension, RegistryError, StatDefinition, StatRegistry,
};
pub use report::collection_report;
pub use session::StatSession;
pub use stat_value::{StatValue, VALUE_EPSILON};
pub use sweeper::{SweepEntry, TimedModifierSweeper, DEFAULT_POLL_INTERVAL};
