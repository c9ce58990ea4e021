//! Prelude module for convenient imports
//!
//! ```rust
//! use stat_engine::prelude::*;
//! ```

// Core types
pub use crate::category::CategorySet;
pub use crate::modifier::{ModifierKind, StatModifier};
pub use crate::registry::{StatDefinition, StatRegistry};

// Per-entity surface
pub use crate::collection::{StatCollection, StatEvent};
pub use crate::stat_value::StatValue;

// Session root and expiry
pub use crate::session::StatSession;
pub use crate::sweeper::TimedModifierSweeper;

// Diagnostics
pub use crate::report::collection_report;
