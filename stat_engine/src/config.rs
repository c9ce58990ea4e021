//! Registry loading from TOML files
//!
//! Registration calls are the entire schema; this loader is a convenience
//! for data-driven games, not a compatibility surface. The same tuples can
//! equally be registered from code.

use crate::category::CategorySet;
use crate::registry::{RegistryError, StatDefinition, StatRegistry};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Registry loading error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid registry entry: {0}")]
    Registry(#[from] RegistryError),
    #[error("registry validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    stats: Vec<StatEntry>,
}

#[derive(Debug, Deserialize)]
struct StatEntry {
    id: String,
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    default: f64,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(default)]
    integer: bool,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
    format: Option<String>,
    #[serde(default)]
    extensions: Vec<ExtensionEntry>,
}

#[derive(Debug, Deserialize)]
struct ExtensionEntry {
    categories: Vec<String>,
    #[serde(default)]
    suffix: String,
}

/// Load a registry from a TOML file.
pub fn load_registry(path: &Path) -> Result<StatRegistry, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_registry(&content)
}

/// Build a registry from TOML text.
pub fn parse_registry(content: &str) -> Result<StatRegistry, ConfigError> {
    let file: RegistryFile = toml::from_str(content)?;
    let mut registry = StatRegistry::new();

    for entry in file.stats {
        let categories = parse_categories(&entry.id, &entry.categories)?;
        let display_name = entry.display_name.unwrap_or_else(|| entry.id.clone());
        let mut definition = StatDefinition::new(
            entry.id.clone(),
            display_name,
            entry.default,
            entry.min.unwrap_or(f64::NEG_INFINITY),
            entry.max.unwrap_or(f64::INFINITY),
            categories,
        )?
        .with_description(entry.description);
        if entry.integer {
            definition = definition.as_integer();
        }
        if let Some(format) = entry.format {
            definition = definition.with_format(format);
        }
        registry.register(definition);

        for alias in entry.aliases {
            registry.register_alias(alias, entry.id.clone());
        }
        for ext in entry.extensions {
            let mask = parse_categories(&entry.id, &ext.categories)?;
            registry.register_extension(&entry.id, mask, ext.suffix)?;
        }
    }

    Ok(registry)
}

fn parse_categories(stat_id: &str, names: &[String]) -> Result<CategorySet, ConfigError> {
    let mut set = CategorySet::empty();
    for name in names {
        match CategorySet::parse_name(name) {
            Some(flag) => set |= flag,
            None => {
                return Err(ConfigError::Validation(format!(
                    "stat `{}` references unknown category `{}`",
                    stat_id, name
                )))
            }
        }
    }
    Ok(set)
}
