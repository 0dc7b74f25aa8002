//! Taxonomy ordering configuration.
//!
//! # Responsibility
//! - Hold the per-taxonomy `ordering_enabled` flags supplied by whichever
//!   component registers taxonomies.
//! - Load that mapping from JSON or build it in code.
//!
//! # Invariants
//! - Lookups are read-only; services receive the config at construction.
//! - Unknown or blank taxonomy names are never position-enabled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Registration metadata for one taxonomy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySettings {
    /// Whether listings of this taxonomy sort by stored position.
    #[serde(default)]
    pub ordering_enabled: bool,
}

/// Ordering configuration for every registered taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Reject reorder submissions naming terms outside the target taxonomy.
    #[serde(default)]
    pub strict_membership: bool,
    #[serde(default)]
    taxonomies: BTreeMap<String, TaxonomySettings>,
}

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// A taxonomy key is blank after trim.
    BlankTaxonomyName,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read ordering config: {err}"),
            Self::Parse(err) => write!(f, "invalid ordering config: {err}"),
            Self::BlankTaxonomyName => write!(f, "taxonomy name must not be blank"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::BlankTaxonomyName => None,
        }
    }
}

impl OrderingConfig {
    /// Creates an empty configuration: no taxonomy is position-enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with the given ordering flag, replacing any
    /// previous registration.
    pub fn with_taxonomy(mut self, name: impl Into<String>, ordering_enabled: bool) -> Self {
        self.register(name, ordering_enabled);
        self
    }

    /// Toggles strict membership validation for reorder submissions.
    pub fn with_strict_membership(mut self, strict: bool) -> Self {
        self.strict_membership = strict;
        self
    }

    /// Registers one taxonomy in place. Names are trimmed.
    pub fn register(&mut self, name: impl Into<String>, ordering_enabled: bool) {
        let name = name.into();
        self.taxonomies.insert(
            name.trim().to_string(),
            TaxonomySettings { ordering_enabled },
        );
    }

    /// Parses configuration from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        parsed.normalized()
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    /// Looks up registration metadata by taxonomy name.
    pub fn settings(&self, taxonomy: &str) -> Option<&TaxonomySettings> {
        let name = taxonomy.trim();
        if name.is_empty() {
            return None;
        }
        self.taxonomies.get(name)
    }

    /// Returns whether the taxonomy has been registered at all.
    pub fn is_registered(&self, taxonomy: &str) -> bool {
        self.settings(taxonomy).is_some()
    }

    /// Returns whether listings of `taxonomy` sort by stored position.
    pub fn is_position_enabled(&self, taxonomy: &str) -> bool {
        self.settings(taxonomy)
            .is_some_and(|settings| settings.ordering_enabled)
    }

    /// Iterates registered taxonomy names in lexical order.
    pub fn taxonomy_names(&self) -> impl Iterator<Item = &str> {
        self.taxonomies.keys().map(String::as_str)
    }

    fn normalized(self) -> Result<Self, ConfigError> {
        let mut taxonomies = BTreeMap::new();
        for (name, settings) in self.taxonomies {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::BlankTaxonomyName);
            }
            taxonomies.insert(trimmed.to_string(), settings);
        }
        Ok(Self {
            strict_membership: self.strict_membership,
            taxonomies,
        })
    }
}
