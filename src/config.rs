//! Session configuration loaded from TOML

use crate::autoplug::{Autoplugger, PathPolicy};
use crate::core::Caps;
use crate::error::{AutoplugError, AutoplugResult};
use crate::registry::{CatalogFilter, Rank, Registry, UnitClass};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one autoplugging session.
///
/// Every field is optional in the file:
///
/// ```toml
/// min_rank = "secondary"
/// classes = ["demuxer", "decoder"]
/// sink_name = "alsasink"
/// sink_caps = "audio/x-raw, format=(string)S16LE"
/// max_depth = 8
/// policy = "single-audio-path"
/// registry = "/usr/share/autoplug/registry.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoplugConfig {
    /// Lowest rank a unit needs to be selected automatically
    pub min_rank: Rank,
    /// Unit classes eligible for automatic selection
    pub classes: Vec<UnitClass>,
    /// Instance name of the terminal sink
    pub sink_name: String,
    /// Type the terminal sink accepts
    pub sink_caps: Caps,
    /// Bound on the chain of units behind one pad
    pub max_depth: usize,
    /// How many audio paths may reach the sink
    pub policy: PathPolicy,
    /// Registry file replacing the built-in registry
    pub registry: Option<PathBuf>,
}

impl Default for AutoplugConfig {
    fn default() -> Self {
        AutoplugConfig {
            min_rank: Rank::MARGINAL,
            classes: UnitClass::ALL.to_vec(),
            sink_name: "audiosink".to_string(),
            sink_caps: Caps::new_simple("audio/x-raw"),
            max_depth: Autoplugger::DEFAULT_MAX_DEPTH,
            policy: PathPolicy::default(),
            registry: None,
        }
    }
}

impl AutoplugConfig {
    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AutoplugResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loading config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Parse from a TOML document
    pub fn from_toml_str(contents: &str) -> AutoplugResult<Self> {
        let config: AutoplugConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AutoplugResult<()> {
        if self.sink_name.trim().is_empty() {
            return Err(AutoplugError::Config("sink_name must not be empty".to_string()));
        }
        if self.sink_caps.is_empty() {
            return Err(AutoplugError::Config("sink_caps must accept something".to_string()));
        }
        Ok(())
    }

    /// The registry file named by `registry`, or the built-in registry
    pub fn load_registry(&self) -> AutoplugResult<Registry> {
        match &self.registry {
            Some(path) => Registry::from_file(path),
            None => Registry::builtin(),
        }
    }

    /// Catalog filter derived from `min_rank` and `classes`
    pub fn catalog_filter(&self) -> CatalogFilter {
        CatalogFilter {
            min_rank: self.min_rank,
            classes: self.classes.clone(),
        }
    }
}
