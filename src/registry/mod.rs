//! Processing-unit factories and their declared pad templates

pub mod catalog;

pub use catalog::{Catalog, CatalogFilter};

use crate::core::Caps;
use crate::error::{AutoplugError, AutoplugResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Registry compiled into the binary
const BUILTIN_REGISTRY: &str = include_str!("../../data/registry.toml");

/// Selection priority of a factory; higher wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RankRepr", into = "u32")]
pub struct Rank(pub u32);

impl Rank {
    /// Never selected automatically
    pub const NONE: Rank = Rank(0);
    /// Lowest rank still usable for automatic selection
    pub const MARGINAL: Rank = Rank(64);
    /// Fallback choice
    pub const SECONDARY: Rank = Rank(128);
    /// Preferred choice
    pub const PRIMARY: Rank = Rank(256);

    /// Parse `primary`, `marginal+1`, `200`, ...
    pub fn parse(text: &str) -> AutoplugResult<Self> {
        let text = text.trim();
        let (base, offset) = match text.find(['+', '-']) {
            Some(idx) if idx > 0 => (&text[..idx], Some(&text[idx..])),
            _ => (text, None),
        };

        let base = match base.to_ascii_lowercase().as_str() {
            "none" => Rank::NONE,
            "marginal" => Rank::MARGINAL,
            "secondary" => Rank::SECONDARY,
            "primary" => Rank::PRIMARY,
            other => {
                let value = other
                    .parse::<u32>()
                    .map_err(|_| AutoplugError::Registry(format!("invalid rank '{}'", text)))?;
                return match offset {
                    None => Ok(Rank(value)),
                    Some(_) => Err(AutoplugError::Registry(format!("invalid rank '{}'", text))),
                };
            }
        };

        let Some(offset) = offset else {
            return Ok(base);
        };
        let delta: i64 = offset
            .trim_start_matches('+')
            .parse()
            .map_err(|_| AutoplugError::Registry(format!("invalid rank offset in '{}'", text)))?;
        u32::try_from(i64::from(base.0) + delta)
            .map(Rank)
            .map_err(|_| AutoplugError::Registry(format!("rank '{}' is out of range", text)))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Rank::NONE => write!(f, "none"),
            Rank::MARGINAL => write!(f, "marginal"),
            Rank::SECONDARY => write!(f, "secondary"),
            Rank::PRIMARY => write!(f, "primary"),
            Rank(n) => write!(f, "{}", n),
        }
    }
}

impl From<Rank> for u32 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RankRepr {
    Value(u32),
    Named(String),
}

impl TryFrom<RankRepr> for Rank {
    type Error = AutoplugError;

    fn try_from(repr: RankRepr) -> Result<Self, Self::Error> {
        match repr {
            RankRepr::Value(v) => Ok(Rank(v)),
            RankRepr::Named(name) => Rank::parse(&name),
        }
    }
}

/// Coarse role of a unit, the only ones considered for autoplugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitClass {
    /// Splits a container into elementary streams
    Demuxer,
    /// Turns a compressed stream into raw data
    Decoder,
    /// Frames or normalizes an elementary stream
    Parser,
}

impl UnitClass {
    /// All autoplug candidate classes
    pub const ALL: [UnitClass; 3] = [UnitClass::Demuxer, UnitClass::Decoder, UnitClass::Parser];

    /// Derive the class from a slash-separated classification such as
    /// `Codec/Decoder/Audio`.
    pub fn from_klass(klass: &str) -> Option<Self> {
        if klass.contains("Demux") {
            Some(UnitClass::Demuxer)
        } else if klass.contains("Decoder") {
            Some(UnitClass::Decoder)
        } else if klass.contains("Parse") {
            Some(UnitClass::Parser)
        } else {
            None
        }
    }
}

/// Which way data flows through a pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadDirection {
    /// Input
    Sink,
    /// Output
    Src,
}

/// When a pad exists on an instantiated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadPresence {
    /// Exists as soon as the unit is created
    Always,
    /// Announced later, once the unit knows its streams
    Sometimes,
    /// Created only on explicit request
    Request,
}

/// Declared pad of a factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadTemplate {
    /// Pad name, or a pattern like `src_%u` for dynamic pads
    #[serde(rename = "name")]
    pub name_template: String,
    /// Data direction
    pub direction: PadDirection,
    /// Presence mode
    pub presence: PadPresence,
    /// Accepted or produced data types
    pub caps: Caps,
}

impl PadTemplate {
    /// Create a template
    pub fn new(
        name_template: impl Into<String>,
        direction: PadDirection,
        presence: PadPresence,
        caps: Caps,
    ) -> Self {
        PadTemplate {
            name_template: name_template.into(),
            direction,
            presence,
            caps,
        }
    }

    /// Whether a concrete pad name can come from this template
    pub fn matches_name(&self, name: &str) -> bool {
        match self.name_template.split_once('%') {
            Some((prefix, _)) => name.len() > prefix.len() && name.starts_with(prefix),
            None => self.name_template == name,
        }
    }

    /// Concrete pad name for the `index`-th pad created from this template
    pub fn expand_name(&self, index: u32) -> String {
        let Some((prefix, spec)) = self.name_template.split_once('%') else {
            return self.name_template.clone();
        };
        let conv_end = spec
            .find(|c: char| c.is_ascii_alphabetic())
            .map(|i| i + 1)
            .unwrap_or(spec.len());
        let (conv, suffix) = spec.split_at(conv_end);
        let width: usize = conv
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap_or(0);
        let number = if conv.ends_with('x') {
            format!("{:0width$x}", index, width = width)
        } else {
            format!("{:0width$}", index, width = width)
        };
        format!("{}{}{}", prefix, number, suffix)
    }
}

/// Descriptor of an installable processing unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFactory {
    /// Unique factory name
    pub name: String,
    /// Slash-separated classification, e.g. `Codec/Demuxer`
    pub klass: String,
    /// Selection priority
    pub rank: Rank,
    /// Declared pads in declaration order
    #[serde(default)]
    pub pads: Vec<PadTemplate>,
}

impl ElementFactory {
    /// Create a factory without pads
    pub fn new(name: impl Into<String>, klass: impl Into<String>, rank: Rank) -> Self {
        ElementFactory {
            name: name.into(),
            klass: klass.into(),
            rank,
            pads: Vec::new(),
        }
    }

    /// Add a pad template
    pub fn with_pad(mut self, template: PadTemplate) -> Self {
        self.pads.push(template);
        self
    }

    /// Role derived from the classification
    pub fn class(&self) -> Option<UnitClass> {
        UnitClass::from_klass(&self.klass)
    }

    /// First input template that is guaranteed to exist
    pub fn first_always_sink(&self) -> Option<&PadTemplate> {
        self.pads
            .iter()
            .find(|t| t.direction == PadDirection::Sink && t.presence == PadPresence::Always)
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "factory")]
    factories: Vec<ElementFactory>,
}

/// All installed factories, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    factories: Vec<ElementFactory>,
}

impl Registry {
    /// Build a registry from factories, rejecting duplicate or empty names
    pub fn new(factories: Vec<ElementFactory>) -> AutoplugResult<Self> {
        let mut seen = HashSet::new();
        for factory in &factories {
            if factory.name.trim().is_empty() {
                return Err(AutoplugError::Registry("factory with empty name".to_string()));
            }
            if !seen.insert(factory.name.as_str()) {
                return Err(AutoplugError::Registry(format!(
                    "duplicate factory '{}'",
                    factory.name
                )));
            }
        }
        Ok(Registry { factories })
    }

    /// The registry shipped with the crate
    pub fn builtin() -> AutoplugResult<Self> {
        Self::from_toml_str(BUILTIN_REGISTRY)
    }

    /// Parse a registry document
    pub fn from_toml_str(text: &str) -> AutoplugResult<Self> {
        let file: RegistryFile = toml::from_str(text)?;
        Self::new(file.factories)
    }

    /// Load a registry document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> AutoplugResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let registry = Self::from_toml_str(&text)?;
        log::debug!(
            "Loaded {} factories from {}",
            registry.factories.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Factories in discovery order
    pub fn factories(&self) -> &[ElementFactory] {
        &self.factories
    }

    /// Look up a factory by name
    pub fn find(&self, name: &str) -> Option<&ElementFactory> {
        self.factories.iter().find(|f| f.name == name)
    }

    /// Number of factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
