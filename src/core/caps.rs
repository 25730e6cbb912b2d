use crate::core::value::Value;
use crate::error::{AutoplugError, AutoplugResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse media kind, taken from the top-level part of a media type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `audio/*`
    Audio,
    /// `video/*`
    Video,
    /// `application/*` (containers, tag wrappers)
    Application,
    /// Any other top-level type (`image/*`, `text/*`, ...)
    Other,
    /// No fixed media type (`ANY` or `EMPTY`)
    Unknown,
}

impl MediaKind {
    /// Classify a media type name such as `audio/mpeg`
    pub fn from_media_type(name: &str) -> Self {
        match name.split('/').next().unwrap_or_default() {
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            "application" => MediaKind::Application,
            "" => MediaKind::Unknown,
            _ => MediaKind::Other,
        }
    }
}

/// One media type with its named properties
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Structure {
    /// Create a structure without fields
    pub fn new(name: impl Into<String>) -> Self {
        Structure {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Set a field, replacing an existing one of the same name
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set(key, value);
        self
    }

    /// Set a field in place
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Media type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Intersect two structures.
    ///
    /// Names must match and every shared field must intersect; a field known
    /// to only one side is carried over unchanged.
    pub fn intersect(&self, other: &Structure) -> Option<Structure> {
        if self.name != other.name {
            return None;
        }

        let mut out = Structure::new(self.name.clone());
        for (key, value) in &self.fields {
            let merged = match other.get(key) {
                Some(theirs) => value.intersect(theirs)?,
                None => value.clone(),
            };
            out.fields.push((key.clone(), merged));
        }
        for (key, value) in &other.fields {
            if self.get(key).is_none() {
                out.fields.push((key.clone(), value.clone()));
            }
        }
        Some(out)
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.fields {
            write!(f, ", {}=({}){}", key, value.type_name(), value)?;
        }
        Ok(())
    }
}

/// Description of the data flowing through a pad.
///
/// Either `ANY` or a list of alternative structures; an empty list is `EMPTY`
/// and is compatible with nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Caps {
    any: bool,
    structures: Vec<Structure>,
}

impl Caps {
    /// Caps compatible with every stream
    pub fn new_any() -> Self {
        Caps {
            any: true,
            structures: Vec::new(),
        }
    }

    /// Caps compatible with nothing
    pub fn new_empty() -> Self {
        Caps {
            any: false,
            structures: Vec::new(),
        }
    }

    /// Caps holding a single media type without fields
    pub fn new_simple(name: impl Into<String>) -> Self {
        Caps::from_structures(vec![Structure::new(name)])
    }

    /// Caps from a list of alternatives
    pub fn from_structures(structures: Vec<Structure>) -> Self {
        Caps {
            any: false,
            structures,
        }
    }

    /// Parse the textual caps form, e.g. `audio/mpeg, mpegversion=(int)1`
    pub fn parse(input: &str) -> AutoplugResult<Self> {
        crate::core::parse::parse_caps(input)
    }

    /// Whether these are `ANY` caps
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// Whether these caps accept nothing
    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    /// Alternatives in preference order
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Media type name of the first structure
    pub fn media_type(&self) -> Option<&str> {
        self.structures.first().map(Structure::name)
    }

    /// Coarse kind of the first structure
    pub fn kind(&self) -> MediaKind {
        self.media_type()
            .map(MediaKind::from_media_type)
            .unwrap_or(MediaKind::Unknown)
    }

    /// Full intersection, possibly `EMPTY`
    pub fn intersect_full(&self, other: &Caps) -> Caps {
        if self.any {
            return other.clone();
        }
        if other.any {
            return self.clone();
        }

        let mut out: Vec<Structure> = Vec::new();
        for ours in &self.structures {
            for theirs in &other.structures {
                if let Some(s) = ours.intersect(theirs) {
                    if !out.contains(&s) {
                        out.push(s);
                    }
                }
            }
        }
        Caps::from_structures(out)
    }

    /// Whether the two descriptions share at least one representable stream
    pub fn can_intersect(&self, other: &Caps) -> bool {
        !self.intersect_full(other).is_empty()
    }
}

/// Overlap of two descriptions, or `None` when they are disjoint
pub fn intersect(a: &Caps, b: &Caps) -> Option<Caps> {
    let res = a.intersect_full(b);
    (!res.is_empty()).then_some(res)
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            return write!(f, "ANY");
        }
        if self.structures.is_empty() {
            return write!(f, "EMPTY");
        }
        for (i, s) in self.structures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}

impl FromStr for Caps {
    type Err = AutoplugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Caps::parse(s)
    }
}

impl TryFrom<String> for Caps {
    type Error = AutoplugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Caps::parse(&value)
    }
}

impl From<Caps> for String {
    fn from(caps: Caps) -> Self {
        caps.to_string()
    }
}
