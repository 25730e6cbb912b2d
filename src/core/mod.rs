//! Media type descriptions and their intersection

/// Caps, structures and the matcher
pub mod caps;
/// Textual caps grammar
pub mod parse;
/// Field values
pub mod value;

pub use caps::{Caps, MediaKind, Structure, intersect};
pub use value::{Fraction, Value};
