use std::io;
use thiserror::Error;

/// Result type for autoplugging operations
pub type AutoplugResult<T> = Result<T, AutoplugError>;

/// Error types for registry loading, caps handling and graph mutation
#[derive(Error, Debug)]
pub enum AutoplugError {
    /// IO error (file operations, disk access)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A caps string could not be parsed
    #[error("Invalid caps \"{caps}\": {reason}")]
    CapsParse {
        /// The offending caps string
        caps: String,
        /// What went wrong
        reason: String,
    },

    /// Registry contents are inconsistent
    #[error("Registry error: {0}")]
    Registry(String),

    /// TOML document could not be decoded
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Element is unknown to the pipeline
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element has no pad of that name
    #[error("Pad not found: {element}:{pad}")]
    PadNotFound {
        /// Element name
        element: String,
        /// Pad name
        pad: String,
    },

    /// Element was added to the pipeline twice
    #[error("Element {0} is already in the pipeline")]
    AlreadyAdded(String),

    /// The runtime refused to link two pads
    #[error("Cannot link {src} to {sink}: {reason}")]
    LinkRefused {
        /// Source pad, as `element:pad`
        src: String,
        /// Sink pad, as `element:pad`
        sink: String,
        /// Why the link was refused
        reason: String,
    },

    /// Lifecycle transition failed
    #[error("State change failed for {element}: {reason}")]
    StateChange {
        /// Element name
        element: String,
        /// Why the transition failed
        reason: String,
    },

    /// No media type could be detected for an input
    #[error("Could not determine media type of {0}")]
    TypeNotFound(String),

    /// Stream detection failed
    #[error("Detection error: {0}")]
    Detect(String),
}

impl From<symphonia::core::errors::Error> for AutoplugError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        match err {
            symphonia::core::errors::Error::IoError(e) => AutoplugError::Io(e),
            e => AutoplugError::Detect(e.to_string()),
        }
    }
}
