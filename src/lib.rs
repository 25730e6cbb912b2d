#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! # autoplug: Rank-Driven Audio Autoplugging
//!
//! Builds an audio decoding chain from a catalog of processing-unit factories,
//! one pad at a time, until the stream reaches an audio sink.
//!
//! ## Features
//!
//! - **Caps** - GStreamer-style type descriptions with ranges, lists and intersection
//! - **Registry** - factories with ranks and pad templates, loaded from TOML
//! - **Autoplug** - greedy highest-rank-first selection with depth-first recursion
//! - **Dynamic pads** - demuxer outputs are plugged when they are announced
//! - **Typefind** - container sniffing and stream detection via Symphonia
//!
//! ## Quick Start
//!
//! ```ignore
//! use autoplug::{AutoplugConfig, Registry, Session};
//! use autoplug::typefind;
//!
//! let media = typefind::type_find_file("song.ogg")?;
//! let mut session = Session::new(AutoplugConfig::default(), &Registry::builtin()?)?;
//! let report = session.run(&media)?;
//! assert!(report.terminated);
//! ```

/// Autoplugging engine and link installer
pub mod autoplug;
/// Session configuration
pub mod config;
/// Caps, structures and field values
pub mod core;
/// Error types for autoplugging operations
pub mod error;
/// Graph runtime interface and in-memory pipeline
pub mod pipeline;
/// Factory registry and autoplug catalog
pub mod registry;
/// Autoplugging sessions
pub mod session;
/// Media type detection
pub mod typefind;

// Export public types
pub use autoplug::{Autoplugger, PathPolicy, PlugOutcome, PlugReport, TerminalSink};
pub use config::AutoplugConfig;
pub use core::{Caps, MediaKind, intersect};
pub use error::{AutoplugError, AutoplugResult};
pub use pipeline::{Pipeline, Runtime};
pub use registry::{Catalog, CatalogFilter, ElementFactory, Rank, Registry};
pub use session::{Session, SessionReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
