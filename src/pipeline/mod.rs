//! Graph runtime interface and an in-memory implementation

pub mod memory;

pub use memory::Pipeline;

use crate::core::Caps;
use crate::error::AutoplugResult;
use crate::registry::ElementFactory;
use petgraph::stable_graph::NodeIndex;
use std::fmt;

/// Handle of an instantiated processing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) NodeIndex);

/// Handle of a pad on an instantiated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadId(pub(crate) usize);

/// Lifecycle state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    /// Created, holds no resources
    Null,
    /// Resources allocated, no data flow
    Ready,
    /// Prepared for data flow, clock stopped
    Paused,
    /// Data flowing
    Playing,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Null => "NULL",
            State::Ready => "READY",
            State::Paused => "PAUSED",
            State::Playing => "PLAYING",
        };
        f.write_str(name)
    }
}

/// Notification emitted by the runtime while data flows
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A unit exposed a new output pad of a known type
    PadAdded {
        /// Unit that owns the pad
        element: ElementId,
        /// The new pad
        pad: PadId,
        /// Type of the data the pad will produce
        caps: Caps,
    },
}

/// Graph mutation primitives the autoplugger needs from a media runtime
pub trait Runtime {
    /// Instantiate a unit from a factory; its `always` pads exist afterwards
    fn make_element(&mut self, factory: &ElementFactory) -> AutoplugResult<ElementId>;

    /// Attach a unit to the graph
    fn add(&mut self, element: ElementId) -> AutoplugResult<()>;

    /// Drive a unit to a lifecycle state
    fn set_state(&mut self, element: ElementId, state: State) -> AutoplugResult<()>;

    /// Look up an existing pad by name
    fn static_pad(&self, element: ElementId, name: &str) -> Option<PadId>;

    /// Current type description of a pad
    fn pad_caps(&self, pad: PadId) -> AutoplugResult<Caps>;

    /// Whether the pad is connected to a peer
    fn is_linked(&self, pad: PadId) -> bool;

    /// Connect an output pad to an input pad
    fn link(&mut self, src: PadId, sink: PadId) -> AutoplugResult<()>;

    /// Human readable `element:pad` name
    fn describe_pad(&self, pad: PadId) -> String;

    /// Human readable element name
    fn element_name(&self, element: ElementId) -> String;

    /// Next pending notification, if any
    fn next_event(&mut self) -> Option<PipelineEvent>;
}
