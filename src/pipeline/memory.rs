use super::{ElementId, PadId, PipelineEvent, Runtime, State};
use crate::core::Caps;
use crate::error::{AutoplugError, AutoplugResult};
use crate::registry::{ElementFactory, PadDirection, PadPresence, PadTemplate};
use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Unit instance stored as a graph node
#[derive(Debug, Clone)]
struct ElementNode {
    name: String,
    factory: String,
    templates: Vec<PadTemplate>,
    pads: Vec<PadId>,
    attached: bool,
    state: State,
    history: Vec<State>,
    /// Pads created so far per `sometimes` template
    announced: HashMap<String, u32>,
}

impl fmt::Display for ElementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n({}) [{}]", self.name, self.factory, self.state)
    }
}

/// Pad link stored as a graph edge
#[derive(Debug, Clone)]
struct LinkEdge {
    src_pad: String,
    sink_pad: String,
}

impl fmt::Display for LinkEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src_pad, self.sink_pad)
    }
}

#[derive(Debug, Clone)]
struct PadEntry {
    name: String,
    element: NodeIndex,
    direction: PadDirection,
    caps: Caps,
    peer: Option<PadId>,
}

/// In-memory media graph.
///
/// Moves no data; it records units, pads, links and lifecycle transitions,
/// and queues dynamic pad announcements until they are polled.
#[derive(Debug, Default)]
pub struct Pipeline {
    graph: StableDiGraph<ElementNode, LinkEdge>,
    pads: Vec<PadEntry>,
    events: VecDeque<PipelineEvent>,
    instances: HashMap<String, u32>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pre-attached unit with a single `src` pad producing `caps`
    pub fn add_source(&mut self, name: &str, caps: Caps) -> AutoplugResult<(ElementId, PadId)> {
        self.add_terminal(name, "src", PadDirection::Src, caps)
    }

    /// Add a pre-attached unit with a single `sink` pad accepting `caps`
    pub fn add_sink(&mut self, name: &str, caps: Caps) -> AutoplugResult<(ElementId, PadId)> {
        self.add_terminal(name, "sink", PadDirection::Sink, caps)
    }

    fn add_terminal(
        &mut self,
        name: &str,
        pad_name: &str,
        direction: PadDirection,
        caps: Caps,
    ) -> AutoplugResult<(ElementId, PadId)> {
        if self.element_by_name(name).is_some() {
            return Err(AutoplugError::AlreadyAdded(name.to_string()));
        }

        let template = PadTemplate::new(pad_name, direction, PadPresence::Always, caps.clone());
        let index = self.graph.add_node(ElementNode {
            name: name.to_string(),
            factory: name.to_string(),
            templates: vec![template],
            pads: Vec::new(),
            attached: true,
            state: State::Null,
            history: Vec::new(),
            announced: HashMap::new(),
        });
        let pad = self.create_pad(index, pad_name, direction, caps);
        Ok((ElementId(index), pad))
    }

    fn create_pad(&mut self, element: NodeIndex, name: &str, direction: PadDirection, caps: Caps) -> PadId {
        let id = PadId(self.pads.len());
        self.pads.push(PadEntry {
            name: name.to_string(),
            element,
            direction,
            caps,
            peer: None,
        });
        if let Some(node) = self.graph.node_weight_mut(element) {
            node.pads.push(id);
        }
        id
    }

    fn node(&self, element: ElementId) -> AutoplugResult<&ElementNode> {
        self.graph
            .node_weight(element.0)
            .ok_or_else(|| AutoplugError::ElementNotFound(format!("#{}", element.0.index())))
    }

    fn node_mut(&mut self, element: ElementId) -> AutoplugResult<&mut ElementNode> {
        self.graph
            .node_weight_mut(element.0)
            .ok_or_else(|| AutoplugError::ElementNotFound(format!("#{}", element.0.index())))
    }

    fn pad(&self, pad: PadId) -> AutoplugResult<&PadEntry> {
        self.pads.get(pad.0).ok_or_else(|| AutoplugError::PadNotFound {
            element: "<unknown>".to_string(),
            pad: format!("#{}", pad.0),
        })
    }

    /// Expose a concrete output pad with the given name from one of the
    /// unit's `sometimes` templates, and queue a [`PipelineEvent::PadAdded`].
    pub fn announce_pad(&mut self, element: ElementId, name: &str, caps: Caps) -> AutoplugResult<PadId> {
        let node = self.node(element)?;
        let known = node
            .templates
            .iter()
            .any(|t| is_dynamic_src(t) && t.matches_name(name) && t.caps.can_intersect(&caps));
        let taken = node.pads.iter().any(|p| self.pads[p.0].name == name);
        if !known || taken {
            return Err(AutoplugError::PadNotFound {
                element: node.name.clone(),
                pad: name.to_string(),
            });
        }

        Ok(self.expose(element, name, caps))
    }

    /// Expose a new output pad for a stream of type `caps`, named after the
    /// first `sometimes` template able to carry it.
    pub fn announce_stream(&mut self, element: ElementId, caps: Caps) -> AutoplugResult<PadId> {
        let node = self.node(element)?;
        let template = node
            .templates
            .iter()
            .find(|t| is_dynamic_src(t) && t.caps.can_intersect(&caps))
            .ok_or_else(|| AutoplugError::PadNotFound {
                element: node.name.clone(),
                pad: format!("<sometimes pad for {}>", caps),
            })?;

        let key = template.name_template.clone();
        let mut index = node.announced.get(&key).copied().unwrap_or(0);
        let mut name = template.expand_name(index);
        while node.pads.iter().any(|p| self.pads[p.0].name == name) {
            if !template.name_template.contains('%') {
                return Err(AutoplugError::PadNotFound {
                    element: node.name.clone(),
                    pad: format!("<second {} pad>", name),
                });
            }
            index += 1;
            name = template.expand_name(index);
        }

        self.node_mut(element)?.announced.insert(key, index + 1);
        Ok(self.expose(element, &name, caps))
    }

    fn expose(&mut self, element: ElementId, name: &str, caps: Caps) -> PadId {
        let pad = self.create_pad(element.0, name, PadDirection::Src, caps.clone());
        log::debug!("{} announced new pad {}", self.element_name(element), name);
        self.events.push_back(PipelineEvent::PadAdded { element, pad, caps });
        pad
    }

    /// Replace the type a pad carries, as a source does once its input type
    /// is known
    pub fn set_pad_caps(&mut self, pad: PadId, caps: Caps) -> AutoplugResult<()> {
        if let Some(peer) = self.pad(pad)?.peer {
            return Err(AutoplugError::LinkRefused {
                src: self.describe_pad(pad),
                sink: self.describe_pad(peer),
                reason: "cannot change the type of a linked pad".to_string(),
            });
        }
        self.pads[pad.0].caps = caps;
        Ok(())
    }

    /// Drive every attached unit to `state`
    pub fn set_pipeline_state(&mut self, state: State) -> AutoplugResult<()> {
        let attached: Vec<ElementId> = self.elements();
        for element in attached {
            self.set_state(element, state)?;
        }
        Ok(())
    }

    /// Attached units in creation order
    pub fn elements(&self) -> Vec<ElementId> {
        self.graph
            .node_indices()
            .filter(|i| self.graph[*i].attached)
            .map(ElementId)
            .collect()
    }

    /// Find a unit by instance name
    pub fn element_by_name(&self, name: &str) -> Option<ElementId> {
        self.graph
            .node_indices()
            .find(|i| self.graph[*i].name == name)
            .map(ElementId)
    }

    /// Factory a unit was created from
    pub fn factory_of(&self, element: ElementId) -> Option<&str> {
        self.graph.node_weight(element.0).map(|n| n.factory.as_str())
    }

    /// Whether the unit has been attached
    pub fn is_attached(&self, element: ElementId) -> bool {
        self.graph.node_weight(element.0).is_some_and(|n| n.attached)
    }

    /// Current lifecycle state of a unit
    pub fn state(&self, element: ElementId) -> Option<State> {
        self.graph.node_weight(element.0).map(|n| n.state)
    }

    /// Every state a unit has been driven to, in order
    pub fn state_history(&self, element: ElementId) -> &[State] {
        self.graph
            .node_weight(element.0)
            .map(|n| n.history.as_slice())
            .unwrap_or(&[])
    }

    /// Pads of a unit in creation order
    pub fn pads_of(&self, element: ElementId) -> Vec<PadId> {
        self.graph
            .node_weight(element.0)
            .map(|n| n.pads.clone())
            .unwrap_or_default()
    }

    /// Peer of a linked pad
    pub fn peer(&self, pad: PadId) -> Option<PadId> {
        self.pads.get(pad.0).and_then(|p| p.peer)
    }

    /// All links as `(element:pad, element:pad)`, source first
    pub fn links(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .map(|edge| {
                let src = &self.graph[edge.source()].name;
                let sink = &self.graph[edge.target()].name;
                let link = edge.weight();
                (
                    format!("{}:{}", src, link.src_pad),
                    format!("{}:{}", sink, link.sink_pad),
                )
            })
            .collect()
    }

    /// Number of pending notifications
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Graphviz rendering of the current graph
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.graph))
    }
}

fn is_dynamic_src(template: &PadTemplate) -> bool {
    template.direction == PadDirection::Src && template.presence == PadPresence::Sometimes
}

impl Runtime for Pipeline {
    fn make_element(&mut self, factory: &ElementFactory) -> AutoplugResult<ElementId> {
        let counter = self.instances.entry(factory.name.clone()).or_insert(0);
        let name = format!("{}{}", factory.name, counter);
        *counter += 1;

        let index = self.graph.add_node(ElementNode {
            name,
            factory: factory.name.clone(),
            templates: factory.pads.clone(),
            pads: Vec::new(),
            attached: false,
            state: State::Null,
            history: Vec::new(),
            announced: HashMap::new(),
        });

        for template in factory.pads.iter().filter(|t| t.presence == PadPresence::Always) {
            let pad_name = template.expand_name(0);
            self.create_pad(index, &pad_name, template.direction, template.caps.clone());
        }
        Ok(ElementId(index))
    }

    fn add(&mut self, element: ElementId) -> AutoplugResult<()> {
        let node = self.node_mut(element)?;
        if node.attached {
            return Err(AutoplugError::AlreadyAdded(node.name.clone()));
        }
        node.attached = true;
        Ok(())
    }

    fn set_state(&mut self, element: ElementId, state: State) -> AutoplugResult<()> {
        let node = self.node_mut(element)?;
        if !node.attached {
            return Err(AutoplugError::StateChange {
                element: node.name.clone(),
                reason: "element is not in the pipeline".to_string(),
            });
        }
        if node.state != state {
            log::debug!("{}: {} -> {}", node.name, node.state, state);
            node.state = state;
            node.history.push(state);
        }
        Ok(())
    }

    fn static_pad(&self, element: ElementId, name: &str) -> Option<PadId> {
        let node = self.graph.node_weight(element.0)?;
        node.pads.iter().copied().find(|p| self.pads[p.0].name == name)
    }

    fn pad_caps(&self, pad: PadId) -> AutoplugResult<Caps> {
        Ok(self.pad(pad)?.caps.clone())
    }

    fn is_linked(&self, pad: PadId) -> bool {
        self.peer(pad).is_some()
    }

    fn link(&mut self, src: PadId, sink: PadId) -> AutoplugResult<()> {
        let (src_entry, sink_entry) = (self.pad(src)?, self.pad(sink)?);
        let refuse = |reason: &str| AutoplugError::LinkRefused {
            src: self.describe_pad(src),
            sink: self.describe_pad(sink),
            reason: reason.to_string(),
        };

        if src_entry.direction != PadDirection::Src || sink_entry.direction != PadDirection::Sink {
            return Err(refuse("wrong pad directions"));
        }
        if src_entry.peer.is_some() || sink_entry.peer.is_some() {
            return Err(refuse("pad is already linked"));
        }
        let (src_node, sink_node) = (src_entry.element, sink_entry.element);
        if !self.graph[src_node].attached || !self.graph[sink_node].attached {
            return Err(refuse("element is not in the pipeline"));
        }
        if !src_entry.caps.can_intersect(&sink_entry.caps) {
            return Err(refuse("incompatible caps"));
        }

        let edge = LinkEdge {
            src_pad: src_entry.name.clone(),
            sink_pad: sink_entry.name.clone(),
        };
        self.pads[src.0].peer = Some(sink);
        self.pads[sink.0].peer = Some(src);
        self.graph.add_edge(src_node, sink_node, edge);
        Ok(())
    }

    fn describe_pad(&self, pad: PadId) -> String {
        match self.pads.get(pad.0) {
            Some(entry) => format!("{}:{}", self.graph[entry.element].name, entry.name),
            None => format!("<pad #{}>", pad.0),
        }
    }

    fn element_name(&self, element: ElementId) -> String {
        self.graph
            .node_weight(element.0)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| format!("<element #{}>", element.0.index()))
    }

    fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.pop_front()
    }
}
