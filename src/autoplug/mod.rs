//! Autoplugging engine
//!
//! Given an output pad whose type just became known, pick the next unit and
//! grow the graph behind it:
//!
//! 1. stop if the audio sink already has a producer
//! 2. skip video
//! 3. link straight to the sink when the sink accepts the type
//! 4. otherwise take the first catalog entry (highest rank first) whose first
//!    `always` input accepts the type, attach it and recurse into its outputs
//! 5. otherwise leave the pad unconnected
//!
//! The scan is greedy: a committed unit is never reconsidered, even when it
//! leads nowhere and a lower-ranked unit would have reached the sink.

mod link;

use crate::core::{Caps, MediaKind, intersect};
use crate::error::{AutoplugError, AutoplugResult};
use crate::pipeline::{ElementId, PadId, PipelineEvent, Runtime};
use crate::registry::Catalog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many audio paths may reach the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathPolicy {
    /// One active audio path per engine; once the sink has a producer every
    /// further pad is ignored.
    #[default]
    SingleAudioPath,
}

/// The audio output that ends the recursion on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSink {
    /// Sink unit, attached before autoplugging starts
    pub element: ElementId,
    /// Its single input pad
    pub pad: PadId,
    /// Name of that pad
    pub pad_name: String,
}

impl TerminalSink {
    /// Resolve the sink's input pad by name
    pub fn resolve<R: Runtime>(runtime: &R, element: ElementId, pad_name: &str) -> AutoplugResult<Self> {
        let pad = runtime
            .static_pad(element, pad_name)
            .ok_or_else(|| AutoplugError::PadNotFound {
                element: runtime.element_name(element),
                pad: pad_name.to_string(),
            })?;
        Ok(TerminalSink {
            element,
            pad,
            pad_name: pad_name.to_string(),
        })
    }
}

/// What happened to one pad handed to the engine.
///
/// None of these is a failure of the session as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlugOutcome {
    /// The pad now feeds the terminal sink
    Terminated,
    /// A unit was attached behind the pad
    Plugged {
        /// Factory the unit came from
        factory: String,
        /// Instance name
        element: String,
    },
    /// The sink already has a producer; the pad is redundant
    AlreadyTerminated,
    /// The pad carries video and is left alone
    NonAudioType {
        /// Media type of the pad
        media_type: String,
    },
    /// Nothing in the catalog accepts the pad's type
    NoCompatibleUnit {
        /// Media type of the pad
        media_type: String,
    },
    /// The chain grew deeper than the configured limit
    DepthExceeded {
        /// Depth that was refused
        depth: usize,
    },
    /// The runtime refused to attach or link the chosen unit
    LinkFailed {
        /// Runtime error message
        reason: String,
    },
}

impl fmt::Display for PlugOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlugOutcome::Terminated => write!(f, "linked to audio sink"),
            PlugOutcome::Plugged { factory, element } => write!(f, "plugged {} ({})", element, factory),
            PlugOutcome::AlreadyTerminated => write!(f, "ignored, audio sink already linked"),
            PlugOutcome::NonAudioType { media_type } => write!(f, "skipped non-audio type {}", media_type),
            PlugOutcome::NoCompatibleUnit { media_type } => {
                write!(f, "no compatible unit for {}", media_type)
            }
            PlugOutcome::DepthExceeded { depth } => write!(f, "chain depth {} exceeds limit", depth),
            PlugOutcome::LinkFailed { reason } => write!(f, "link failed: {}", reason),
        }
    }
}

/// Outcome recorded for one pad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugReport {
    /// Pad as `element:pad`
    pub pad: String,
    /// Type the pad was offered with
    pub caps: String,
    /// What the engine did
    pub outcome: PlugOutcome,
}

/// Decision engine for one autoplugging session
pub struct Autoplugger<'a> {
    catalog: &'a Catalog,
    sink: TerminalSink,
    policy: PathPolicy,
    max_depth: usize,
    /// Units registered for pad announcements
    dynamic: Vec<ElementId>,
    reports: Vec<PlugReport>,
}

impl<'a> Autoplugger<'a> {
    /// Default bound on the always-pad recursion
    pub const DEFAULT_MAX_DEPTH: usize = 16;

    /// Create an engine selecting from `catalog` towards `sink`
    pub fn new(catalog: &'a Catalog, sink: TerminalSink) -> Self {
        Autoplugger {
            catalog,
            sink,
            policy: PathPolicy::default(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            dynamic: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Set the sink policy
    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the recursion bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The sink this engine plugs towards
    pub fn sink(&self) -> &TerminalSink {
        &self.sink
    }

    /// Outcomes in completion order (a unit's downstream pads come before
    /// the pad that introduced the unit)
    pub fn reports(&self) -> &[PlugReport] {
        &self.reports
    }

    /// Units waiting for pad announcements, in registration order
    pub fn dynamic_elements(&self) -> &[ElementId] {
        &self.dynamic
    }

    /// Whether an audio path has reached the sink
    pub fn is_terminated<R: Runtime>(&self, runtime: &R) -> bool {
        match self.policy {
            PathPolicy::SingleAudioPath => runtime.is_linked(self.sink.pad),
        }
    }

    /// Entry point for a pad whose type became known
    pub fn try_plug<R: Runtime>(&mut self, runtime: &mut R, pad: PadId, caps: &Caps) -> PlugOutcome {
        self.plug(runtime, pad, caps, 0)
    }

    /// Feed one runtime notification into the engine.
    ///
    /// Announcements from units that never registered for dynamic pads are
    /// dropped and yield `None`.
    pub fn handle_event<R: Runtime>(&mut self, runtime: &mut R, event: PipelineEvent) -> Option<PlugOutcome> {
        match event {
            PipelineEvent::PadAdded { element, pad, caps } => {
                if !self.dynamic.contains(&element) {
                    log::debug!(
                        "Ignoring new pad {}, its unit was not plugged by us",
                        runtime.describe_pad(pad)
                    );
                    return None;
                }
                log::info!("New pad {} with type {}", runtime.describe_pad(pad), caps);
                Some(self.try_plug(runtime, pad, &caps))
            }
        }
    }

    /// Drain the runtime's pending notifications
    pub fn dispatch_pending<R: Runtime>(&mut self, runtime: &mut R) -> Vec<PlugOutcome> {
        let mut outcomes = Vec::new();
        while let Some(event) = runtime.next_event() {
            if let Some(outcome) = self.handle_event(runtime, event) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn watch(&mut self, element: ElementId) {
        if !self.dynamic.contains(&element) {
            self.dynamic.push(element);
        }
    }

    fn plug<R: Runtime>(&mut self, runtime: &mut R, pad: PadId, caps: &Caps, depth: usize) -> PlugOutcome {
        let outcome = self.select(runtime, pad, caps, depth);
        self.reports.push(PlugReport {
            pad: runtime.describe_pad(pad),
            caps: caps.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }

    fn select<R: Runtime>(&mut self, runtime: &mut R, pad: PadId, caps: &Caps, depth: usize) -> PlugOutcome {
        let pad_name = runtime.describe_pad(pad);

        if self.is_terminated(runtime) {
            log::info!("Not plugging {}, the audio sink is already linked", pad_name);
            return PlugOutcome::AlreadyTerminated;
        }

        let media_type = caps
            .media_type()
            .map(str::to_owned)
            .unwrap_or_else(|| caps.to_string());
        if caps.kind() == MediaKind::Video {
            log::debug!("Not plugging {}, {} is not audio", pad_name, media_type);
            return PlugOutcome::NonAudioType { media_type };
        }

        let sink_caps = match runtime.pad_caps(self.sink.pad) {
            Ok(c) => c,
            Err(e) => return link_failed(&pad_name, e),
        };
        if intersect(caps, &sink_caps).is_some() {
            log::info!("{} feeds the audio sink, autoplugging done", pad_name);
            let sink = self.sink.clone();
            return match self.close_link(runtime, pad, sink.element, &sink.pad_name, &[], depth) {
                Ok(()) => PlugOutcome::Terminated,
                Err(e) => link_failed(&pad_name, e),
            };
        }

        // the bound applies to new units only
        if depth > self.max_depth {
            log::warn!(
                "Not plugging {}, chain is deeper than {} units",
                pad_name,
                self.max_depth
            );
            return PlugOutcome::DepthExceeded { depth };
        }

        let catalog = self.catalog;
        for factory in catalog {
            // only the first always input characterizes what a unit accepts
            let Some(input) = factory.first_always_sink() else {
                continue;
            };
            if intersect(caps, &input.caps).is_none() {
                continue;
            }

            log::debug!("{} accepts {} on {}", factory.name, media_type, pad_name);
            let element = match runtime.make_element(factory) {
                Ok(element) => element,
                Err(e) => return link_failed(&pad_name, e),
            };
            let input_name = input.expand_name(0);
            return match self.close_link(runtime, pad, element, &input_name, &factory.pads, depth) {
                Ok(()) => PlugOutcome::Plugged {
                    factory: factory.name.clone(),
                    element: runtime.element_name(element),
                },
                Err(e) => link_failed(&pad_name, e),
            };
        }

        log::warn!("No compatible unit found to decode {} on {}", media_type, pad_name);
        PlugOutcome::NoCompatibleUnit { media_type }
    }
}

fn link_failed(pad_name: &str, err: AutoplugError) -> PlugOutcome {
    log::error!("Plugging {} failed: {}", pad_name, err);
    PlugOutcome::LinkFailed {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, State};
    use crate::registry::{
        CatalogFilter, ElementFactory, PadDirection, PadPresence, PadTemplate, Rank, Registry,
    };

    fn caps(s: &str) -> Caps {
        Caps::parse(s).unwrap()
    }

    fn sink_pad(name: &str, c: &str) -> PadTemplate {
        PadTemplate::new(name, PadDirection::Sink, PadPresence::Always, caps(c))
    }

    fn src_pad(name: &str, presence: PadPresence, c: &str) -> PadTemplate {
        PadTemplate::new(name, PadDirection::Src, presence, caps(c))
    }

    fn unit(name: &str, klass: &str, rank: u32, input: &str, output: &str) -> ElementFactory {
        ElementFactory::new(name, klass, Rank(rank))
            .with_pad(sink_pad("sink", input))
            .with_pad(src_pad("src", PadPresence::Always, output))
    }

    fn catalog(factories: Vec<ElementFactory>) -> Catalog {
        Catalog::build(&Registry::new(factories).unwrap(), &CatalogFilter::default())
    }

    /// Pipeline holding a typefind source and an audio sink for raw audio
    fn setup(source_caps: &str) -> (Pipeline, PadId, TerminalSink) {
        let mut pipeline = Pipeline::new();
        let (_, src) = pipeline.add_source("typefind", caps(source_caps)).unwrap();
        let (sink_el, _) = pipeline.add_sink("audiosink", caps("audio/x-raw")).unwrap();
        let sink = TerminalSink::resolve(&pipeline, sink_el, "sink").unwrap();
        (pipeline, src, sink)
    }

    fn link(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_decoder_chain_to_sink() {
        let catalog = catalog(vec![unit("mp3dec", "Codec/Decoder/Audio", 200, "audio/mpeg", "audio/x-raw")]);
        let (mut pipeline, src, sink) = setup("audio/mpeg");
        let sink_element = sink.element;
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/mpeg"));
        assert_eq!(
            outcome,
            PlugOutcome::Plugged {
                factory: "mp3dec".into(),
                element: "mp3dec0".into()
            }
        );
        assert_eq!(
            pipeline.links(),
            vec![
                link("typefind:src", "mp3dec0:sink"),
                link("mp3dec0:src", "audiosink:sink")
            ]
        );
        assert!(engine.is_terminated(&pipeline));

        let dec = pipeline.element_by_name("mp3dec0").unwrap();
        assert_eq!(pipeline.factory_of(dec), Some("mp3dec"));
        assert_eq!(pipeline.state_history(dec), &[State::Ready, State::Paused]);
        // The sink is neither re-added nor state-driven
        assert!(pipeline.state_history(sink_element).is_empty());

        let outcomes: Vec<&PlugOutcome> = engine.reports().iter().map(|r| &r.outcome).collect();
        assert_eq!(outcomes[0], &PlugOutcome::Terminated);
        assert_eq!(engine.reports()[0].pad, "mp3dec0:src");
        assert_eq!(engine.reports()[1].pad, "typefind:src");
    }

    #[test]
    fn test_video_is_never_plugged() {
        let catalog = catalog(vec![
            unit("mp3dec", "Codec/Decoder/Audio", 200, "audio/mpeg", "audio/x-raw"),
            unit("mpeg2dec", "Codec/Decoder/Video", 256, "video/mpeg", "video/x-raw"),
        ]);
        let (mut pipeline, src, sink) = setup("video/mpeg");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("video/mpeg"));
        assert_eq!(
            outcome,
            PlugOutcome::NonAudioType {
                media_type: "video/mpeg".into()
            }
        );
        assert!(pipeline.links().is_empty());
        assert_eq!(pipeline.elements().len(), 2);
        assert!(pipeline.element_by_name("mpeg2dec0").is_none());
    }

    #[test]
    fn test_empty_catalog_reports_no_compatible_unit() {
        let catalog = Catalog::default();
        let (mut pipeline, src, sink) = setup("audio/mpeg");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/mpeg"));
        assert_eq!(
            outcome,
            PlugOutcome::NoCompatibleUnit {
                media_type: "audio/mpeg".into()
            }
        );
        assert!(pipeline.links().is_empty());
        assert_eq!(pipeline.elements().len(), 2);
        assert!(!engine.is_terminated(&pipeline));
    }

    #[test]
    fn test_direct_sink_match_wins_over_catalog() {
        let catalog = catalog(vec![unit(
            "rawdecoder",
            "Codec/Decoder/Audio",
            1000,
            "audio/x-raw",
            "audio/x-raw",
        )]);
        let (mut pipeline, src, sink) = setup("audio/x-raw");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/x-raw, rate=(int)44100"));
        assert_eq!(outcome, PlugOutcome::Terminated);
        assert_eq!(pipeline.links(), vec![link("typefind:src", "audiosink:sink")]);
        assert!(pipeline.element_by_name("rawdecoder0").is_none());
    }

    #[test]
    fn test_already_terminated_is_idempotent() {
        let catalog = catalog(vec![unit("mp3dec", "Codec/Decoder/Audio", 200, "audio/mpeg", "audio/x-raw")]);
        let (mut pipeline, src, sink) = setup("audio/x-raw");
        let (_, second) = pipeline.add_source("second", caps("audio/mpeg")).unwrap();
        let mut engine = Autoplugger::new(&catalog, sink);

        assert_eq!(
            engine.try_plug(&mut pipeline, src, &caps("audio/x-raw")),
            PlugOutcome::Terminated
        );
        let before = pipeline.links();

        for c in ["audio/mpeg", "audio/x-raw", "video/mpeg", "EMPTY"] {
            assert_eq!(
                engine.try_plug(&mut pipeline, second, &caps(c)),
                PlugOutcome::AlreadyTerminated
            );
        }
        assert_eq!(pipeline.links(), before);
        assert!(pipeline.element_by_name("mp3dec0").is_none());
    }

    #[test]
    fn test_greedy_first_match_without_backtracking() {
        let registry = Registry::new(vec![
            unit("bdec", "Codec/Decoder/Audio", 5, "audio/x-foo", "audio/x-raw"),
            unit("adec", "Codec/Decoder/Audio", 10, "audio/x-foo", "audio/x-deadend"),
        ])
        .unwrap();
        let filter = CatalogFilter {
            min_rank: Rank::NONE,
            ..CatalogFilter::default()
        };
        let catalog = Catalog::build(&registry, &filter);
        let (mut pipeline, src, sink) = setup("audio/x-foo");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/x-foo"));
        assert_eq!(
            outcome,
            PlugOutcome::Plugged {
                factory: "adec".into(),
                element: "adec0".into()
            }
        );
        assert!(!engine.is_terminated(&pipeline));
        assert!(pipeline.element_by_name("bdec0").is_none());
        assert_eq!(
            engine.reports()[0].outcome,
            PlugOutcome::NoCompatibleUnit {
                media_type: "audio/x-deadend".into()
            }
        );
    }

    #[test]
    fn test_sometimes_pad_plugged_on_announcement() {
        let demux = ElementFactory::new("oggdemux", "Codec/Demuxer", Rank::PRIMARY)
            .with_pad(sink_pad("sink", "application/ogg"))
            .with_pad(src_pad("src_%08x", PadPresence::Sometimes, "ANY"));
        let catalog = catalog(vec![
            demux,
            unit("vorbisdec", "Codec/Decoder/Audio", 256, "audio/x-vorbis", "audio/x-raw"),
        ]);
        let (mut pipeline, src, sink) = setup("application/ogg");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("application/ogg"));
        assert_eq!(
            outcome,
            PlugOutcome::Plugged {
                factory: "oggdemux".into(),
                element: "oggdemux0".into()
            }
        );
        let demux = pipeline.element_by_name("oggdemux0").unwrap();
        assert_eq!(engine.dynamic_elements(), &[demux]);
        assert_eq!(pipeline.links(), vec![link("typefind:src", "oggdemux0:sink")]);

        pipeline.announce_stream(demux, caps("audio/x-vorbis")).unwrap();
        // Nothing happens until the announcement is dispatched
        assert_eq!(pipeline.links().len(), 1);

        let outcomes = engine.dispatch_pending(&mut pipeline);
        assert_eq!(
            outcomes,
            vec![PlugOutcome::Plugged {
                factory: "vorbisdec".into(),
                element: "vorbisdec0".into()
            }]
        );
        assert!(engine.is_terminated(&pipeline));
        assert!(pipeline.links().contains(&link("oggdemux0:src_00000000", "vorbisdec0:sink")));
        assert!(pipeline.links().contains(&link("vorbisdec0:src", "audiosink:sink")));
    }

    #[test]
    fn test_partial_plugging_is_accepted() {
        let demux = ElementFactory::new("matroskademux", "Codec/Demuxer", Rank::PRIMARY)
            .with_pad(sink_pad("sink", "video/x-matroska; audio/x-matroska"))
            .with_pad(src_pad("audio_%u", PadPresence::Sometimes, "audio/x-vorbis; audio/x-opus"))
            .with_pad(src_pad("video_%u", PadPresence::Sometimes, "video/x-vp8"));
        let catalog = catalog(vec![
            demux,
            unit("vorbisdec", "Codec/Decoder/Audio", 256, "audio/x-vorbis", "audio/x-raw"),
        ]);
        let (mut pipeline, src, sink) = setup("audio/x-matroska");
        let mut engine = Autoplugger::new(&catalog, sink);
        engine.try_plug(&mut pipeline, src, &caps("audio/x-matroska"));

        let demux = pipeline.element_by_name("matroskademux0").unwrap();
        pipeline.announce_stream(demux, caps("video/x-vp8")).unwrap();
        pipeline.announce_stream(demux, caps("audio/x-opus")).unwrap();
        pipeline.announce_stream(demux, caps("audio/x-vorbis")).unwrap();
        pipeline.announce_stream(demux, caps("audio/x-vorbis")).unwrap();

        let outcomes = engine.dispatch_pending(&mut pipeline);
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[0], PlugOutcome::NonAudioType { .. }));
        assert!(matches!(outcomes[1], PlugOutcome::NoCompatibleUnit { .. }));
        assert!(matches!(outcomes[2], PlugOutcome::Plugged { .. }));
        assert_eq!(outcomes[3], PlugOutcome::AlreadyTerminated);
        assert!(engine.is_terminated(&pipeline));
    }

    #[test]
    fn test_announcements_from_foreign_units_are_ignored() {
        let demux = ElementFactory::new("oggdemux", "Codec/Demuxer", Rank::PRIMARY)
            .with_pad(sink_pad("sink", "application/ogg"))
            .with_pad(src_pad("src_%u", PadPresence::Sometimes, "ANY"));
        let catalog = catalog(vec![demux.clone()]);
        let (mut pipeline, _, sink) = setup("application/ogg");
        let mut engine = Autoplugger::new(&catalog, sink);

        let foreign = pipeline.make_element(&demux).unwrap();
        pipeline.add(foreign).unwrap();
        pipeline.announce_stream(foreign, caps("audio/x-raw")).unwrap();

        assert!(engine.dispatch_pending(&mut pipeline).is_empty());
        assert!(pipeline.links().is_empty());
        assert_eq!(pipeline.pending_events(), 0);
    }

    #[test]
    fn test_only_first_always_input_is_considered() {
        let picky = ElementFactory::new("picky", "Codec/Decoder/Audio", Rank(300))
            .with_pad(PadTemplate::new("sink_%u", PadDirection::Sink, PadPresence::Request, caps("audio/mpeg")))
            .with_pad(sink_pad("sink", "audio/x-other"))
            .with_pad(sink_pad("sink2", "audio/mpeg"))
            .with_pad(src_pad("src", PadPresence::Always, "audio/x-raw"));
        let catalog = catalog(vec![
            picky,
            unit("mp3dec", "Codec/Decoder/Audio", 200, "audio/mpeg", "audio/x-raw"),
        ]);
        let (mut pipeline, src, sink) = setup("audio/mpeg");
        let mut engine = Autoplugger::new(&catalog, sink);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/mpeg"));
        assert!(matches!(outcome, PlugOutcome::Plugged { ref factory, .. } if factory == "mp3dec"));
    }

    #[test]
    fn test_request_outputs_are_ignored() {
        let splitter = ElementFactory::new("splitter", "Codec/Demuxer", Rank::PRIMARY)
            .with_pad(sink_pad("sink", "audio/x-bundle"))
            .with_pad(src_pad("extra_%u", PadPresence::Request, "audio/x-raw"))
            .with_pad(src_pad("main", PadPresence::Always, "audio/x-raw"));
        let catalog = catalog(vec![splitter]);
        let (mut pipeline, src, sink) = setup("audio/x-bundle");
        let mut engine = Autoplugger::new(&catalog, sink);

        engine.try_plug(&mut pipeline, src, &caps("audio/x-bundle"));
        assert!(engine.dynamic_elements().is_empty());
        assert_eq!(
            pipeline.links(),
            vec![
                link("typefind:src", "splitter0:sink"),
                link("splitter0:main", "audiosink:sink")
            ]
        );
    }

    #[test]
    fn test_depth_limit_stops_self_feeding_units() {
        let catalog = catalog(vec![unit("loopparse", "Codec/Parser/Audio", 256, "audio/x-loop", "audio/x-loop")]);
        let (mut pipeline, src, sink) = setup("audio/x-loop");
        let mut engine = Autoplugger::new(&catalog, sink).with_max_depth(3);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/x-loop"));
        assert!(matches!(outcome, PlugOutcome::Plugged { .. }));
        assert!(pipeline.element_by_name("loopparse3").is_some());
        assert!(pipeline.element_by_name("loopparse4").is_none());
        assert_eq!(engine.reports()[0].outcome, PlugOutcome::DepthExceeded { depth: 4 });
    }

    #[test]
    fn test_depth_limit_does_not_block_the_sink() {
        let catalog = catalog(vec![unit("mp3dec", "Codec/Decoder/Audio", 200, "audio/mpeg", "audio/x-raw")]);
        let (mut pipeline, src, sink) = setup("audio/mpeg");
        let mut engine = Autoplugger::new(&catalog, sink).with_max_depth(0);

        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/mpeg"));
        assert!(matches!(outcome, PlugOutcome::Plugged { ref factory, .. } if factory == "mp3dec"));
        assert!(engine.is_terminated(&pipeline));
        assert_eq!(engine.reports()[0].outcome, PlugOutcome::Terminated);
        assert_eq!(
            pipeline.links(),
            vec![
                link("typefind:src", "mp3dec0:sink"),
                link("mp3dec0:src", "audiosink:sink")
            ]
        );
    }

    #[test]
    fn test_runtime_refusal_is_reported() {
        let catalog = Catalog::default();
        let (mut pipeline, src, sink) = setup("audio/x-raw");
        let (_, other) = pipeline.add_sink("fakesink", Caps::new_any()).unwrap();
        pipeline.link(src, other).unwrap();

        let mut engine = Autoplugger::new(&catalog, sink);
        let outcome = engine.try_plug(&mut pipeline, src, &caps("audio/x-raw"));
        assert!(matches!(outcome, PlugOutcome::LinkFailed { .. }));
        assert!(!engine.is_terminated(&pipeline));
    }

    #[test]
    fn test_builtin_registry_decodes_ogg_vorbis() {
        let registry = Registry::builtin().unwrap();
        let catalog = Catalog::build(&registry, &CatalogFilter::default());
        let (mut pipeline, src, sink) = setup("application/ogg");
        let mut engine = Autoplugger::new(&catalog, sink);

        engine.try_plug(&mut pipeline, src, &caps("application/ogg"));
        let demux = pipeline.element_by_name("oggdemux0").unwrap();
        pipeline.announce_stream(demux, caps("video/x-theora")).unwrap();
        pipeline.announce_stream(demux, caps("audio/x-vorbis, rate=(int)44100, channels=(int)2")).unwrap();
        engine.dispatch_pending(&mut pipeline);

        assert!(engine.is_terminated(&pipeline));
        assert!(pipeline.element_by_name("theoradec0").is_none());
        assert!(pipeline.links().contains(&link("vorbisdec0:src", "audiosink:sink")));
    }

    #[test]
    fn test_builtin_registry_parses_before_decoding() {
        let registry = Registry::builtin().unwrap();
        let catalog = Catalog::build(&registry, &CatalogFilter::default());
        let (mut pipeline, src, sink) = setup("audio/mpeg");
        let mut engine = Autoplugger::new(&catalog, sink);

        engine.try_plug(&mut pipeline, src, &caps("audio/mpeg, mpegversion=(int)1, layer=(int)3"));
        assert_eq!(
            pipeline.links(),
            vec![
                link("typefind:src", "mpegaudioparse0:sink"),
                link("mpegaudioparse0:src", "mpg123audiodec0:sink"),
                link("mpg123audiodec0:src", "audiosink:sink"),
            ]
        );
    }
}
