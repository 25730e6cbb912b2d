//! One autoplugging run over a detected input
//!
//! The session owns the in-memory pipeline and stands in for a media runtime
//! that would normally announce dynamic pads while data flows: every unit
//! registered for announcements exposes the detected streams it can carry.

use crate::autoplug::{Autoplugger, PlugOutcome, PlugReport, TerminalSink};
use crate::config::AutoplugConfig;
use crate::core::Caps;
use crate::error::AutoplugResult;
use crate::pipeline::{ElementId, PadId, Pipeline, State};
use crate::registry::{Catalog, Registry};
use crate::typefind::MediaInfo;

/// Name of the source unit producing the detected input type
pub const SOURCE_NAME: &str = "typefind";

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Whether an audio path reached the sink
    pub terminated: bool,
    /// Outcome of the first plug attempt on the source pad
    pub outcome: PlugOutcome,
    /// Every plug attempt in completion order
    pub diagnostics: Vec<PlugReport>,
    /// Links as `(element:pad, element:pad)`, source first
    pub links: Vec<(String, String)>,
}

/// Pipeline, catalog and terminal sink for one input
pub struct Session {
    config: AutoplugConfig,
    catalog: Catalog,
    pipeline: Pipeline,
    source: (ElementId, PadId),
    sink: TerminalSink,
}

impl Session {
    /// Build the catalog from `registry` and a pipeline holding the source
    /// and the configured sink
    pub fn new(config: AutoplugConfig, registry: &Registry) -> AutoplugResult<Self> {
        let catalog = Catalog::build(registry, &config.catalog_filter());

        let mut pipeline = Pipeline::new();
        let source = pipeline.add_source(SOURCE_NAME, Caps::new_any())?;
        let (sink_element, _) = pipeline.add_sink(&config.sink_name, config.sink_caps.clone())?;
        let sink = TerminalSink::resolve(&pipeline, sink_element, "sink")?;

        log::debug!(
            "Session with {} candidate units, sink {} accepting {}",
            catalog.len(),
            config.sink_name,
            config.sink_caps
        );
        Ok(Session {
            config,
            catalog,
            pipeline,
            source,
            sink,
        })
    }

    /// Build a session using the registry named by the config, or the
    /// built-in one
    pub fn from_config(config: AutoplugConfig) -> AutoplugResult<Self> {
        let registry = config.load_registry()?;
        Self::new(config, &registry)
    }

    /// Catalog the engine selects from
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The pipeline in its current shape
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Graphviz rendering of the pipeline
    pub fn to_dot(&self) -> String {
        self.pipeline.to_dot()
    }

    /// Autoplug the detected input and start the pipeline.
    ///
    /// A session is meant to run once; the source pad is linked afterwards.
    pub fn run(&mut self, media: &MediaInfo) -> AutoplugResult<SessionReport> {
        let (_, source_pad) = self.source;
        self.pipeline.set_pad_caps(source_pad, media.caps.clone())?;

        let mut engine = Autoplugger::new(&self.catalog, self.sink.clone())
            .with_policy(self.config.policy)
            .with_max_depth(self.config.max_depth);

        log::info!("Input type is {}", media.caps);
        let outcome = engine.try_plug(&mut self.pipeline, source_pad, &media.caps);

        let mut served = 0;
        while let Some(&element) = engine.dynamic_elements().get(served) {
            served += 1;
            if media.streams.is_empty() {
                log::warn!("No elementary streams known, dynamic pads stay unannounced");
                break;
            }
            for stream in &media.streams {
                if let Err(e) = self.pipeline.announce_stream(element, stream.clone()) {
                    log::debug!("Stream {} not announced: {}", stream, e);
                }
            }
            engine.dispatch_pending(&mut self.pipeline);
        }

        let terminated = engine.is_terminated(&self.pipeline);
        if terminated {
            log::info!("Audio path complete, starting pipeline");
        } else {
            log::warn!("No audio path reached {}", self.config.sink_name);
        }
        self.pipeline.set_pipeline_state(State::Playing)?;

        Ok(SessionReport {
            terminated,
            outcome,
            diagnostics: engine.reports().to_vec(),
            links: self.pipeline.links(),
        })
    }
}
