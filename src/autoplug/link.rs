use super::Autoplugger;
use crate::error::{AutoplugError, AutoplugResult};
use crate::pipeline::{ElementId, PadId, Runtime, State};
use crate::registry::{PadDirection, PadPresence, PadTemplate};

impl Autoplugger<'_> {
    /// Attach `element` behind `src` through its input pad `pad_name`, then
    /// continue with the unit's outputs.
    ///
    /// `always` outputs are plugged right away, depth first, in template
    /// order. A `sometimes` output registers the unit for pad announcements.
    /// `request` outputs are never touched.
    pub(crate) fn close_link<R: Runtime>(
        &mut self,
        runtime: &mut R,
        src: PadId,
        element: ElementId,
        pad_name: &str,
        templates: &[PadTemplate],
        depth: usize,
    ) -> AutoplugResult<()> {
        let is_unit = element != self.sink.element;
        log::info!(
            "Linking {} to {}:{}",
            runtime.describe_pad(src),
            runtime.element_name(element),
            pad_name
        );

        // the terminal sink is already attached and stays in its own state
        if is_unit {
            runtime.add(element)?;
            runtime.set_state(element, State::Ready)?;
        }
        let sink_pad = runtime
            .static_pad(element, pad_name)
            .ok_or_else(|| AutoplugError::PadNotFound {
                element: runtime.element_name(element),
                pad: pad_name.to_string(),
            })?;
        runtime.link(src, sink_pad)?;
        if is_unit {
            runtime.set_state(element, State::Paused)?;
        }

        let mut has_dynamic_pads = false;
        for template in templates {
            if template.direction != PadDirection::Src {
                continue;
            }
            match template.presence {
                PadPresence::Always => {
                    let name = template.expand_name(0);
                    let Some(pad) = runtime.static_pad(element, &name) else {
                        log::error!(
                            "{} has no output {} although its template is always present",
                            runtime.element_name(element),
                            name
                        );
                        continue;
                    };
                    match runtime.pad_caps(pad) {
                        Ok(caps) => {
                            self.plug(runtime, pad, &caps, depth + 1);
                        }
                        Err(e) => log::error!("Cannot read type of {}: {}", runtime.describe_pad(pad), e),
                    }
                }
                PadPresence::Sometimes => has_dynamic_pads = true,
                PadPresence::Request => {}
            }
        }

        if has_dynamic_pads {
            log::debug!(
                "{} has dynamic outputs, waiting for pad announcements",
                runtime.element_name(element)
            );
            self.watch(element);
        }
        Ok(())
    }
}
