//! Coarse vs continuous input classification
//!
//! Mouse wheels report large deltas at irregular intervals; trackpads and
//! touch report small deltas at display rate. The label is sticky for the
//! session: re-labelling mid-stream would flip between the coarse and the
//! continuous path and visibly jump.

use flipstack_core::InputSource;

use crate::config::ClassifierConfig;

/// Sticky per-session classifier
#[derive(Clone, Debug)]
pub struct InputClassifier {
    config: ClassifierConfig,
    current: Option<InputSource>,
    last_event_ms: Option<f64>,
}

impl InputClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            current: None,
            last_event_ms: None,
        }
    }

    /// Label one event of the stream.
    ///
    /// Evaluated on the first event, after [`end_session`](Self::end_session),
    /// or after a pause longer than `reclassify_pause_ms`; otherwise the
    /// session's label is returned unchanged.
    pub fn classify(&mut self, magnitude: f32, timestamp_ms: f64) -> InputSource {
        // Out-of-order timestamps count as back-to-back
        let gap_ms = self
            .last_event_ms
            .map(|last| ((timestamp_ms - last) as f32).max(0.0));
        self.last_event_ms = Some(timestamp_ms);

        let paused = gap_ms.map_or(true, |gap| gap > self.config.reclassify_pause_ms);
        match self.current {
            Some(source) if !paused => source,
            _ => {
                let source = self.evaluate(magnitude.abs(), gap_ms);
                if self.current != Some(source) {
                    tracing::debug!(
                        "input classified {:?} (|delta|={:.1}, gap={:?}ms)",
                        source,
                        magnitude.abs(),
                        gap_ms
                    );
                }
                self.current = Some(source);
                source
            }
        }
    }

    /// The heuristic itself, without any session stickiness
    pub fn evaluate(&self, magnitude: f32, gap_ms: Option<f32>) -> InputSource {
        let small = magnitude < self.config.small_delta_cutoff;
        let streaming = gap_ms.is_some_and(|gap| gap < self.config.streaming_gap_ms);
        if small || streaming {
            InputSource::Continuous
        } else {
            InputSource::Coarse
        }
    }

    /// Label of the running session, if any
    pub fn current(&self) -> Option<InputSource> {
        self.current
    }

    /// Forget the label; the next event is classified afresh.
    /// Timing history is kept so the next gap is still known.
    pub fn end_session(&mut self) {
        self.current = None;
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.current = None;
        self.last_event_ms = None;
    }
}

impl Default for InputClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
