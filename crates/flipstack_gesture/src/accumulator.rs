//! Gesture accumulation
//!
//! Raw continuous deltas become a signed offset and a smoothed velocity.
//! Small jitters never start a gesture: deltas are summed over a short
//! window and the session only begins once that sum crosses the start
//! threshold. Once running, a delta against the session direction restarts
//! the offset from zero in the new direction.

use flipstack_core::{Direction, InputSource};
use serde::Serialize;
use smallvec::SmallVec;

use crate::config::GestureConfig;

/// Interval assumed for a sample with no usable predecessor (one 60Hz frame)
const FRAME_MS: f32 = 1000.0 / 60.0;

/// Lifecycle of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Idle,
    Dragging,
    SnappingBack,
    SnappingForward,
}

/// One continuous interaction
#[derive(Clone, Debug)]
pub struct GestureSession {
    pub source: InputSource,
    pub direction: Option<Direction>,
    /// Signed; positive moves toward the next section
    pub accumulated_offset: f32,
    /// Distance per second, signed like the offset
    pub velocity: f32,
    pub phase: GesturePhase,
    pub started_at_ms: f64,
    pub last_sample_ms: f64,
    pub needs_publish: bool,
}

impl GestureSession {
    /// Unclamped fraction of `distance` covered
    pub fn progress(&self, distance: f32) -> f32 {
        if distance <= 0.0 {
            return 0.0;
        }
        self.accumulated_offset.abs() / distance
    }

    /// Velocity measured along the session direction; negative when the
    /// stream is moving backward.
    pub fn velocity_along(&self) -> f32 {
        match self.direction {
            Some(direction) => self.velocity * direction.sign(),
            None => 0.0,
        }
    }
}

/// Result of feeding one sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AccumulatorUpdate {
    /// Zero or non-finite delta
    Ignored,
    /// Below the start threshold; no session yet
    Pending,
    Started { direction: Direction, progress: f32 },
    Moved { progress: f32 },
    /// The offset restarted from zero in the new direction
    Reversed { direction: Direction, progress: f32 },
}

#[derive(Clone, Debug)]
pub struct GestureAccumulator {
    config: GestureConfig,
    source: InputSource,
    /// (timestamp, delta) samples seen before the session starts
    window: SmallVec<[(f64, f32); 16]>,
    session: Option<GestureSession>,
    velocity: f32,
    last_sample_ms: Option<f64>,
}

impl GestureAccumulator {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            source: InputSource::Continuous,
            window: SmallVec::new(),
            session: None,
            velocity: 0.0,
            last_sample_ms: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn transition_distance(&self) -> f32 {
        self.config.transition_distance
    }

    /// Update the flip distance, e.g. after a viewport resize.
    /// Non-positive values are ignored.
    pub fn set_transition_distance(&mut self, distance: f32) {
        if distance > 0.0 && distance.is_finite() {
            self.config.transition_distance = distance;
        }
    }

    /// Source recorded on the next session
    pub fn set_source(&mut self, source: InputSource) {
        self.source = source;
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Progress of the running session, clamped to the overscroll ceiling
    pub fn progress(&self) -> Option<f32> {
        self.session.as_ref().map(|session| {
            session
                .progress(self.config.transition_distance)
                .clamp(0.0, self.config.max_overscroll_ratio)
        })
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Feed one signed delta
    pub fn push(&mut self, delta: f32, timestamp_ms: f64) -> AccumulatorUpdate {
        if !delta.is_finite() || delta == 0.0 {
            return AccumulatorUpdate::Ignored;
        }

        let reversal = matches!(
            (&self.session, Direction::from_delta(delta)),
            (Some(session), Some(direction)) if session.direction != Some(direction)
        );
        if reversal {
            self.velocity = delta / (FRAME_MS / 1000.0);
        } else {
            self.sample_velocity(delta, timestamp_ms);
        }
        self.last_sample_ms = Some(timestamp_ms);

        let limit = self.config.transition_distance * self.config.max_overscroll_ratio;
        let distance = self.config.transition_distance;
        let velocity = self.velocity;

        if self.session.is_none() {
            return self.push_pending(delta, timestamp_ms);
        }
        let Some(session) = self.session.as_mut() else {
            return AccumulatorUpdate::Ignored;
        };

        session.velocity = velocity;
        session.last_sample_ms = timestamp_ms;
        session.needs_publish = true;

        if reversal {
            let direction = Direction::from_delta(delta).unwrap_or(Direction::Next);
            session.direction = Some(direction);
            session.accumulated_offset = delta.clamp(-limit, limit);
            let progress = session.progress(distance);
            tracing::debug!("gesture reversed to {:?}", direction);
            return AccumulatorUpdate::Reversed {
                direction,
                progress,
            };
        }

        session.accumulated_offset = (session.accumulated_offset + delta).clamp(-limit, limit);
        let progress = session.progress(distance);
        tracing::trace!(
            "gesture offset={:.1} velocity={:.1} progress={:.3}",
            session.accumulated_offset,
            session.velocity,
            progress
        );
        AccumulatorUpdate::Moved { progress }
    }

    fn push_pending(&mut self, delta: f32, timestamp_ms: f64) -> AccumulatorUpdate {
        let window_ms = self.config.start_window_ms as f64;
        self.window.retain(|(t, _)| timestamp_ms - *t <= window_ms);
        self.window.push((timestamp_ms, delta));

        let sum: f32 = self.window.iter().map(|(_, d)| d).sum();
        if sum.abs() < self.config.start_threshold {
            return AccumulatorUpdate::Pending;
        }
        let Some(direction) = Direction::from_delta(sum) else {
            return AccumulatorUpdate::Pending;
        };

        let limit = self.config.transition_distance * self.config.max_overscroll_ratio;
        let started_at_ms = self.window.first().map_or(timestamp_ms, |(t, _)| *t);
        self.window.clear();

        let session = GestureSession {
            source: self.source,
            direction: Some(direction),
            accumulated_offset: sum.clamp(-limit, limit),
            velocity: self.velocity,
            phase: GesturePhase::Dragging,
            started_at_ms,
            last_sample_ms: timestamp_ms,
            needs_publish: true,
        };
        let progress = session.progress(self.config.transition_distance);
        tracing::debug!(
            "gesture started {:?} ({:?}) offset={:.1}",
            direction,
            session.source,
            session.accumulated_offset
        );
        self.session = Some(session);
        AccumulatorUpdate::Started {
            direction,
            progress,
        }
    }

    fn sample_velocity(&mut self, delta: f32, timestamp_ms: f64) {
        let gap_ms = self.last_sample_ms.map(|last| (timestamp_ms - last) as f32);
        match gap_ms {
            Some(gap) if gap <= self.config.velocity_window_ms => {
                let dt_s = gap.max(self.config.min_dt_ms) / 1000.0;
                let instant = delta / dt_s;
                let alpha = self.config.velocity_smoothing;
                self.velocity += (instant - self.velocity) * alpha;
            }
            _ => {
                self.velocity = delta / (FRAME_MS / 1000.0);
            }
        }
    }

    /// Latest progress if it changed since the last call
    pub fn take_publish(&mut self) -> Option<f32> {
        let max = self.config.max_overscroll_ratio;
        let distance = self.config.transition_distance;
        let session = self.session.as_mut()?;
        if !session.needs_publish {
            return None;
        }
        session.needs_publish = false;
        Some(session.progress(distance).clamp(0.0, max))
    }

    /// End the stream and hand the session to the caller
    pub fn finish(&mut self) -> Option<GestureSession> {
        self.clear_tracking();
        self.session.take()
    }

    /// Drop any session and pending samples
    pub fn reset(&mut self) {
        self.clear_tracking();
        self.session = None;
    }

    fn clear_tracking(&mut self) {
        self.window.clear();
        self.velocity = 0.0;
        self.last_sample_ms = None;
    }
}

impl Default for GestureAccumulator {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
