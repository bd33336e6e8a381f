//! Commit/rollback decisions
//!
//! Continuous streams have no explicit "end" event, so a session is finalized
//! once input has been quiet for `idle_timeout_ms`. The engine only decides;
//! animating the outcome is the section stack's job.

use flipstack_core::{Deadline, Direction};

use crate::accumulator::{GestureAccumulator, GesturePhase, GestureSession};
use crate::config::DecisionConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Commit,
    Rollback,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    pub direction: Direction,
    /// Progress at the stop point, clamped to [0, 1]
    pub progress: f32,
    /// Velocity along `direction` at the stop point
    pub velocity: f32,
}

impl Decision {
    pub fn is_commit(&self) -> bool {
        self.outcome == Outcome::Commit
    }
}

#[derive(Clone, Debug)]
pub struct DecisionEngine {
    config: DecisionConfig,
    idle: Deadline,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            idle: Deadline::new(),
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Restart the idle timer
    pub fn note_input(&mut self, now_ms: f64) {
        self.idle.arm(now_ms, self.config.idle_timeout_ms as f64);
    }

    pub fn is_pending(&self) -> bool {
        self.idle.is_armed()
    }

    pub fn cancel(&mut self) {
        self.idle.cancel();
    }

    /// Finalize the accumulator's session if the idle timer has expired.
    ///
    /// Returns `None` while the timer is pending, or when it fires with no
    /// session (sub-threshold jitter).
    pub fn poll(&mut self, now_ms: f64, accumulator: &mut GestureAccumulator) -> Option<Decision> {
        if !self.idle.fire(now_ms) {
            return None;
        }
        let distance = accumulator.transition_distance();
        let mut session = accumulator.finish()?;
        self.finalize(&mut session, distance)
    }

    /// Decide the outcome of a finished session
    pub fn finalize(&self, session: &mut GestureSession, distance: f32) -> Option<Decision> {
        let direction = session.direction?;
        let progress = session.progress(distance).clamp(0.0, 1.0);
        let velocity = session.velocity_along();
        let outcome = self.decide(progress, velocity);

        session.phase = match outcome {
            Outcome::Commit => GesturePhase::SnappingForward,
            Outcome::Rollback => GesturePhase::SnappingBack,
        };
        tracing::debug!(
            "gesture {:?} {:?} at progress={:.3} velocity={:.1}",
            outcome,
            direction,
            progress,
            velocity
        );
        Some(Decision {
            outcome,
            direction,
            progress,
            velocity,
        })
    }

    /// Commit iff far enough, or fast enough along the gesture
    pub fn decide(&self, progress: f32, velocity_along: f32) -> Outcome {
        if progress >= self.config.snap_threshold
            || velocity_along > self.config.fast_flick_velocity
        {
            Outcome::Commit
        } else {
            Outcome::Rollback
        }
    }

    /// One wheel notch. Coarse input commits immediately.
    pub fn coarse(&self, delta: f32) -> Option<Decision> {
        if delta.abs() < self.config.min_coarse_delta {
            return None;
        }
        let direction = Direction::from_delta(delta)?;
        Some(Decision {
            outcome: Outcome::Commit,
            direction,
            progress: 0.0,
            velocity: 0.0,
        })
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}
