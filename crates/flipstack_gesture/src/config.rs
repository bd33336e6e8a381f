//! Gesture pipeline tuning
//!
//! Distances are in host units (CSS pixels on the web), times in
//! milliseconds, velocities in distance per second.

use flipstack_core::error::{ensure_positive, ensure_range, Result};
use serde::{Deserialize, Serialize};

/// Coarse/continuous classification cutoffs
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Deltas smaller than this come from a continuous device
    pub small_delta_cutoff: f32,
    /// Events closer together than this come from a continuous device
    pub streaming_gap_ms: f32,
    /// A pause longer than this starts a new classification
    pub reclassify_pause_ms: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            small_delta_cutoff: 40.0,
            streaming_gap_ms: 20.0,
            reclassify_pause_ms: 1_000.0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("classifier.small_delta_cutoff", self.small_delta_cutoff)?;
        ensure_positive("classifier.streaming_gap_ms", self.streaming_gap_ms)?;
        ensure_positive("classifier.reclassify_pause_ms", self.reclassify_pause_ms)?;
        Ok(())
    }
}

/// Accumulator tuning
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Distance of one full section flip (normally the viewport height)
    pub transition_distance: f32,
    /// Movement needed inside `start_window_ms` before a gesture starts
    pub start_threshold: f32,
    pub start_window_ms: f32,
    /// Consecutive samples further apart than this reseed the velocity
    pub velocity_window_ms: f32,
    /// EMA weight of the newest velocity sample
    pub velocity_smoothing: f32,
    /// Floor for the time between samples
    pub min_dt_ms: f32,
    /// Offset clamp as a multiple of `transition_distance`
    pub max_overscroll_ratio: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            transition_distance: 800.0,
            start_threshold: 30.0,
            start_window_ms: 150.0,
            velocity_window_ms: 100.0,
            velocity_smoothing: 0.3,
            min_dt_ms: 1.0,
            max_overscroll_ratio: 1.1,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("gesture.transition_distance", self.transition_distance)?;
        ensure_positive("gesture.start_threshold", self.start_threshold)?;
        ensure_positive("gesture.start_window_ms", self.start_window_ms)?;
        ensure_positive("gesture.velocity_window_ms", self.velocity_window_ms)?;
        ensure_range("gesture.velocity_smoothing", self.velocity_smoothing, 0.01, 1.0)?;
        ensure_positive("gesture.min_dt_ms", self.min_dt_ms)?;
        ensure_range("gesture.max_overscroll_ratio", self.max_overscroll_ratio, 1.0, 2.0)?;
        Ok(())
    }
}

/// Commit/rollback policy
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Quiet period after the last sample before a gesture is finalized
    pub idle_timeout_ms: f32,
    /// Progress at or above which a gesture commits
    pub snap_threshold: f32,
    /// Velocity along the gesture above which it commits regardless of progress
    pub fast_flick_velocity: f32,
    /// Smallest wheel notch that triggers a coarse flip
    pub min_coarse_delta: f32,
    /// Wheel input is ignored this long after a wheel-driven drawer toggle
    pub drawer_debounce_ms: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 80.0,
            snap_threshold: 0.6,
            fast_flick_velocity: 1_200.0,
            min_coarse_delta: 1.0,
            drawer_debounce_ms: 400.0,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("decision.idle_timeout_ms", self.idle_timeout_ms)?;
        ensure_range("decision.snap_threshold", self.snap_threshold, 0.0, 1.0)?;
        ensure_positive("decision.fast_flick_velocity", self.fast_flick_velocity)?;
        ensure_positive("decision.min_coarse_delta", self.min_coarse_delta)?;
        ensure_positive("decision.drawer_debounce_ms", self.drawer_debounce_ms)?;
        Ok(())
    }
}
