//! Eased fixed-duration interpolation
//!
//! Committed and rolled-back section transitions run as tweens from wherever
//! the gesture stopped to the resting position.

use crate::easing::Easing;

/// A tween between two values
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration_ms: f32,
    elapsed_ms: f32,
    easing: Easing,
    playing: bool,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration_ms: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            elapsed_ms: 0.0,
            easing,
            playing: true,
        }
    }

    /// Tween whose duration scales with the distance left to cover.
    ///
    /// A full-distance move takes `full_duration_ms`; shorter remainders take
    /// proportionally less, but never under `min_duration_ms`. Gesture
    /// completions use this so entry progress never changes the feel of the
    /// final approach.
    pub fn proportional(
        from: f32,
        to: f32,
        full_duration_ms: f32,
        min_duration_ms: f32,
        easing: Easing,
    ) -> Self {
        let distance = (to - from).abs().min(1.0);
        let duration = (full_duration_ms * distance).max(min_duration_ms);
        Self::new(from, to, duration, easing)
    }

    pub fn from(&self) -> f32 {
        self.from
    }

    pub fn to(&self) -> f32 {
        self.to
    }

    pub fn duration_ms(&self) -> f32 {
        self.duration_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Normalized time in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Current interpolated value
    pub fn value(&self) -> f32 {
        if !self.playing {
            return self.to;
        }
        let eased = self.easing.apply(self.progress());
        self.from + (self.to - self.from) * eased
    }

    /// Advance by `dt_ms`. Returns true on the tick the tween finishes.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        if !self.playing {
            return false;
        }
        self.elapsed_ms += dt_ms.max(0.0);
        if self.elapsed_ms >= self.duration_ms {
            self.elapsed_ms = self.duration_ms;
            self.playing = false;
            return true;
        }
        false
    }

    /// Stop where it is
    pub fn stop(&mut self) {
        self.playing = false;
    }
}
