//! Damped springs
//!
//! `force = -stiffness * (value - target) - damping * velocity`, integrated with
//! semi-implicit Euler (velocity first, then position with the new velocity).
//! Semi-implicit Euler stays stable at frame-sized steps for the stiffness
//! range used by section snapping.

use serde::{Deserialize, Serialize};

/// Spring parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub const fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Critically damped spring: fastest return without overshoot
    pub fn critical(stiffness: f32, mass: f32) -> Self {
        let mass = mass.max(f32::EPSILON);
        Self {
            stiffness,
            damping: 2.0 * (stiffness * mass).sqrt(),
            mass,
        }
    }

    /// Default snap spring for section settles
    pub fn snap() -> Self {
        Self::critical(170.0, 1.0)
    }

    /// Damping ratio (1.0 = critical)
    pub fn damping_ratio(&self) -> f32 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::snap()
    }
}

/// A one-dimensional spring
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, value: f32) -> Self {
        Self {
            config,
            value,
            velocity: 0.0,
            target: value,
        }
    }

    /// Start from a moving state (inherits velocity from a gesture)
    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let displacement = self.value - self.target;
        let force = -self.config.stiffness * displacement - self.config.damping * self.velocity;
        self.velocity += force / self.config.mass * dt;
        self.value += self.velocity * dt;
    }

    /// Both positional error and residual velocity below the given epsilons
    pub fn is_settled_within(&self, position_epsilon: f32, velocity_epsilon: f32) -> bool {
        (self.value - self.target).abs() < position_epsilon
            && self.velocity.abs() < velocity_epsilon
    }

    pub fn is_settled(&self) -> bool {
        self.is_settled_within(1e-3, 1e-2)
    }

    /// Jump to the target and stop
    pub fn settle(&mut self) {
        self.value = self.target;
        self.velocity = 0.0;
    }
}
