//! flipstack Animation System
//!
//! Spring physics, eased tweens, and the gesture physics engine.
//!
//! # Features
//!
//! - **Gesture Physics**: Input-driven simulation with rubber-band edges,
//!   momentum coasting and a critically-damped snap to the nearest section
//! - **Springs**: Semi-implicit Euler springs with stiffness, damping, mass
//! - **Tweens**: Fixed-duration eased interpolation for committed transitions

pub mod easing;
pub mod physics;
pub mod spring;
pub mod tween;

pub use easing::Easing;
pub use physics::{
    ListenerId, PhysicsConfig, PhysicsEngine, PhysicsEvent, PhysicsSnapshot, PhysicsState,
};
pub use spring::{Spring, SpringConfig};
pub use tween::Tween;
