//! flipstack Gesture Pipeline
//!
//! Turns raw wheel and touch deltas into section-flip decisions:
//!
//! 1. [`InputClassifier`] labels a stream coarse (wheel notches) or continuous
//!    (trackpad, touch), once per session.
//! 2. [`GestureAccumulator`] suppresses stray starts, tracks a signed offset and
//!    a smoothed velocity, and restarts on reversal.
//! 3. [`DecisionEngine`] waits for the stream to go quiet and decides whether
//!    the gesture commits or rolls back.

pub mod accumulator;
pub mod classifier;
pub mod config;
pub mod decision;

pub use accumulator::{AccumulatorUpdate, GestureAccumulator, GesturePhase, GestureSession};
pub use classifier::InputClassifier;
pub use config::{ClassifierConfig, DecisionConfig, GestureConfig};
pub use decision::{Decision, DecisionEngine, Outcome};
