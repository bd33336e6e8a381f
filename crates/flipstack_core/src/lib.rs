//! flipstack Core Runtime
//!
//! Foundational primitives shared by the gesture, physics and section-stack
//! crates:
//!
//! - **Input Events**: Platform-agnostic wheel, touch and key events
//! - **State Machines**: Enum-driven transition tables with edge history
//! - **Frame Scheduling**: A tick source plus a subscriber list
//! - **Deadlines**: Restartable, cancel-safe one-shot timers
//! - **Render Sync**: Per-tick coalescing of continuous updates
//!
//! # Example
//!
//! ```rust
//! use flipstack_core::render_sync::RenderSync;
//!
//! let mut sync = RenderSync::new();
//! sync.push(0.25f32);
//! sync.push(0.30f32);
//!
//! // Only the latest value survives until the next frame.
//! assert_eq!(sync.flush(), Some(0.30));
//! assert_eq!(sync.flush(), None);
//! ```

pub mod error;
pub mod events;
pub mod fsm;
pub mod render_sync;
pub mod scheduler;
pub mod timer;

pub use error::ConfigError;
pub use events::{Direction, InputEvent, InputSource, KeyBindings, KeyCode, NavCommand};
pub use fsm::{Machine, StateTransitions};
pub use render_sync::RenderSync;
pub use scheduler::{FixedTimestep, FrameScheduler, FrameSubscriber, FrameTick, SubscriberId};
pub use timer::Deadline;
