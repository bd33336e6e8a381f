//! flipstack Section Stack
//!
//! Full-viewport section navigation: a fixed sequence of sections plus a
//! trailing drawer, flipped by wheel, trackpad, touch, keyboard or buttons.
//!
//! # Example
//!
//! ```rust
//! use flipstack_stack::{NavigationConfig, NavigationEngine, SectionRecord, SharedMount};
//!
//! let mounts: Vec<SharedMount> = (0..3).map(|_| SharedMount::new()).collect();
//! let sections = mounts
//!     .iter()
//!     .enumerate()
//!     .map(|(i, mount)| SectionRecord::new(format!("section-{i}"), mount.clone()))
//!     .collect();
//! let drawer = SectionRecord::new("drawer", SharedMount::new());
//!
//! let mut engine = NavigationEngine::new(NavigationConfig::default(), sections, drawer).unwrap();
//! engine.go_next();
//!
//! let mut now = 0.0;
//! while engine.on_frame(now) {
//!     now += 1000.0 / 60.0;
//! }
//! assert_eq!(engine.active_index(), 1);
//! assert_eq!(mounts[1].placement().map(|p| p.offset), Some(0.0));
//! ```

pub mod config;
pub mod debug;
pub mod engine;
pub mod error;
pub mod section;
pub mod stack;

pub use config::{KeyConfig, NavigationConfig, StackConfig};
pub use debug::{DebugSnapshot, EngineStats, GestureDebug};
pub use engine::{NavigationEngine, Navigator};
pub use error::{EngineError, StackError};
pub use section::{Layer, Placement, SectionMount, SectionRecord, SharedMount};
pub use stack::{Motion, SectionStack, StackEvent, StackListenerId, StackSnapshot, StackState};
