//! Debug snapshots

use flipstack_animation::PhysicsSnapshot;
use flipstack_core::{Direction, InputSource};
use flipstack_gesture::{GesturePhase, GestureSession};
use serde::Serialize;

use crate::stack::StackSnapshot;

/// Running counters kept by the navigation engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub frames: u64,
    pub inputs: u64,
    pub ignored_inputs: u64,
    pub coarse_flips: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

/// The live gesture session, if any
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GestureDebug {
    pub source: InputSource,
    pub direction: Option<Direction>,
    pub accumulated_offset: f32,
    pub velocity: f32,
    pub progress: f32,
    pub phase: GesturePhase,
}

impl GestureDebug {
    pub fn new(session: &GestureSession, distance: f32) -> Self {
        Self {
            source: session.source,
            direction: session.direction,
            accumulated_offset: session.accumulated_offset,
            velocity: session.velocity,
            progress: session.progress(distance),
            phase: session.phase,
        }
    }
}

/// Everything a debugging overlay or a headless report needs
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub now_ms: f64,
    pub stack: StackSnapshot,
    pub physics: PhysicsSnapshot,
    pub gesture: Option<GestureDebug>,
    pub classification: Option<InputSource>,
    pub scroll_claimed: bool,
    pub touch_active: bool,
    pub render_sync_pending: bool,
    pub render_sync_flushes: u64,
    pub render_sync_dropped: u64,
    pub stats: EngineStats,
}

impl DebugSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
