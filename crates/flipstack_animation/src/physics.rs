//! Gesture physics engine
//!
//! A device-agnostic simulation of a single section flip. Input samples move a
//! progress value between 0 (resting on the current section) and 1 (resting on
//! the adjacent one). On release the simulation coasts on its momentum, then a
//! critically-damped spring snaps it to whichever boundary is nearer.
//!
//! ```text
//!   Idle ──input──▶ Interacting ──release──▶ Coasting ──spent──▶ Snapping ──converged──▶ Idle
//!                        │                                           ▲
//!                        └──────────── release (slow) ───────────────┘
//! ```
//!
//! Nothing outside this module assigns the state. Observers either subscribe
//! for [`PhysicsEvent`]s or read an immutable [`PhysicsSnapshot`].
//!
//! The engine does not care where samples come from: a touch drag, a trackpad
//! stream, or a button that injects a full-distance sample and releases.

use flipstack_core::error::{ensure_positive, ensure_range, Result};
use flipstack_core::fsm::{Machine, StateTransitions};
use flipstack_core::{Direction, InputSource};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::spring::{Spring, SpringConfig};

/// Reference frame length for per-frame constants (60 Hz)
const FRAME_MS: f32 = 1000.0 / 60.0;

/// Largest spring sub-step; long frames are split so the spring stays stable
const MAX_SPRING_STEP_S: f32 = 1.0 / 120.0;

/// Raw positions beyond this are meaningless and only risk overflow
const RAW_LIMIT: f32 = 1_000.0;

new_key_type! {
    /// Handle returned by [`PhysicsEngine::subscribe`]
    pub struct ListenerId;
}

// ============================================================================
// State machine
// ============================================================================

/// Simulation phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsState {
    #[default]
    Idle,
    /// Driven directly by input samples
    Interacting,
    /// Released with momentum; velocity decays each tick
    Coasting,
    /// Spring converging on 0 or 1
    Snapping,
}

/// Internal events driving [`PhysicsState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsSignal {
    Input,
    /// Released with velocity above the floor
    ReleaseMoving,
    /// Released (nearly) at rest
    ReleaseResting,
    /// Momentum spent or bounds crossed while coasting
    Spent,
    Converged,
    Reset,
}

impl StateTransitions for PhysicsState {
    type Event = PhysicsSignal;

    fn on_event(&self, event: PhysicsSignal) -> Option<Self> {
        use PhysicsSignal::*;
        use PhysicsState::*;

        match (self, event) {
            (Idle, Input) => Some(Interacting),
            (Interacting, Input) => Some(Interacting),
            (Interacting, ReleaseMoving) => Some(Coasting),
            (Interacting, ReleaseResting) => Some(Snapping),
            (Coasting, Spent) => Some(Snapping),
            (Snapping, Converged) => Some(Idle),
            (Interacting | Coasting | Snapping, Reset) => Some(Idle),
            _ => None,
        }
    }
}

impl PhysicsState {
    pub fn is_active(&self) -> bool {
        !matches!(self, PhysicsState::Idle)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tuning for the physics engine
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Floor for the time between samples (ms); zero or negative gaps are clamped to it
    pub min_dt_ms: f32,
    /// EMA weight of the newest instantaneous velocity (0..=1)
    pub velocity_smoothing: f32,
    /// Below this speed (progress/s) momentum is considered spent
    pub velocity_floor: f32,
    /// Velocity multiplier per 60 Hz frame while coasting
    pub coast_decay: f32,
    /// Velocity older than this at release (ms) is stale and treated as zero
    pub velocity_window_ms: f32,
    /// Maximum overscroll past either bound, in progress units
    pub overscroll_ceiling: f32,
    /// Spring used for the final snap
    pub spring: SpringConfig,
    /// Converged when |progress - target| falls under this...
    pub position_epsilon: f32,
    /// ...and |velocity| under this
    pub velocity_epsilon: f32,
    /// Hard upper bound on a snap; the spring is settled when it is exceeded
    pub max_settle_ms: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            min_dt_ms: 1.0,
            velocity_smoothing: 0.3,
            velocity_floor: 0.05,
            coast_decay: 0.92,
            velocity_window_ms: 100.0,
            overscroll_ceiling: 0.15,
            spring: SpringConfig::snap(),
            position_epsilon: 1e-3,
            velocity_epsilon: 1e-2,
            max_settle_ms: 2_000.0,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("physics.min_dt_ms", self.min_dt_ms)?;
        ensure_range("physics.velocity_smoothing", self.velocity_smoothing, 0.01, 1.0)?;
        ensure_positive("physics.velocity_floor", self.velocity_floor)?;
        ensure_range("physics.coast_decay", self.coast_decay, 0.0, 0.999)?;
        ensure_positive("physics.velocity_window_ms", self.velocity_window_ms)?;
        ensure_range("physics.overscroll_ceiling", self.overscroll_ceiling, 0.0, 1.0)?;
        ensure_positive("physics.spring.stiffness", self.spring.stiffness)?;
        ensure_positive("physics.spring.mass", self.spring.mass)?;
        ensure_positive("physics.spring.damping", self.spring.damping)?;
        ensure_positive("physics.position_epsilon", self.position_epsilon)?;
        ensure_positive("physics.velocity_epsilon", self.velocity_epsilon)?;
        ensure_positive("physics.max_settle_ms", self.max_settle_ms)?;
        Ok(())
    }
}

// ============================================================================
// Events and snapshots
// ============================================================================

/// Notifications emitted by the engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicsEvent {
    /// Exactly once per state edge
    StateChanged { from: PhysicsState, to: PhysicsState },
    /// At most once per tick
    Progress(f32),
    /// Settled on 1
    Committed { direction: Option<Direction> },
    /// Settled on 0
    RolledBack { direction: Option<Direction> },
}

/// Immutable view of the simulation for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhysicsSnapshot {
    pub state: PhysicsState,
    pub progress: f32,
    pub velocity: f32,
    pub direction: Option<Direction>,
    pub source: Option<InputSource>,
    pub target: Option<f32>,
}

type Listener = Box<dyn FnMut(&PhysicsEvent)>;

// ============================================================================
// Engine
// ============================================================================

/// The physics simulation for one section stack
pub struct PhysicsEngine {
    config: PhysicsConfig,
    machine: Machine<PhysicsState>,
    /// Position before rubber-band mapping
    raw: f32,
    progress: f32,
    /// Progress units per second; positive moves toward 1
    velocity: f32,
    direction: Option<Direction>,
    source: Option<InputSource>,
    spring: Option<Spring>,
    last_input_ms: Option<f64>,
    settle_elapsed_ms: f32,
    progress_dirty: bool,
    listeners: SlotMap<ListenerId, Listener>,
    outbox: SmallVec<[PhysicsEvent; 4]>,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            machine: Machine::new(PhysicsState::Idle),
            raw: 0.0,
            progress: 0.0,
            velocity: 0.0,
            direction: None,
            source: None,
            spring: None,
            last_input_ms: None,
            settle_elapsed_ms: 0.0,
            progress_dirty: false,
            listeners: SlotMap::with_key(),
            outbox: SmallVec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn state(&self) -> PhysicsState {
        self.machine.state()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Boundary being sought while snapping
    pub fn target(&self) -> Option<f32> {
        self.spring.map(|s| s.target())
    }

    pub fn is_active(&self) -> bool {
        self.machine.state().is_active()
    }

    pub fn snapshot(&self) -> PhysicsSnapshot {
        PhysicsSnapshot {
            state: self.state(),
            progress: self.progress,
            velocity: self.velocity,
            direction: self.direction,
            source: self.source,
            target: self.target(),
        }
    }

    /// Register a listener for every emitted event
    pub fn subscribe<F: FnMut(&PhysicsEvent) + 'static>(&mut self, listener: F) -> ListenerId {
        self.listeners.insert(Box::new(listener))
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }

    /// Feed one input sample.
    ///
    /// `delta` is in progress units (distance / transition distance). It
    /// advances progress when `direction` matches the gesture's direction and
    /// retreats otherwise; the first sample of a gesture fixes that direction.
    ///
    /// Returns false when the sample was ignored: the engine is coasting or
    /// snapping (call [`reset`](Self::reset) to pre-empt it) or the delta is
    /// not finite.
    pub fn input(
        &mut self,
        delta: f32,
        direction: Direction,
        source: InputSource,
        timestamp_ms: f64,
    ) -> bool {
        if !delta.is_finite() || !self.machine.can_send(PhysicsSignal::Input) {
            return false;
        }

        if self.machine.is_in(PhysicsState::Idle) {
            self.clear_motion();
            self.direction = Some(direction);
            self.source = Some(source);
        }
        self.transition(PhysicsSignal::Input);

        let signed = if Some(direction) == self.direction {
            delta
        } else {
            -delta
        };

        let dt_ms = match self.last_input_ms {
            Some(last) => ((timestamp_ms - last) as f32).max(self.config.min_dt_ms),
            None => FRAME_MS,
        };
        self.last_input_ms = Some(timestamp_ms);
        let dt = dt_ms / 1000.0;

        // Semi-implicit Euler: velocity first, then position
        let instant = signed / dt;
        self.velocity += (instant - self.velocity) * self.config.velocity_smoothing;
        self.raw = (self.raw + instant * dt).clamp(-RAW_LIMIT, RAW_LIMIT);
        self.progress = self.rubber_band(self.raw);
        self.progress_dirty = true;

        tracing::trace!(
            "physics input delta={:.4} progress={:.4} velocity={:.3}",
            signed,
            self.progress,
            self.velocity
        );
        true
    }

    /// End the interaction at host time `now_ms` and let momentum and the
    /// snap spring take over.
    ///
    /// A release more than `velocity_window_ms` after the last sample starts
    /// at rest: holding still before lifting is not a flick.
    ///
    /// Only meaningful while interacting; otherwise a no-op returning false.
    pub fn release(&mut self, now_ms: f64) -> bool {
        if !self.machine.is_in(PhysicsState::Interacting) {
            return false;
        }

        if let Some(last) = self.last_input_ms {
            let held_ms = (now_ms - last) as f32;
            if held_ms > self.config.velocity_window_ms {
                tracing::trace!("physics release after {:.0}ms hold, velocity dropped", held_ms);
                self.velocity = 0.0;
            }
        }

        let out_of_bounds = !(0.0..=1.0).contains(&self.progress);
        if self.velocity.abs() > self.config.velocity_floor && !out_of_bounds {
            self.transition(PhysicsSignal::ReleaseMoving);
        } else {
            self.transition(PhysicsSignal::ReleaseResting);
            self.start_snap();
        }
        true
    }

    /// Force the engine back to idle and zero all simulation variables.
    ///
    /// Fires no commit or rollback. Safe to call in any state.
    pub fn reset(&mut self) {
        self.transition(PhysicsSignal::Reset);
        self.clear_motion();
        self.direction = None;
        self.source = None;
        self.progress_dirty = false;
    }

    /// Advance the simulation by `dt_ms`.
    ///
    /// Returns every event emitted since the previous tick, including edges
    /// caused by [`input`](Self::input) and [`release`](Self::release).
    pub fn tick(&mut self, dt_ms: f32) -> SmallVec<[PhysicsEvent; 4]> {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };

        match self.machine.state() {
            PhysicsState::Idle | PhysicsState::Interacting => {}
            PhysicsState::Coasting => self.coast(dt_ms),
            PhysicsState::Snapping => self.snap(dt_ms),
        }

        if self.progress_dirty {
            self.progress_dirty = false;
            self.emit(PhysicsEvent::Progress(self.progress));
        }

        std::mem::take(&mut self.outbox)
    }

    fn coast(&mut self, dt_ms: f32) {
        let dt = dt_ms / 1000.0;
        self.raw = (self.raw + self.velocity * dt).clamp(-RAW_LIMIT, RAW_LIMIT);
        self.velocity *= self.config.coast_decay.powf(dt_ms / FRAME_MS);
        self.progress = self.rubber_band(self.raw);
        self.progress_dirty = true;

        let spent = self.velocity.abs() < self.config.velocity_floor;
        let out_of_bounds = !(0.0..=1.0).contains(&self.progress);
        if spent || out_of_bounds {
            self.transition(PhysicsSignal::Spent);
            self.start_snap();
        }
    }

    fn snap(&mut self, dt_ms: f32) {
        let Some(mut spring) = self.spring else {
            // Snapping always carries a spring; recover by settling in place
            self.converge(self.nearest_boundary());
            return;
        };

        let mut remaining = dt_ms / 1000.0;
        while remaining > 0.0 {
            let step = remaining.min(MAX_SPRING_STEP_S);
            spring.step(step);
            remaining -= step;
        }
        self.settle_elapsed_ms += dt_ms;
        self.spring = Some(spring);
        self.progress = spring.value();
        self.raw = self.progress;
        self.velocity = spring.velocity();
        self.progress_dirty = true;

        let settled =
            spring.is_settled_within(self.config.position_epsilon, self.config.velocity_epsilon);
        if settled || self.settle_elapsed_ms >= self.config.max_settle_ms {
            if !settled {
                tracing::warn!(
                    "physics snap exceeded {}ms, forcing settle at {:.4}",
                    self.config.max_settle_ms,
                    self.progress
                );
            }
            self.converge(spring.target());
        }
    }

    fn start_snap(&mut self) {
        let target = self.nearest_boundary();
        let mut spring =
            Spring::new(self.config.spring, self.progress).with_velocity(self.velocity);
        spring.set_target(target);
        self.spring = Some(spring);
        self.settle_elapsed_ms = 0.0;
        self.raw = self.progress;
        tracing::debug!(
            "physics snapping from {:.3} toward {} (v={:.3})",
            self.progress,
            target,
            self.velocity
        );
    }

    fn converge(&mut self, target: f32) {
        self.progress = target;
        self.raw = target;
        self.velocity = 0.0;
        self.spring = None;
        self.last_input_ms = None;

        // Progress lands before the edge so observers see the exact boundary first
        self.progress_dirty = false;
        self.emit(PhysicsEvent::Progress(target));
        self.transition(PhysicsSignal::Converged);

        let direction = self.direction;
        if target >= 1.0 {
            tracing::debug!("physics settled: commit {:?}", direction);
            self.emit(PhysicsEvent::Committed { direction });
        } else {
            tracing::debug!("physics settled: rollback {:?}", direction);
            self.emit(PhysicsEvent::RolledBack { direction });
        }
    }

    fn nearest_boundary(&self) -> f32 {
        if self.progress >= 0.5 {
            1.0
        } else {
            0.0
        }
    }

    /// Map a raw position to displayed progress. Inside `[0, 1]` the mapping is
    /// the identity; outside it approaches `±overscroll_ceiling` asymptotically.
    fn rubber_band(&self, raw: f32) -> f32 {
        let ceiling = self.config.overscroll_ceiling;
        if ceiling <= 0.0 {
            return raw.clamp(0.0, 1.0);
        }
        if raw > 1.0 {
            1.0 + ceiling * (1.0 - (-(raw - 1.0) / ceiling).exp())
        } else if raw < 0.0 {
            -ceiling * (1.0 - (raw / ceiling).exp())
        } else {
            raw
        }
    }

    fn clear_motion(&mut self) {
        self.raw = 0.0;
        self.progress = 0.0;
        self.velocity = 0.0;
        self.spring = None;
        self.last_input_ms = None;
        self.settle_elapsed_ms = 0.0;
    }

    fn transition(&mut self, signal: PhysicsSignal) {
        if let Some((from, to)) = self.machine.send(signal) {
            tracing::debug!("physics {:?} -> {:?}", from, to);
            self.emit(PhysicsEvent::StateChanged { from, to });
        }
    }

    fn emit(&mut self, event: PhysicsEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        self.outbox.push(event);
    }
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1000.0 / 60.0;

    /// Drag to `progress` in `steps` samples spaced `gap_ms` apart, starting at t=0
    fn drag(engine: &mut PhysicsEngine, progress: f32, steps: u32, gap_ms: f64) -> f64 {
        let delta = progress / steps as f32;
        let mut t = 0.0;
        for _ in 0..steps {
            engine.input(delta, Direction::Next, InputSource::Continuous, t);
            t += gap_ms;
        }
        t
    }

    fn run_to_idle(engine: &mut PhysicsEngine, max_ticks: u32) -> (u32, Vec<PhysicsEvent>) {
        let mut events = Vec::new();
        for tick in 1..=max_ticks {
            events.extend(engine.tick(DT));
            if !engine.is_active() {
                return (tick, events);
            }
        }
        (max_ticks, events)
    }

    #[test]
    fn test_input_enters_interacting() {
        let mut engine = PhysicsEngine::default();
        assert!(engine.input(0.1, Direction::Next, InputSource::Continuous, 0.0));
        assert_eq!(engine.state(), PhysicsState::Interacting);
        assert!((engine.progress() - 0.1).abs() < 1e-6);

        let events = engine.tick(DT);
        assert_eq!(
            events[0],
            PhysicsEvent::StateChanged {
                from: PhysicsState::Idle,
                to: PhysicsState::Interacting
            }
        );
        assert_eq!(events[1], PhysicsEvent::Progress(engine.progress()));
    }

    #[test]
    fn test_opposite_direction_retreats() {
        let mut engine = PhysicsEngine::default();
        engine.input(0.4, Direction::Next, InputSource::Continuous, 0.0);
        engine.input(0.1, Direction::Prev, InputSource::Continuous, 16.0);
        assert!((engine.progress() - 0.3).abs() < 1e-5);
        assert_eq!(engine.direction(), Some(Direction::Next));
    }

    #[test]
    fn test_zero_dt_is_clamped() {
        let mut engine = PhysicsEngine::default();
        engine.input(0.1, Direction::Next, InputSource::Continuous, 10.0);
        engine.input(0.1, Direction::Next, InputSource::Continuous, 10.0);
        engine.input(0.1, Direction::Next, InputSource::Continuous, 5.0);
        assert!(engine.velocity().is_finite());
        assert!((engine.progress() - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_non_finite_delta_ignored() {
        let mut engine = PhysicsEngine::default();
        assert!(!engine.input(f32::NAN, Direction::Next, InputSource::Continuous, 0.0));
        assert_eq!(engine.state(), PhysicsState::Idle);
    }

    #[test]
    fn test_rubber_band_is_bounded() {
        let mut engine = PhysicsEngine::default();
        let ceiling = engine.config().overscroll_ceiling;
        let mut t = 0.0;
        engine.input(1.0, Direction::Next, InputSource::Continuous, t);
        let mut previous = engine.progress();
        for i in 0..5_000 {
            t += 16.0;
            let delta = 0.05 * (1 + i % 50) as f32;
            engine.input(delta, Direction::Next, InputSource::Continuous, t);
            assert!(engine.progress() <= 1.0 + ceiling + 1e-6);
            assert!(engine.progress() >= previous - 1e-6);
            previous = engine.progress();
        }
        // Resistance grows: very large input still lands short of the ceiling
        assert!(engine.progress() > 1.0);
    }

    #[test]
    fn test_rubber_band_below_zero_is_bounded() {
        let mut engine = PhysicsEngine::default();
        let ceiling = engine.config().overscroll_ceiling;
        for i in 0..200 {
            engine.input(-0.5, Direction::Next, InputSource::Continuous, i as f64 * 16.0);
        }
        assert!(engine.progress() >= -ceiling - 1e-6);
        assert!(engine.progress() < 0.0);
    }

    #[test]
    fn test_slow_release_snaps_back() {
        let mut engine = PhysicsEngine::default();
        // Slow drag: tiny deltas far apart keep velocity under the floor
        let t = drag(&mut engine, 0.3, 30, 1_000.0);
        assert!(engine.velocity().abs() <= engine.config().velocity_floor);

        assert!(engine.release(t));
        assert_eq!(engine.state(), PhysicsState::Snapping);
        assert_eq!(engine.target(), Some(0.0));

        let (_, events) = run_to_idle(&mut engine, 600);
        assert_eq!(engine.state(), PhysicsState::Idle);
        assert_eq!(engine.progress(), 0.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, PhysicsEvent::RolledBack { .. })));
    }

    #[test]
    fn test_flick_coasts_then_commits() {
        let mut engine = PhysicsEngine::default();
        // Fast drag to 0.35 in 5 frames
        let t = drag(&mut engine, 0.35, 5, 16.0);
        assert!(engine.velocity() > 1.0);

        engine.release(t);
        assert_eq!(engine.state(), PhysicsState::Coasting);

        let (_, events) = run_to_idle(&mut engine, 600);
        assert_eq!(engine.progress(), 1.0);
        assert!(events.contains(&PhysicsEvent::Committed {
            direction: Some(Direction::Next)
        }));
        assert!(events.contains(&PhysicsEvent::StateChanged {
            from: PhysicsState::Coasting,
            to: PhysicsState::Snapping
        }));
    }

    #[test]
    fn test_settle_terminates_exactly_on_boundary() {
        // Sweep progress and release speed; every run must end idle on 0 or 1
        for p_step in 0..=10 {
            for gap in [4.0, 16.0, 50.0, 400.0] {
                let mut engine = PhysicsEngine::default();
                let progress = p_step as f32 / 10.0;
                let t = if progress > 0.0 {
                    drag(&mut engine, progress, 4, gap)
                } else {
                    engine.input(0.0, Direction::Next, InputSource::Continuous, 0.0);
                    0.0
                };
                engine.release(t);
                // Repeated releases change nothing
                engine.release(t);
                engine.release(t + gap);

                let (ticks, _) = run_to_idle(&mut engine, 1_000);
                assert_eq!(engine.state(), PhysicsState::Idle, "p={progress} gap={gap}");
                assert!(ticks < 1_000);
                assert!(
                    engine.progress() == 0.0 || engine.progress() == 1.0,
                    "p={progress} gap={gap} ended at {}",
                    engine.progress()
                );
            }
        }
    }

    #[test]
    fn test_callbacks_fire_once_per_edge_and_settle() {
        let mut engine = PhysicsEngine::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        engine.subscribe(move |e| sink.borrow_mut().push(*e));

        let t = drag(&mut engine, 0.7, 3, 200.0);
        engine.release(t);
        let (ticks, _) = run_to_idle(&mut engine, 600);

        let log = log.borrow();
        let edges: Vec<_> = log
            .iter()
            .filter_map(|e| match e {
                PhysicsEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(edges.first(), Some(&(PhysicsState::Idle, PhysicsState::Interacting)));
        assert_eq!(edges.last(), Some(&(PhysicsState::Snapping, PhysicsState::Idle)));

        let commits = log
            .iter()
            .filter(|e| matches!(e, PhysicsEvent::Committed { .. }))
            .count();
        assert_eq!(commits, 1);

        let progress_events = log
            .iter()
            .filter(|e| matches!(e, PhysicsEvent::Progress(_)))
            .count();
        assert!(progress_events <= ticks as usize + 1);
    }

    #[test]
    fn test_release_after_hold_starts_at_rest() {
        let mut engine = PhysicsEngine::default();
        let t = drag(&mut engine, 0.3, 6, 16.0);
        assert!(engine.velocity() > engine.config().velocity_floor);

        // Finger held still for a second before lifting
        assert!(engine.release(t + 1_000.0));
        assert_eq!(engine.state(), PhysicsState::Snapping);
        assert_eq!(engine.target(), Some(0.0));

        let (_, events) = run_to_idle(&mut engine, 600);
        assert_eq!(engine.progress(), 0.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, PhysicsEvent::RolledBack { .. })));
    }

    #[test]
    fn test_input_ignored_while_snapping() {
        let mut engine = PhysicsEngine::default();
        let t = drag(&mut engine, 0.2, 20, 1_000.0);
        engine.release(t);
        assert_eq!(engine.state(), PhysicsState::Snapping);
        assert!(!engine.input(0.5, Direction::Next, InputSource::Continuous, t));
        assert_eq!(engine.state(), PhysicsState::Snapping);
    }

    #[test]
    fn test_reset_zeroes_and_skips_settle() {
        let mut engine = PhysicsEngine::default();
        let t = drag(&mut engine, 0.8, 4, 16.0);
        engine.release(t);
        engine.reset();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, PhysicsState::Idle);
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.velocity, 0.0);
        assert_eq!(snapshot.target, None);

        let events = engine.tick(DT);
        assert!(!events.iter().any(|e| matches!(
            e,
            PhysicsEvent::Committed { .. } | PhysicsEvent::RolledBack { .. }
        )));

        // Reset from idle is a no-op
        engine.reset();
        assert!(engine.tick(DT).is_empty());
    }

    #[test]
    fn test_button_driven_flip() {
        // A non-gesture caller injects one full-distance sample and releases
        let mut engine = PhysicsEngine::default();
        engine.input(1.0, Direction::Prev, InputSource::Coarse, 0.0);
        engine.release(0.0);
        let (_, events) = run_to_idle(&mut engine, 600);
        assert!(events.contains(&PhysicsEvent::Committed {
            direction: Some(Direction::Prev)
        }));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
        let bad = PhysicsConfig {
            coast_decay: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
