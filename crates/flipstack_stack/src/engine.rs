//! Navigation engine
//!
//! Wires the gesture pipeline, the physics engine and the section stack to
//! host input and the frame loop.
//!
//! - Wheel notches (coarse) flip one section per notch, no tracking.
//! - Trackpad streams (continuous wheel) drive the stack through the
//!   accumulator; the decision engine settles them once the stream goes quiet.
//! - Touch drags feed the physics engine; its commit or rollback settles
//!   the stack.
//! - Keys and buttons issue commands directly.
//!
//! Input handlers only update state and arm deadlines. Everything that moves
//! happens in [`NavigationEngine::on_frame`].

use flipstack_animation::{PhysicsEngine, PhysicsEvent};
use flipstack_core::{
    Deadline, Direction, FrameSubscriber, FrameTick, InputEvent, InputSource, KeyBindings,
    NavCommand, RenderSync,
};
use flipstack_gesture::{
    AccumulatorUpdate, Decision, DecisionEngine, GestureAccumulator, InputClassifier, Outcome,
};

use crate::config::NavigationConfig;
use crate::debug::{DebugSnapshot, EngineStats, GestureDebug};
use crate::error::EngineError;
use crate::section::SectionRecord;
use crate::stack::SectionStack;

/// External router that link targets are handed to
pub trait Navigator {
    fn navigate(&mut self, route: &str);
}

#[derive(Clone, Copy, Debug)]
struct TouchTrack {
    last_y: f32,
    /// Locked once the start threshold is crossed
    direction: Option<Direction>,
}

pub struct NavigationEngine {
    config: NavigationConfig,
    bindings: KeyBindings,
    classifier: InputClassifier,
    accumulator: GestureAccumulator,
    decision: DecisionEngine,
    physics: PhysicsEngine,
    render_sync: RenderSync<f32>,
    stack: SectionStack,
    /// Wheel input is dropped until this fires after a wheel drawer toggle
    drawer_debounce: Deadline,
    /// Continuous wheel input is dropped until the stream pauses
    wheel_quiet: Deadline,
    wheel_gesture: bool,
    touch: Option<TouchTrack>,
    scroll_claimed: bool,
    last_frame_ms: Option<f64>,
    now_ms: f64,
    stats: EngineStats,
}

impl NavigationEngine {
    /// Validate `config` and build an engine resting on the first section
    pub fn new(
        config: NavigationConfig,
        sections: Vec<SectionRecord>,
        drawer: SectionRecord,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let bindings = config.keys.to_bindings()?;
        let stack = SectionStack::new(sections, drawer, config.stack)?;

        tracing::debug!(
            "navigation engine ready with {} sections",
            stack.section_count()
        );

        Ok(Self {
            bindings,
            classifier: InputClassifier::new(config.classifier),
            accumulator: GestureAccumulator::new(config.gesture),
            decision: DecisionEngine::new(config.decision),
            physics: PhysicsEngine::new(config.physics),
            render_sync: RenderSync::new(),
            stack,
            drawer_debounce: Deadline::new(),
            wheel_quiet: Deadline::new(),
            wheel_gesture: false,
            touch: None,
            scroll_claimed: false,
            last_frame_ms: None,
            now_ms: 0.0,
            stats: EngineStats::default(),
            config,
        })
    }

    // =========================================================================
    // Read state
    // =========================================================================

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn stack(&self) -> &SectionStack {
        &self.stack
    }

    /// Mutable access for listener registration
    pub fn stack_mut(&mut self) -> &mut SectionStack {
        &mut self.stack
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Mutable access for listener registration
    pub fn physics_mut(&mut self) -> &mut PhysicsEngine {
        &mut self.physics
    }

    pub fn active_index(&self) -> usize {
        self.stack.active_index()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.stack.direction()
    }

    pub fn is_animating(&self) -> bool {
        self.stack.is_animating()
    }

    pub fn is_drawer_open(&self) -> bool {
        self.stack.is_drawer_open()
    }

    pub fn is_scroll_claimed(&self) -> bool {
        self.scroll_claimed
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Whether any frame work is outstanding
    pub fn is_active(&self) -> bool {
        !self.stack.is_resting()
            || self.physics.is_active()
            || self.decision.is_pending()
            || self.render_sync.is_pending()
            || self.drawer_debounce.is_armed()
            || self.wheel_quiet.is_armed()
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        DebugSnapshot {
            now_ms: self.now_ms,
            stack: self.stack.snapshot(),
            physics: self.physics.snapshot(),
            gesture: self
                .accumulator
                .session()
                .map(|session| GestureDebug::new(session, self.accumulator.transition_distance())),
            classification: self.classifier.current(),
            scroll_claimed: self.scroll_claimed,
            touch_active: self.touch.is_some(),
            render_sync_pending: self.render_sync.is_pending(),
            render_sync_flushes: self.render_sync.flush_count(),
            render_sync_dropped: self.render_sync.dropped_count(),
            stats: self.stats,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn go_next(&mut self) -> bool {
        self.command(NavCommand::Next)
    }

    pub fn go_prev(&mut self) -> bool {
        self.command(NavCommand::Prev)
    }

    pub fn go_to_section(&mut self, index: usize) -> bool {
        self.command(NavCommand::GoTo(index))
    }

    pub fn open_drawer(&mut self) -> bool {
        self.command(NavCommand::OpenDrawer)
    }

    pub fn close_drawer(&mut self) -> bool {
        self.command(NavCommand::CloseDrawer)
    }

    pub fn command(&mut self, command: NavCommand) -> bool {
        let started = self.stack.command(command);
        tracing::debug!("command {:?} started={}", command, started);
        started
    }

    /// Close the drawer if it is open, then hand `route` to the navigator
    pub fn follow_link(&mut self, route: &str, navigator: &mut dyn Navigator) {
        if self.stack.is_drawer_open() {
            self.stack.close_drawer();
        }
        tracing::debug!("following link {}", route);
        navigator.navigate(route);
    }

    /// Follow the route attached to section `index`, if it has one
    pub fn follow_section_link(&mut self, index: usize, navigator: &mut dyn Navigator) -> bool {
        let Some(route) = self.stack.route_of(index).map(str::to_owned) else {
            return false;
        };
        self.follow_link(&route, navigator);
        true
    }

    /// While a sibling overlay claims scrolling, wheel and touch input is
    /// ignored. Claiming cancels any gesture in progress.
    pub fn set_scroll_claimed(&mut self, claimed: bool) {
        if claimed && !self.scroll_claimed {
            self.cancel_gestures();
            self.stack.run_buffered();
        }
        self.scroll_claimed = claimed;
    }

    /// Update the flip distance after a viewport resize
    pub fn set_viewport_height(&mut self, height: f32) {
        self.accumulator.set_transition_distance(height);
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Feed one host event. Returns whether it was acted on.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if let Some(timestamp_ms) = event.timestamp_ms() {
            self.now_ms = self.now_ms.max(timestamp_ms);
        }
        let accepted = match event {
            InputEvent::Wheel {
                delta,
                timestamp_ms,
            } => self.on_wheel(delta, timestamp_ms),
            InputEvent::TouchStart { y, timestamp_ms } => self.on_touch_start(y, timestamp_ms),
            InputEvent::TouchMove { y, timestamp_ms } => self.on_touch_move(y, timestamp_ms),
            InputEvent::TouchEnd { timestamp_ms } => self.on_touch_end(timestamp_ms),
            InputEvent::Key { key, repeat } => match self.bindings.lookup(key, repeat) {
                Some(command) => self.command(command),
                None => false,
            },
        };

        if accepted {
            self.stats.inputs += 1;
        } else {
            self.stats.ignored_inputs += 1;
        }
        accepted
    }

    fn on_wheel(&mut self, delta: f32, timestamp_ms: f64) -> bool {
        if self.scroll_claimed || !delta.is_finite() || delta == 0.0 {
            return false;
        }
        // A touch gesture owns the stack until it settles
        if self.touch.is_some() || self.physics.is_active() {
            return false;
        }

        match self.classifier.classify(delta.abs(), timestamp_ms) {
            InputSource::Coarse => self.on_coarse_wheel(delta, timestamp_ms),
            InputSource::Continuous => self.on_continuous_wheel(delta, timestamp_ms),
        }
    }

    fn on_coarse_wheel(&mut self, delta: f32, timestamp_ms: f64) -> bool {
        // Notches are never buffered: a spin during a transition is dropped
        if !self.stack.is_resting() || self.drawer_debounce.is_pending(timestamp_ms) {
            return false;
        }
        let Some(decision) = self.decision.coarse(delta) else {
            return false;
        };

        let last = self.stack.section_count() - 1;
        let toggles_drawer = match decision.direction {
            Direction::Next => !self.stack.is_drawer_open() && self.stack.active_index() == last,
            Direction::Prev => self.stack.is_drawer_open(),
        };
        let started = match decision.direction {
            Direction::Next => self.stack.go_next(),
            Direction::Prev => self.stack.go_prev(),
        };

        if started {
            self.stats.coarse_flips += 1;
            if toggles_drawer {
                self.drawer_debounce
                    .arm(timestamp_ms, self.config.decision.drawer_debounce_ms as f64);
            }
        }
        started
    }

    fn on_continuous_wheel(&mut self, delta: f32, timestamp_ms: f64) -> bool {
        let quiet_ms = self.config.decision.idle_timeout_ms as f64;
        if self.wheel_quiet.is_pending(timestamp_ms) {
            self.wheel_quiet.arm(timestamp_ms, quiet_ms);
            return false;
        }
        // The tail of a stream that already flipped must not start another
        if !self.wheel_gesture && !self.stack.is_resting() {
            self.wheel_quiet.arm(timestamp_ms, quiet_ms);
            return false;
        }

        self.decision.note_input(timestamp_ms);
        self.accumulator.set_source(InputSource::Continuous);
        match self.accumulator.push(delta, timestamp_ms) {
            AccumulatorUpdate::Ignored => return false,
            AccumulatorUpdate::Pending | AccumulatorUpdate::Moved { .. } => {}
            AccumulatorUpdate::Started { direction, .. } => {
                if !self.begin_wheel_gesture(direction, timestamp_ms) {
                    return false;
                }
            }
            AccumulatorUpdate::Reversed { direction, .. } => {
                self.stack.cancel_gesture();
                self.render_sync.invalidate();
                self.wheel_gesture = false;
                if !self.begin_wheel_gesture(direction, timestamp_ms) {
                    return false;
                }
            }
        }

        if let Some(progress) = self.accumulator.take_publish() {
            self.render_sync.push(progress);
        }
        true
    }

    fn begin_wheel_gesture(&mut self, direction: Direction, timestamp_ms: f64) -> bool {
        if self.stack.begin_gesture(direction) {
            self.wheel_gesture = true;
            return true;
        }
        tracing::debug!("wheel gesture {:?} refused at boundary", direction);
        self.accumulator.reset();
        self.decision.cancel();
        self.wheel_quiet
            .arm(timestamp_ms, self.config.decision.idle_timeout_ms as f64);
        // A command issued during a reversed gesture still runs
        self.stack.run_buffered();
        false
    }

    fn on_touch_start(&mut self, y: f32, _timestamp_ms: f64) -> bool {
        if self.scroll_claimed || !y.is_finite() {
            return false;
        }
        if !self.stack.is_resting() || self.physics.is_active() || self.wheel_gesture {
            return false;
        }
        // A stale idle deadline must not finalize the touch's start window
        self.decision.cancel();
        self.classifier.end_session();
        self.accumulator.reset();
        self.accumulator.set_source(InputSource::Continuous);
        self.touch = Some(TouchTrack {
            last_y: y,
            direction: None,
        });
        true
    }

    fn on_touch_move(&mut self, y: f32, timestamp_ms: f64) -> bool {
        if self.scroll_claimed || !y.is_finite() {
            return false;
        }
        let Some(mut track) = self.touch else {
            return false;
        };

        // Finger moving up reveals the next section
        let delta = track.last_y - y;
        track.last_y = y;
        let distance = self.accumulator.transition_distance();

        let accepted = match track.direction {
            None => match self.accumulator.push(delta, timestamp_ms) {
                AccumulatorUpdate::Started {
                    direction,
                    progress,
                } => {
                    self.accumulator.reset();
                    if !self.stack.begin_gesture(direction) {
                        tracing::debug!("touch gesture {:?} refused at boundary", direction);
                        self.touch = None;
                        return false;
                    }
                    track.direction = Some(direction);
                    self.physics
                        .input(progress, direction, InputSource::Continuous, timestamp_ms)
                }
                AccumulatorUpdate::Ignored => false,
                _ => true,
            },
            Some(_) => match Direction::from_delta(delta) {
                Some(moving) => self.physics.input(
                    delta.abs() / distance,
                    moving,
                    InputSource::Continuous,
                    timestamp_ms,
                ),
                None => false,
            },
        };

        self.touch = Some(track);
        accepted
    }

    fn on_touch_end(&mut self, timestamp_ms: f64) -> bool {
        let Some(track) = self.touch.take() else {
            return false;
        };
        self.accumulator.reset();
        match track.direction {
            Some(_) => self.physics.release(timestamp_ms),
            None => true,
        }
    }

    fn cancel_gestures(&mut self) {
        self.decision.cancel();
        self.accumulator.reset();
        self.render_sync.invalidate();
        self.classifier.end_session();
        self.wheel_gesture = false;
        self.touch = None;
        if self.physics.is_active() {
            self.physics.reset();
        }
        if self.stack.cancel_gesture() {
            tracing::debug!("gesture cancelled");
        }
    }

    // =========================================================================
    // Frame loop
    // =========================================================================

    /// Advance one rendering tick at host time `now_ms`.
    ///
    /// Order: expired deadlines, render-sync flush, physics, stack.
    /// Returns whether more frames are needed.
    pub fn on_frame(&mut self, now_ms: f64) -> bool {
        let dt_ms = self
            .last_frame_ms
            .map_or(0.0, |last| (now_ms - last).max(0.0) as f32);
        self.last_frame_ms = Some(self.last_frame_ms.map_or(now_ms, |last| last.max(now_ms)));
        self.now_ms = self.now_ms.max(now_ms);
        self.stats.frames += 1;

        self.run_deadlines(now_ms);

        if let Some(progress) = self.render_sync.flush() {
            self.stack.track_gesture(progress);
        }

        for event in self.physics.tick(dt_ms) {
            match event {
                PhysicsEvent::Progress(progress) => {
                    self.stack.track_gesture(progress);
                }
                PhysicsEvent::Committed { .. } => {
                    self.stats.commits += 1;
                    self.stack.commit_gesture();
                }
                PhysicsEvent::RolledBack { .. } => {
                    self.stats.rollbacks += 1;
                    self.stack.rollback_gesture();
                }
                PhysicsEvent::StateChanged { .. } => {}
            }
        }

        self.stack.tick(dt_ms);
        self.is_active()
    }

    fn run_deadlines(&mut self, now_ms: f64) {
        self.drawer_debounce.fire(now_ms);
        if self.wheel_quiet.fire(now_ms) {
            self.classifier.end_session();
        }

        let was_pending = self.decision.is_pending();
        if let Some(decision) = self.decision.poll(now_ms, &mut self.accumulator) {
            self.apply_decision(decision);
        }
        if was_pending && !self.decision.is_pending() {
            // Finalized, or the stream never crossed the start threshold
            if self.wheel_gesture && self.stack.is_tracking() {
                self.stack.rollback_gesture();
            }
            self.wheel_gesture = false;
            self.render_sync.invalidate();
            self.classifier.end_session();
        }
    }

    fn apply_decision(&mut self, decision: Decision) {
        self.render_sync.invalidate();
        if !self.wheel_gesture {
            return;
        }
        self.stack.track_gesture(decision.progress);
        match decision.outcome {
            Outcome::Commit => {
                self.stats.commits += 1;
                self.stack.commit_gesture();
            }
            Outcome::Rollback => {
                self.stats.rollbacks += 1;
                self.stack.rollback_gesture();
            }
        }
        self.wheel_gesture = false;
    }

    /// Cancel every deadline and gesture and bring the stack to rest.
    /// Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.cancel_gestures();
        self.drawer_debounce.cancel();
        self.wheel_quiet.cancel();
        self.classifier.reset();
        self.stack.reset();
        self.last_frame_ms = None;
    }
}

impl FrameSubscriber for NavigationEngine {
    fn on_frame(&mut self, tick: &FrameTick) {
        NavigationEngine::on_frame(self, tick.now_ms);
    }

    fn is_active(&self) -> bool {
        NavigationEngine::is_active(self)
    }
}

impl Drop for NavigationEngine {
    fn drop(&mut self) {
        self.reset();
    }
}
