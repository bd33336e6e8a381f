//! Section stack controller
//!
//! Owns the active index and the drawer flag, and moves sections between
//! three states:
//!
//! - `Resting`: the active section is on screen, its neighbours are parked
//!   one viewport away.
//! - `Tracking`: a gesture drives the motion 1:1, no easing.
//! - `Transitioning`: an eased tween runs to completion. Commands are
//!   rejected; the most recent one is kept and replayed once it settles.
//!
//! The index and drawer flag only change at the instant a committed motion
//! completes, together with the final placements.

use flipstack_animation::Tween;
use flipstack_core::{Direction, Machine, NavCommand, StateTransitions};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::config::StackConfig;
use crate::error::StackError;
use crate::section::{Layer, Placement, SectionRecord};

new_key_type! {
    /// Handle returned by [`SectionStack::subscribe`]
    pub struct StackListenerId;
}

/// How far a tracked gesture may push past either end of its motion
const TRACK_OVERSHOOT: f32 = 0.25;

/// Completions closer than this to their target finish immediately
const SETTLED_EPSILON: f32 = 1e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    #[default]
    Resting,
    Tracking,
    Transitioning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackSignal {
    BeginGesture,
    Animate,
    CancelGesture,
    Complete,
    Reset,
}

impl StateTransitions for StackState {
    type Event = StackSignal;

    fn on_event(&self, event: StackSignal) -> Option<Self> {
        use StackSignal::*;
        use StackState::*;

        match (self, event) {
            (Resting, BeginGesture) => Some(Tracking),
            (Resting, Animate) | (Tracking, Animate) => Some(Transitioning),
            (Tracking, CancelGesture) => Some(Resting),
            (Transitioning, Complete) => Some(Resting),
            (Tracking, Reset) | (Transitioning, Reset) => Some(Resting),
            _ => None,
        }
    }
}

/// What is moving
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    Section {
        from: usize,
        to: usize,
        direction: Direction,
    },
    Drawer {
        opening: bool,
    },
}

impl Motion {
    pub fn direction(&self) -> Direction {
        match *self {
            Motion::Section { direction, .. } => direction,
            Motion::Drawer { opening: true } => Direction::Next,
            Motion::Drawer { opening: false } => Direction::Prev,
        }
    }
}

/// Stack notifications, delivered after the state they describe is in place
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StackEvent {
    TransitionStarted { motion: Motion },
    IndexChanged { from: usize, to: usize },
    DrawerChanged { open: bool },
    TransitionSettled { motion: Motion, committed: bool },
}

/// Read-only view for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StackSnapshot {
    pub state: StackState,
    pub active_index: usize,
    pub section_count: usize,
    pub direction: Option<Direction>,
    pub is_animating: bool,
    pub is_drawer_open: bool,
    pub motion: Option<Motion>,
    pub progress: Option<f32>,
    pub buffered: Option<NavCommand>,
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    tween: Tween,
    commit: bool,
}

type Listener = Box<dyn FnMut(&StackEvent)>;

pub struct SectionStack {
    config: StackConfig,
    sections: Vec<SectionRecord>,
    drawer: SectionRecord,
    active_index: usize,
    drawer_open: bool,
    direction: Option<Direction>,
    machine: Machine<StackState>,
    motion: Option<Motion>,
    progress: f32,
    transition: Option<Transition>,
    buffered: Option<NavCommand>,
    listeners: SlotMap<StackListenerId, Listener>,
}

impl SectionStack {
    /// Build a stack resting on the first section with the drawer closed
    pub fn new(
        sections: Vec<SectionRecord>,
        drawer: SectionRecord,
        config: StackConfig,
    ) -> Result<Self, StackError> {
        if sections.is_empty() {
            return Err(StackError::Empty);
        }
        {
            let mut seen = FxHashSet::default();
            for section in &sections {
                if !seen.insert(section.id()) {
                    return Err(StackError::DuplicateId(section.id().to_string()));
                }
            }
        }

        let mut stack = Self {
            config,
            sections,
            drawer,
            active_index: 0,
            drawer_open: false,
            direction: None,
            machine: Machine::new(StackState::Resting),
            motion: None,
            progress: 0.0,
            transition: None,
            buffered: None,
            listeners: SlotMap::with_key(),
        };
        stack.layout();
        Ok(stack)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn state(&self) -> StackState {
        self.machine.state()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Direction of the current or most recent motion
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn is_animating(&self) -> bool {
        self.machine.is_in(StackState::Transitioning)
    }

    pub fn is_tracking(&self) -> bool {
        self.machine.is_in(StackState::Tracking)
    }

    pub fn is_resting(&self) -> bool {
        self.machine.is_in(StackState::Resting)
    }

    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn motion(&self) -> Option<Motion> {
        self.motion
    }

    /// Progress of the running motion
    pub fn progress(&self) -> Option<f32> {
        self.motion.map(|_| self.progress)
    }

    /// Command waiting for the running transition to settle
    pub fn buffered(&self) -> Option<NavCommand> {
        self.buffered
    }

    pub fn section(&self, index: usize) -> Option<&SectionRecord> {
        self.sections.get(index)
    }

    pub fn drawer(&self) -> &SectionRecord {
        &self.drawer
    }

    pub fn route_of(&self, index: usize) -> Option<&str> {
        self.sections.get(index).and_then(SectionRecord::route)
    }

    pub fn drawer_route(&self) -> Option<&str> {
        self.drawer.route()
    }

    pub fn snapshot(&self) -> StackSnapshot {
        StackSnapshot {
            state: self.state(),
            active_index: self.active_index,
            section_count: self.sections.len(),
            direction: self.direction,
            is_animating: self.is_animating(),
            is_drawer_open: self.drawer_open,
            motion: self.motion,
            progress: self.progress(),
            buffered: self.buffered,
        }
    }

    pub fn subscribe<F: FnMut(&StackEvent) + 'static>(&mut self, listener: F) -> StackListenerId {
        self.listeners.insert(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: StackListenerId) {
        self.listeners.remove(id);
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

    /// Run a command, or buffer it if a motion is in progress.
    ///
    /// Returns whether a transition started now.
    pub fn command(&mut self, command: NavCommand) -> bool {
        if !self.is_resting() {
            if self.config.buffer_commands {
                tracing::debug!("stack busy, buffering {:?}", command);
                self.buffered = Some(command);
            }
            return false;
        }
        self.execute(command)
    }

    fn execute(&mut self, command: NavCommand) -> bool {
        let last = self.sections.len() - 1;
        match command {
            NavCommand::Next => {
                if self.drawer_open {
                    false
                } else if self.active_index < last {
                    self.animate_section(self.active_index + 1)
                } else {
                    self.animate_button(Motion::Drawer { opening: true })
                }
            }
            NavCommand::Prev => {
                if self.drawer_open {
                    self.animate_button(Motion::Drawer { opening: false })
                } else if self.active_index > 0 {
                    self.animate_section(self.active_index - 1)
                } else {
                    false
                }
            }
            NavCommand::First => self.execute(NavCommand::GoTo(0)),
            NavCommand::Last => self.execute(NavCommand::GoTo(last)),
            NavCommand::GoTo(index) => {
                if index > last {
                    return false;
                }
                if self.drawer_open {
                    let started = self.animate_button(Motion::Drawer { opening: false });
                    if started && index != self.active_index {
                        self.buffered = Some(command);
                    }
                    return started;
                }
                if index == self.active_index {
                    return false;
                }
                self.animate_section(index)
            }
            NavCommand::OpenDrawer => {
                !self.drawer_open && self.animate_button(Motion::Drawer { opening: true })
            }
            NavCommand::CloseDrawer => {
                self.drawer_open && self.animate_button(Motion::Drawer { opening: false })
            }
        }
    }

    fn animate_section(&mut self, to: usize) -> bool {
        let direction = if to > self.active_index {
            Direction::Next
        } else {
            Direction::Prev
        };
        self.animate_button(Motion::Section {
            from: self.active_index,
            to,
            direction,
        })
    }

    fn animate_button(&mut self, motion: Motion) -> bool {
        let tween = Tween::new(
            0.0,
            1.0,
            self.config.button_transition_ms,
            self.config.easing,
        );
        self.motion = Some(motion);
        self.progress = 0.0;
        self.direction = Some(motion.direction());
        self.start(tween, true);
        self.emit(StackEvent::TransitionStarted { motion });
        true
    }

    fn start(&mut self, tween: Tween, commit: bool) {
        self.machine.send(StackSignal::Animate);
        self.transition = Some(Transition { tween, commit });
        tracing::debug!(
            "stack transition {:?} commit={} over {:.0}ms",
            self.motion,
            commit,
            tween.duration_ms()
        );
        self.layout();
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Start tracking a gesture toward `direction`.
    ///
    /// False while busy, or at a boundary with nothing to reveal (`Prev` on
    /// the first section, `Next` with the drawer already open).
    pub fn begin_gesture(&mut self, direction: Direction) -> bool {
        if !self.is_resting() {
            return false;
        }
        let Some(motion) = self.motion_toward(direction) else {
            return false;
        };
        self.machine.send(StackSignal::BeginGesture);
        self.motion = Some(motion);
        self.progress = 0.0;
        self.direction = Some(direction);
        self.layout();
        self.emit(StackEvent::TransitionStarted { motion });
        true
    }

    fn motion_toward(&self, direction: Direction) -> Option<Motion> {
        let last = self.sections.len() - 1;
        match direction {
            Direction::Next if self.drawer_open => None,
            Direction::Next if self.active_index < last => Some(Motion::Section {
                from: self.active_index,
                to: self.active_index + 1,
                direction,
            }),
            Direction::Next => Some(Motion::Drawer { opening: true }),
            Direction::Prev if self.drawer_open => Some(Motion::Drawer { opening: false }),
            Direction::Prev if self.active_index > 0 => Some(Motion::Section {
                from: self.active_index,
                to: self.active_index - 1,
                direction,
            }),
            Direction::Prev => None,
        }
    }

    /// Follow the gesture 1:1
    pub fn track_gesture(&mut self, progress: f32) -> bool {
        if !self.is_tracking() || !progress.is_finite() {
            return false;
        }
        self.progress = progress.clamp(-TRACK_OVERSHOOT, 1.0 + TRACK_OVERSHOOT);
        self.layout();
        true
    }

    /// Finish the tracked motion forward from wherever it stopped
    pub fn commit_gesture(&mut self) -> bool {
        self.settle_gesture(true)
    }

    /// Return the tracked motion to rest from wherever it stopped
    pub fn rollback_gesture(&mut self) -> bool {
        self.settle_gesture(false)
    }

    fn settle_gesture(&mut self, commit: bool) -> bool {
        if !self.is_tracking() {
            return false;
        }
        let target = if commit { 1.0 } else { 0.0 };
        let tween = Tween::proportional(
            self.progress,
            target,
            self.config.gesture_transition_ms,
            self.config.min_transition_ms,
            self.config.easing,
        );
        self.start(tween, commit);
        if (self.progress - target).abs() < SETTLED_EPSILON {
            self.progress = target;
            self.complete();
        }
        true
    }

    /// Drop the tracked gesture and snap back to rest without animating.
    ///
    /// A buffered command survives: it runs after the next completion, or
    /// through [`run_buffered`](Self::run_buffered).
    pub fn cancel_gesture(&mut self) -> bool {
        if !self.is_tracking() {
            return false;
        }
        self.machine.send(StackSignal::CancelGesture);
        self.motion = None;
        self.progress = 0.0;
        self.layout();
        true
    }

    /// Run the buffered command now if the stack is resting.
    ///
    /// Returns whether a transition started.
    pub fn run_buffered(&mut self) -> bool {
        if !self.is_resting() {
            return false;
        }
        match self.buffered.take() {
            Some(command) => {
                tracing::debug!("stack replaying buffered {:?}", command);
                self.execute(command)
            }
            None => false,
        }
    }

    // =========================================================================
    // Frame loop
    // =========================================================================

    /// Advance the running transition. Returns whether one is still running.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        let finished = transition.tween.tick(dt_ms);
        self.progress = transition.tween.value();
        if finished {
            self.complete();
        } else {
            self.layout();
        }
        self.is_animating()
    }

    fn complete(&mut self) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        let Some(motion) = self.motion.take() else {
            return;
        };

        let previous_index = self.active_index;
        let previous_drawer = self.drawer_open;
        if transition.commit {
            match motion {
                Motion::Section { to, .. } => self.active_index = to,
                Motion::Drawer { opening } => self.drawer_open = opening,
            }
        }
        self.progress = 0.0;
        self.machine.send(StackSignal::Complete);
        self.layout();

        tracing::debug!(
            "stack settled {:?} committed={} index={} drawer_open={}",
            motion,
            transition.commit,
            self.active_index,
            self.drawer_open
        );

        if self.active_index != previous_index {
            self.emit(StackEvent::IndexChanged {
                from: previous_index,
                to: self.active_index,
            });
        }
        if self.drawer_open != previous_drawer {
            self.emit(StackEvent::DrawerChanged {
                open: self.drawer_open,
            });
        }
        self.emit(StackEvent::TransitionSettled {
            motion,
            committed: transition.commit,
        });

        self.run_buffered();
    }

    /// Stop everything and return to rest on the current index.
    ///
    /// The index and drawer flag keep their last settled values; every mount
    /// is rewritten.
    pub fn reset(&mut self) {
        self.machine.send(StackSignal::Reset);
        self.transition = None;
        self.motion = None;
        self.progress = 0.0;
        self.buffered = None;
        for section in &mut self.sections {
            section.invalidate();
        }
        self.drawer.invalidate();
        self.layout();
    }

    // =========================================================================
    // Placement
    // =========================================================================

    fn layout(&mut self) {
        let active = self.active_index;
        let progress = self.progress;

        match self.motion {
            Some(Motion::Section {
                from,
                to,
                direction,
            }) => {
                let sign = direction.sign();
                for (index, section) in self.sections.iter_mut().enumerate() {
                    let placement = if index == from {
                        Placement::new(-sign * progress, true, Layer::Base)
                    } else if index == to {
                        Placement::new(sign * (1.0 - progress), true, Layer::Incoming)
                    } else {
                        Placement::parked(if index < to { -1.0 } else { 1.0 })
                    };
                    section.place(placement);
                }
                self.drawer.place(drawer_rest(self.drawer_open));
            }
            Some(Motion::Drawer { opening }) => {
                for (index, section) in self.sections.iter_mut().enumerate() {
                    section.place(rest_placement(index, active));
                }
                let open_fraction = if opening { progress } else { 1.0 - progress };
                self.drawer
                    .place(Placement::new(1.0 - open_fraction, true, Layer::Drawer));
            }
            None => {
                for (index, section) in self.sections.iter_mut().enumerate() {
                    section.place(rest_placement(index, active));
                }
                self.drawer.place(drawer_rest(self.drawer_open));
            }
        }
    }

    fn emit(&mut self, event: StackEvent) {
        for listener in self.listeners.values_mut() {
            listener(&event);
        }
    }
}

fn rest_placement(index: usize, active: usize) -> Placement {
    if index == active {
        Placement::active()
    } else if index + 1 == active {
        Placement::adjacent(-1.0)
    } else if index == active + 1 {
        Placement::adjacent(1.0)
    } else if index < active {
        Placement::parked(-1.0)
    } else {
        Placement::parked(1.0)
    }
}

fn drawer_rest(open: bool) -> Placement {
    if open {
        Placement::new(0.0, true, Layer::Drawer)
    } else {
        Placement::new(1.0, false, Layer::Drawer)
    }
}

impl std::fmt::Debug for SectionStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionStack")
            .field("state", &self.state())
            .field("active_index", &self.active_index)
            .field("drawer_open", &self.drawer_open)
            .field("motion", &self.motion)
            .field("progress", &self.progress)
            .field("buffered", &self.buffered)
            .finish_non_exhaustive()
    }
}
