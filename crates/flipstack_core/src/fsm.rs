//! State Machine Runtime
//!
//! Flat, enum-driven state machines. A state type lists its legal edges in
//! [`StateTransitions::on_event`]; [`Machine`] owns the current state, applies
//! events and keeps a short edge history for diagnostics.
//!
//! Callers never assign a state directly. An event that has no edge from the
//! current state is ignored and reported as `None`.

use smallvec::SmallVec;
use std::fmt::Debug;

/// Maximum number of edges retained in [`Machine::history`]
const HISTORY_LEN: usize = 16;

/// Trait for state enums that map events to transitions
///
/// # Example
///
/// ```rust
/// use flipstack_core::fsm::{Machine, StateTransitions};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// enum Door { Open, Closed }
///
/// #[derive(Clone, Copy, Debug)]
/// enum DoorEvent { Push, Pull }
///
/// impl StateTransitions for Door {
///     type Event = DoorEvent;
///     fn on_event(&self, event: DoorEvent) -> Option<Self> {
///         match (self, event) {
///             (Door::Closed, DoorEvent::Push) => Some(Door::Open),
///             (Door::Open, DoorEvent::Pull) => Some(Door::Closed),
///             _ => None,
///         }
///     }
/// }
///
/// let mut door = Machine::new(Door::Closed);
/// assert!(door.send(DoorEvent::Pull).is_none());
/// assert_eq!(door.send(DoorEvent::Push), Some((Door::Closed, Door::Open)));
/// ```
pub trait StateTransitions: Copy + PartialEq + Debug + 'static {
    type Event: Copy + Debug;

    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: Self::Event) -> Option<Self>;
}

/// A state machine instance
#[derive(Clone, Debug)]
pub struct Machine<S: StateTransitions> {
    current: S,
    history: SmallVec<[(S, S::Event, S); HISTORY_LEN]>,
    edges: u64,
}

impl<S: StateTransitions> Machine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            history: SmallVec::new(),
            edges: 0,
        }
    }

    /// Get the current state
    pub fn state(&self) -> S {
        self.current
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current == state
    }

    /// Check if an event would trigger a transition from the current state
    pub fn can_send(&self, event: S::Event) -> bool {
        self.current.on_event(event).is_some()
    }

    /// Send an event. Returns the `(from, to)` edge when a transition happened.
    ///
    /// Self-loops (an edge whose target equals the current state) are accepted
    /// but not reported, so callers only see real edges.
    pub fn send(&mut self, event: S::Event) -> Option<(S, S)> {
        let from = self.current;
        let to = from.on_event(event)?;
        if to == from {
            return None;
        }

        self.current = to;
        self.edges += 1;
        if self.history.len() == HISTORY_LEN {
            self.history.remove(0);
        }
        self.history.push((from, event, to));
        tracing::trace!("fsm {:?} --{:?}--> {:?}", from, event, to);
        Some((from, to))
    }

    /// Recent transitions, oldest first
    pub fn history(&self) -> &[(S, S::Event, S)] {
        &self.history
    }

    /// Total number of edges taken since creation
    pub fn edge_count(&self) -> u64 {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Light {
        Off,
        On,
        Dimmed,
    }

    #[derive(Clone, Copy, Debug)]
    enum Switch {
        Toggle,
        Dim,
    }

    impl StateTransitions for Light {
        type Event = Switch;

        fn on_event(&self, event: Switch) -> Option<Self> {
            match (self, event) {
                (Light::Off, Switch::Toggle) => Some(Light::On),
                (Light::On, Switch::Toggle) | (Light::Dimmed, Switch::Toggle) => Some(Light::Off),
                (Light::On, Switch::Dim) => Some(Light::Dimmed),
                (Light::Dimmed, Switch::Dim) => Some(Light::Dimmed),
                _ => None,
            }
        }
    }

    #[test]
    fn test_simple_transitions() {
        let mut light = Machine::new(Light::Off);
        assert_eq!(light.send(Switch::Toggle), Some((Light::Off, Light::On)));
        assert_eq!(light.send(Switch::Dim), Some((Light::On, Light::Dimmed)));
        assert!(light.is_in(Light::Dimmed));
        assert_eq!(light.edge_count(), 2);
    }

    #[test]
    fn test_invalid_event_no_transition() {
        let mut light = Machine::new(Light::Off);
        assert!(!light.can_send(Switch::Dim));
        assert_eq!(light.send(Switch::Dim), None);
        assert_eq!(light.state(), Light::Off);
        assert!(light.history().is_empty());
    }

    #[test]
    fn test_self_loop_not_reported() {
        let mut light = Machine::new(Light::Dimmed);
        assert_eq!(light.send(Switch::Dim), None);
        assert_eq!(light.edge_count(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut light = Machine::new(Light::Off);
        for _ in 0..(HISTORY_LEN * 2 + 1) {
            light.send(Switch::Toggle);
        }
        assert_eq!(light.history().len(), HISTORY_LEN);
        assert_eq!(light.edge_count(), (HISTORY_LEN * 2 + 1) as u64);
    }
}
