//! Frame scheduler
//!
//! A tick source plus a subscriber list. Hosts with a display-synchronized
//! callback call [`FrameScheduler::tick`] from it; headless hosts drive it from
//! [`FixedTimestep`]. Simulation code only ever sees [`FrameTick`]s, so the
//! loop can be swapped without touching it.
//!
//! Subscribers are held weakly: dropping the owning `Rc` is enough to leave the
//! loop, and no frame is ever delivered to a torn-down subscriber.

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle returned by [`FrameScheduler::subscribe`]
    pub struct SubscriberId;
}

/// Timing information for one rendering tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Monotonic frame counter, starting at 1
    pub frame: u64,
    /// Host clock at this tick, in milliseconds
    pub now_ms: f64,
    /// Milliseconds since the previous tick (0 on the first tick)
    pub dt_ms: f64,
}

/// Something advanced once per rendering tick
pub trait FrameSubscriber {
    fn on_frame(&mut self, tick: &FrameTick);

    /// Whether the subscriber still has animation work in flight
    fn is_active(&self) -> bool {
        true
    }
}

/// The frame loop that ticks all subscribers
pub struct FrameScheduler {
    subscribers: SlotMap<SubscriberId, Weak<RefCell<dyn FrameSubscriber>>>,
    frame: u64,
    last_ms: Option<f64>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            subscribers: SlotMap::with_key(),
            frame: 0,
            last_ms: None,
        }
    }

    pub fn subscribe<S: FrameSubscriber + 'static>(
        &mut self,
        subscriber: &Rc<RefCell<S>>,
    ) -> SubscriberId {
        let erased: Rc<RefCell<dyn FrameSubscriber>> = subscriber.clone();
        self.subscribers.insert(Rc::downgrade(&erased))
    }

    /// Remove a subscriber. Unknown or already-removed ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.remove(id);
    }

    /// Deliver one tick at host time `now_ms` to every live subscriber
    pub fn tick(&mut self, now_ms: f64) -> FrameTick {
        // Hosts occasionally report a clock that runs backwards; never emit a negative dt
        let dt_ms = self.last_ms.map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_ms = Some(now_ms.max(self.last_ms.unwrap_or(now_ms)));
        self.frame += 1;

        let tick = FrameTick {
            frame: self.frame,
            now_ms,
            dt_ms,
        };

        self.subscribers.retain(|_, weak| weak.strong_count() > 0);
        for (_, weak) in self.subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.borrow_mut().on_frame(&tick);
            }
        }

        tick
    }

    /// Check if any live subscriber still has work in flight
    pub fn has_active_subscribers(&self) -> bool {
        self.subscribers
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .any(|s| s.borrow().is_active())
    }

    /// Number of registered subscribers, including ones not yet pruned
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-step tick source for hosts without a display callback
#[derive(Clone, Copy, Debug)]
pub struct FixedTimestep {
    step_ms: f64,
    now_ms: f64,
}

impl FixedTimestep {
    /// Create a source stepping `step_ms` per tick, starting at `start_ms`
    pub fn new(step_ms: f64, start_ms: f64) -> Self {
        Self {
            step_ms: step_ms.max(1.0),
            now_ms: start_ms,
        }
    }

    /// A 60 Hz source starting at zero
    pub fn sixty_hz() -> Self {
        Self::new(1000.0 / 60.0, 0.0)
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Advance the clock by one step and return the new time
    pub fn advance(&mut self) -> f64 {
        self.now_ms += self.step_ms;
        self.now_ms
    }

    /// Tick `scheduler` until at least `duration_ms` of virtual time elapsed.
    /// Returns the number of ticks delivered.
    pub fn run_for(&mut self, scheduler: &mut FrameScheduler, duration_ms: f64) -> u32 {
        let end = self.now_ms + duration_ms.max(0.0);
        let mut ticks = 0;
        while self.now_ms < end {
            let now = self.advance();
            scheduler.tick(now);
            ticks += 1;
        }
        ticks
    }

    /// Tick until no subscriber reports activity or `max_ticks` is reached.
    /// Returns the number of ticks delivered.
    pub fn run_until_idle(&mut self, scheduler: &mut FrameScheduler, max_ticks: u32) -> u32 {
        let mut ticks = 0;
        while ticks < max_ticks && scheduler.has_active_subscribers() {
            let now = self.advance();
            scheduler.tick(now);
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        frames: u32,
        last_dt: f64,
        budget: u32,
    }

    impl FrameSubscriber for Counter {
        fn on_frame(&mut self, tick: &FrameTick) {
            self.frames += 1;
            self.last_dt = tick.dt_ms;
            self.budget = self.budget.saturating_sub(1);
        }

        fn is_active(&self) -> bool {
            self.budget > 0
        }
    }

    #[test]
    fn test_ticks_reach_subscribers() {
        let mut scheduler = FrameScheduler::new();
        let counter = Rc::new(RefCell::new(Counter::default()));
        scheduler.subscribe(&counter);

        scheduler.tick(0.0);
        scheduler.tick(16.0);
        assert_eq!(counter.borrow().frames, 2);
        assert_eq!(counter.borrow().last_dt, 16.0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut scheduler = FrameScheduler::new();
        let counter = Rc::new(RefCell::new(Counter::default()));
        scheduler.subscribe(&counter);
        drop(counter);

        scheduler.tick(0.0);
        assert_eq!(scheduler.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let mut scheduler = FrameScheduler::new();
        let counter = Rc::new(RefCell::new(Counter::default()));
        let id = scheduler.subscribe(&counter);
        scheduler.unsubscribe(id);
        scheduler.unsubscribe(id);
        scheduler.tick(0.0);
        assert_eq!(counter.borrow().frames, 0);
    }

    #[test]
    fn test_backwards_clock_never_negative_dt() {
        let mut scheduler = FrameScheduler::new();
        scheduler.tick(100.0);
        let tick = scheduler.tick(90.0);
        assert_eq!(tick.dt_ms, 0.0);
    }

    #[test]
    fn test_fixed_timestep_run_until_idle() {
        let mut scheduler = FrameScheduler::new();
        let counter = Rc::new(RefCell::new(Counter {
            budget: 5,
            ..Default::default()
        }));
        scheduler.subscribe(&counter);

        let mut clock = FixedTimestep::new(10.0, 0.0);
        let ticks = clock.run_until_idle(&mut scheduler, 100);
        assert_eq!(ticks, 5);
        assert_eq!(clock.now_ms(), 50.0);
    }
}
