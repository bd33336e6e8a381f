//! End-to-end navigation tests
//!
//! These drive a full `NavigationEngine` with host-shaped input on virtual
//! time and check that:
//! - Trackpad streams commit or roll back according to the decision policy
//! - Touch drags settle through the physics engine
//! - Boundary commands and commands issued mid-transition behave as no-ops
//! - The engine runs unchanged under the fixed-step frame scheduler

use std::cell::RefCell;
use std::rc::Rc;

use flipstack_core::{Direction, FixedTimestep, FrameScheduler, InputEvent, NavCommand};
use flipstack_gesture::DecisionConfig;
use flipstack_stack::{
    NavigationConfig, NavigationEngine, Placement, SectionRecord, SharedMount, StackEvent,
};

const FRAME: f64 = 1000.0 / 60.0;

struct Harness {
    engine: NavigationEngine,
    mounts: Vec<SharedMount>,
    now: f64,
    saw_animating: bool,
}

impl Harness {
    fn new(count: usize) -> Self {
        Self::with_config(count, NavigationConfig::default())
    }

    fn with_config(count: usize, config: NavigationConfig) -> Self {
        let mounts: Vec<SharedMount> = (0..count).map(|_| SharedMount::new()).collect();
        let sections = mounts
            .iter()
            .enumerate()
            .map(|(i, mount)| SectionRecord::new(format!("section-{i}"), mount.clone()))
            .collect();
        let drawer = SectionRecord::new("drawer", SharedMount::new());
        let mut engine = NavigationEngine::new(config, sections, drawer).unwrap();
        engine.on_frame(0.0);
        Self {
            engine,
            mounts,
            now: 0.0,
            saw_animating: false,
        }
    }

    fn frame_at(&mut self, now: f64) {
        self.now = now;
        self.engine.on_frame(now);
        self.saw_animating |= self.engine.is_animating();
    }

    /// Stream wheel deltas `gap_ms` apart, rendering a frame after each
    fn wheel_stream(&mut self, deltas: &[f32], gap_ms: f64) {
        for &delta in deltas {
            let t = self.now + gap_ms;
            self.engine.handle_input(InputEvent::Wheel {
                delta,
                timestamp_ms: t,
            });
            self.frame_at(t);
        }
    }

    /// Drag a finger from `start_y` by `step` per move, `moves` times
    fn touch_drag(&mut self, start_y: f32, step: f32, moves: usize, gap_ms: f64) {
        self.engine.handle_input(InputEvent::TouchStart {
            y: start_y,
            timestamp_ms: self.now,
        });
        let mut y = start_y;
        for _ in 0..moves {
            y -= step;
            let t = self.now + gap_ms;
            self.engine.handle_input(InputEvent::TouchMove { y, timestamp_ms: t });
            self.frame_at(t);
        }
        self.engine.handle_input(InputEvent::TouchEnd {
            timestamp_ms: self.now,
        });
    }

    /// Render frames until nothing is in flight
    fn settle(&mut self) -> u32 {
        let mut frames = 0;
        loop {
            let next = self.now + FRAME;
            self.frame_at(next);
            frames += 1;
            if !self.engine.is_active() {
                return frames;
            }
            assert!(frames < 2_000, "engine never went idle");
        }
    }
}

fn repeat(delta: f32, count: usize) -> Vec<f32> {
    vec![delta; count]
}

#[test]
fn test_half_distance_pause_rolls_back() {
    let mut h = Harness::new(3);
    let distance = h.engine.config().gesture.transition_distance;

    // 390 + 10 = half the transition distance, slowing to a crawl at the end
    let mut deltas = repeat(5.0, 78);
    deltas.extend(repeat(0.5, 20));
    h.wheel_stream(&deltas, 16.0);
    assert_eq!(distance, 800.0);

    assert!(h.engine.stack().is_tracking());
    let offset = h.engine.snapshot().gesture.unwrap().accumulated_offset;
    assert_eq!(offset, 400.0);
    assert!(!h.saw_animating);

    h.settle();

    assert!(h.saw_animating, "rollback should animate");
    assert!(!h.engine.is_animating());
    assert_eq!(h.engine.active_index(), 0);
    assert_eq!(h.engine.stats().rollbacks, 1);
    assert_eq!(h.mounts[0].placement(), Some(Placement::active()));
    assert_eq!(h.mounts[1].placement(), Some(Placement::adjacent(1.0)));
}

#[test]
fn test_long_trackpad_gesture_commits() {
    let mut h = Harness::new(3);
    h.wheel_stream(&repeat(5.0, 112), 16.0);
    h.settle();
    assert_eq!(h.engine.active_index(), 1);
    assert_eq!(h.engine.direction(), Some(Direction::Next));
    assert_eq!(h.engine.stats().commits, 1);
    assert_eq!(h.mounts[1].placement(), Some(Placement::active()));
}

fn threshold_harness() -> Harness {
    let mut config = NavigationConfig::default();
    config.gesture.transition_distance = 1_000.0;
    config.decision = DecisionConfig {
        snap_threshold: 0.4,
        ..Default::default()
    };
    Harness::with_config(3, config)
}

#[test]
fn test_threshold_just_below_rolls_back() {
    let mut h = threshold_harness();
    h.wheel_stream(&repeat(5.0, 78), 16.0);
    h.settle();
    assert_eq!(h.engine.active_index(), 0);
    assert_eq!(h.engine.stats().rollbacks, 1);
}

#[test]
fn test_threshold_just_above_commits() {
    let mut h = threshold_harness();
    h.wheel_stream(&repeat(5.0, 82), 16.0);
    h.settle();
    assert_eq!(h.engine.active_index(), 1);
    assert_eq!(h.engine.stats().commits, 1);
}

#[test]
fn test_fast_short_flick_commits() {
    let mut h = threshold_harness();
    // 100px of a 1000px flip in 32ms
    h.wheel_stream(&repeat(25.0, 4), 8.0);
    h.settle();
    assert_eq!(h.engine.active_index(), 1);
}

#[test]
fn test_reversal_restarts_from_new_delta() {
    let mut h = Harness::new(3);
    h.engine.go_next();
    h.settle();
    assert_eq!(h.engine.active_index(), 1);

    h.wheel_stream(&repeat(10.0, 20), 16.0);
    let before = h.engine.snapshot().gesture.unwrap();
    assert_eq!(before.accumulated_offset, 200.0);
    assert_eq!(before.direction, Some(Direction::Next));

    h.wheel_stream(&[-12.0], 16.0);
    let after = h.engine.snapshot().gesture.unwrap();
    assert_eq!(after.accumulated_offset, -12.0);
    assert_eq!(after.direction, Some(Direction::Prev));
    assert_eq!(h.engine.direction(), Some(Direction::Prev));
    assert!(h.engine.stack().is_tracking());

    h.settle();
    assert_eq!(h.engine.active_index(), 1);
}

#[test]
fn test_boundary_commands() {
    let mut h = Harness::new(3);
    let before = h.engine.stack().snapshot();
    let writes: Vec<u64> = h.mounts.iter().map(SharedMount::write_count).collect();

    assert!(!h.engine.go_prev());
    assert_eq!(h.engine.stack().snapshot(), before);
    let after: Vec<u64> = h.mounts.iter().map(SharedMount::write_count).collect();
    assert_eq!(writes, after);

    h.engine.go_to_section(2);
    h.settle();
    assert_eq!(h.engine.active_index(), 2);

    assert!(h.engine.go_next());
    h.settle();
    assert!(h.engine.is_drawer_open());
    assert_eq!(h.engine.active_index(), 2);
}

#[test]
fn test_commands_mid_transition_run_once_after() {
    let mut h = Harness::new(3);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    h.engine
        .stack_mut()
        .subscribe(move |event| sink.borrow_mut().push(*event));

    assert!(h.engine.go_next());
    h.frame_at(h.now + FRAME);
    assert!(h.engine.is_animating());

    assert!(!h.engine.go_prev());
    assert!(!h.engine.open_drawer());
    assert!(!h.engine.close_drawer());
    assert!(!h.engine.go_to_section(2));
    assert_eq!(h.engine.active_index(), 0);
    assert_eq!(h.engine.stack().buffered(), Some(NavCommand::GoTo(2)));

    h.settle();
    assert_eq!(h.engine.active_index(), 2);
    assert!(!h.engine.is_drawer_open());

    let index_changes: Vec<StackEvent> = log
        .borrow()
        .iter()
        .copied()
        .filter(|event| matches!(event, StackEvent::IndexChanged { .. }))
        .collect();
    assert_eq!(
        index_changes,
        vec![
            StackEvent::IndexChanged { from: 0, to: 1 },
            StackEvent::IndexChanged { from: 1, to: 2 },
        ]
    );
}

#[test]
fn test_command_during_gesture_survives_refused_reversal() {
    let mut h = Harness::new(3);
    h.wheel_stream(&repeat(10.0, 10), 16.0);
    assert!(h.engine.stack().is_tracking());

    assert!(!h.engine.go_to_section(2));
    assert_eq!(h.engine.stack().buffered(), Some(NavCommand::GoTo(2)));

    // Reversing at the first section has nothing to reveal
    h.wheel_stream(&repeat(-10.0, 10), 16.0);
    h.settle();

    assert_eq!(h.engine.active_index(), 2);
    assert_eq!(h.engine.stack().buffered(), None);
    assert_eq!(h.mounts[2].placement(), Some(Placement::active()));
}

#[test]
fn test_command_during_gesture_runs_after_reversed_gesture() {
    let mut h = Harness::new(3);
    h.engine.go_next();
    h.settle();
    assert_eq!(h.engine.active_index(), 1);

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    h.engine
        .stack_mut()
        .subscribe(move |event| sink.borrow_mut().push(*event));

    h.wheel_stream(&repeat(10.0, 10), 16.0);
    assert!(!h.engine.go_to_section(0));

    h.wheel_stream(&repeat(-10.0, 10), 16.0);
    assert_eq!(h.engine.direction(), Some(Direction::Prev));
    assert!(h.engine.stack().is_tracking());
    assert_eq!(h.engine.stack().buffered(), Some(NavCommand::GoTo(0)));

    h.settle();
    assert_eq!(h.engine.stats().rollbacks, 1);
    assert_eq!(h.engine.active_index(), 0);

    let index_changes: Vec<StackEvent> = log
        .borrow()
        .iter()
        .copied()
        .filter(|event| matches!(event, StackEvent::IndexChanged { .. }))
        .collect();
    assert_eq!(index_changes, vec![StackEvent::IndexChanged { from: 1, to: 0 }]);
}

#[test]
fn test_touch_flick_commits_through_physics() {
    let mut h = Harness::new(3);
    h.touch_drag(700.0, 40.0, 10, 16.0);
    assert!(h.engine.physics().is_active());
    h.settle();
    assert_eq!(h.engine.active_index(), 1);
    assert_eq!(h.engine.stats().commits, 1);
    assert!(!h.engine.physics().is_active());
}

#[test]
fn test_slow_touch_drag_rolls_back() {
    let mut h = Harness::new(3);
    h.touch_drag(700.0, 4.0, 12, 16.0);
    h.settle();
    assert_eq!(h.engine.active_index(), 0);
    assert_eq!(h.engine.stats().rollbacks, 1);
    assert_eq!(h.mounts[0].placement(), Some(Placement::active()));
}

#[test]
fn test_touch_hold_before_release_rolls_back() {
    let mut h = Harness::new(3);
    h.engine.handle_input(InputEvent::TouchStart {
        y: 700.0,
        timestamp_ms: h.now,
    });
    let mut y = 700.0;
    for _ in 0..6 {
        y -= 40.0;
        let t = h.now + FRAME;
        h.engine.handle_input(InputEvent::TouchMove { y, timestamp_ms: t });
        h.frame_at(t);
    }
    assert!(h.engine.physics().velocity() > 1.0);

    // Finger rests for a second, then lifts
    for _ in 0..60 {
        h.frame_at(h.now + FRAME);
    }
    h.engine.handle_input(InputEvent::TouchEnd {
        timestamp_ms: h.now,
    });
    h.settle();

    assert_eq!(h.engine.active_index(), 0);
    assert_eq!(h.engine.stats().rollbacks, 1);
    assert_eq!(h.engine.stats().commits, 0);
    assert_eq!(h.mounts[0].placement(), Some(Placement::active()));
}

#[test]
fn test_wheel_jitter_does_not_delay_following_touch() {
    let mut h = Harness::new(3);
    // Below the start threshold: no gesture, but the idle timer is armed
    h.wheel_stream(&[5.0], 16.0);
    assert!(h.engine.stack().is_resting());

    h.engine.handle_input(InputEvent::TouchStart {
        y: 500.0,
        timestamp_ms: h.now,
    });
    let mut y = 500.0;
    for _ in 0..5 {
        y -= 7.0;
        let t = h.now + 20.0;
        h.engine.handle_input(InputEvent::TouchMove { y, timestamp_ms: t });
        h.frame_at(t);
    }
    // 35px in 80ms crosses the start threshold
    assert!(h.engine.stack().is_tracking());
    assert!(h.engine.physics().is_active());
}

#[test]
fn test_touch_at_first_section_pulling_down_is_refused() {
    let mut h = Harness::new(3);
    h.touch_drag(100.0, -40.0, 5, 16.0);
    assert!(!h.engine.physics().is_active());
    assert!(h.engine.stack().is_resting());
    assert_eq!(h.engine.active_index(), 0);
}

#[test]
fn test_wheel_notches_stop_at_drawer() {
    let mut h = Harness::new(2);
    for _ in 0..4 {
        let t = h.now + 1_500.0;
        h.engine.handle_input(InputEvent::Wheel {
            delta: 120.0,
            timestamp_ms: t,
        });
        h.frame_at(t);
        h.settle();
    }
    assert_eq!(h.engine.active_index(), 1);
    assert!(h.engine.is_drawer_open());
    assert_eq!(h.engine.stats().coarse_flips, 2);
}

#[test]
fn test_runs_under_fixed_timestep_scheduler() {
    let mounts: Vec<SharedMount> = (0..3).map(|_| SharedMount::new()).collect();
    let sections = mounts
        .iter()
        .enumerate()
        .map(|(i, mount)| SectionRecord::new(format!("section-{i}"), mount.clone()))
        .collect();
    let drawer = SectionRecord::new("drawer", SharedMount::new());
    let engine = Rc::new(RefCell::new(
        NavigationEngine::new(NavigationConfig::default(), sections, drawer).unwrap(),
    ));

    let mut scheduler = FrameScheduler::new();
    let mut clock = FixedTimestep::sixty_hz();
    scheduler.subscribe(&engine);

    engine.borrow_mut().go_next();
    let ticks = clock.run_until_idle(&mut scheduler, 500);
    assert!(ticks > 0 && ticks < 500);
    assert_eq!(engine.borrow().active_index(), 1);
    assert_eq!(mounts[1].placement(), Some(Placement::active()));

    // Dropping the engine leaves the loop
    drop(engine);
    scheduler.tick(clock.advance());
    assert_eq!(scheduler.subscriber_count(), 0);
}
