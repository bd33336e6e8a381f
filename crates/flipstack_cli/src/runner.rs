//! Scenario runner that drives a navigation engine on virtual time.

use crate::report::RunReport;
use crate::scenario::{Scenario, ScenarioStep};
use anyhow::{bail, Context, Result};
use flipstack_core::{InputEvent, KeyCode};
use flipstack_stack::{
    NavigationConfig, NavigationEngine, Navigator, SectionRecord, SharedMount,
};

/// Runner settings
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Virtual frame rate
    pub fps: u32,
}

impl RunConfig {
    pub fn frame_ms(&self) -> f64 {
        1000.0 / f64::from(self.fps.max(1))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

/// Final outcome of a scenario run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Passed { report: RunReport },
    Failed { report: RunReport },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Passed { report } => report,
            RunOutcome::Failed { report } => report,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

/// Collects the routes the engine hands out
#[derive(Debug, Default)]
struct RecordingNavigator {
    routes: Vec<String>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, route: &str) {
        self.routes.push(route.to_string());
    }
}

/// A failed assertion: its name and message
type Failure = (&'static str, String);

struct Run {
    engine: NavigationEngine,
    navigator: RecordingNavigator,
    frame_ms: f64,
    now: f64,
    frames: u64,
}

impl Run {
    fn new(scenario: &Scenario, config: NavigationConfig, run_cfg: RunConfig) -> Result<Self> {
        let sections = scenario
            .section_specs()
            .into_iter()
            .map(|spec| {
                let record = SectionRecord::new(spec.id, SharedMount::new());
                match spec.route {
                    Some(route) => record.with_route(route),
                    None => record,
                }
            })
            .collect();
        let drawer = SectionRecord::new("drawer", SharedMount::new());
        let mut engine = NavigationEngine::new(config, sections, drawer)
            .context("failed to build navigation engine")?;
        if let Some(height) = scenario.viewport_height {
            engine.set_viewport_height(height);
        }
        engine.on_frame(0.0);

        Ok(Self {
            engine,
            navigator: RecordingNavigator::default(),
            frame_ms: run_cfg.frame_ms(),
            now: 0.0,
            frames: 0,
        })
    }

    fn frame_at(&mut self, now: f64) {
        self.now = now;
        self.frames += 1;
        self.engine.on_frame(now);
    }

    fn input_at(&mut self, event: InputEvent, now: f64) {
        self.engine.handle_input(event);
        self.frame_at(now);
    }

    fn step(&mut self, step: &ScenarioStep) -> Result<Option<Failure>> {
        match step {
            ScenarioStep::Wheel { delta, gap_ms } => {
                let t = self.now + gap_ms;
                self.input_at(
                    InputEvent::Wheel {
                        delta: *delta,
                        timestamp_ms: t,
                    },
                    t,
                );
            }
            ScenarioStep::WheelStream {
                delta,
                count,
                gap_ms,
            } => {
                for _ in 0..*count {
                    let t = self.now + gap_ms;
                    self.input_at(
                        InputEvent::Wheel {
                            delta: *delta,
                            timestamp_ms: t,
                        },
                        t,
                    );
                }
            }
            ScenarioStep::TouchDrag {
                start_y,
                step,
                moves,
                gap_ms,
            } => {
                self.engine.handle_input(InputEvent::TouchStart {
                    y: *start_y,
                    timestamp_ms: self.now,
                });
                let mut y = *start_y;
                for _ in 0..*moves {
                    y -= step;
                    let t = self.now + gap_ms;
                    self.input_at(InputEvent::TouchMove { y, timestamp_ms: t }, t);
                }
                self.engine.handle_input(InputEvent::TouchEnd {
                    timestamp_ms: self.now,
                });
            }
            ScenarioStep::Key { name, repeat } => {
                let Some(key) = KeyCode::from_name(name) else {
                    bail!("unknown key name {name:?}");
                };
                self.engine.handle_input(InputEvent::Key {
                    key,
                    repeat: *repeat,
                });
            }
            ScenarioStep::Command { command } => {
                self.engine.command(*command);
            }
            ScenarioStep::ClaimScroll { claimed } => {
                self.engine.set_scroll_claimed(*claimed);
            }
            ScenarioStep::Viewport { height } => {
                if !(height.is_finite() && *height > 0.0) {
                    bail!("viewport height must be positive, got {height}");
                }
                self.engine.set_viewport_height(*height);
            }
            ScenarioStep::FollowLink { index } => {
                if !self
                    .engine
                    .follow_section_link(*index, &mut self.navigator)
                {
                    return Ok(Some((
                        "follow_link",
                        format!("section {index} has no route"),
                    )));
                }
            }
            ScenarioStep::Wait { ms } => {
                let end = self.now + *ms as f64;
                while self.now < end {
                    let next = (self.now + self.frame_ms).min(end);
                    self.frame_at(next);
                }
            }
            ScenarioStep::Tick { frames } => {
                for _ in 0..*frames {
                    self.frame_at(self.now + self.frame_ms);
                }
            }
            ScenarioStep::Settle { max_frames } => {
                let mut frames = 0;
                while self.engine.is_active() {
                    if frames >= *max_frames {
                        return Ok(Some((
                            "settle",
                            format!("engine still active after {max_frames} frames"),
                        )));
                    }
                    self.frame_at(self.now + self.frame_ms);
                    frames += 1;
                }
            }
            ScenarioStep::AssertIndex { index } => {
                let actual = self.engine.active_index();
                if actual != *index {
                    return Ok(Some((
                        "assert_index",
                        format!("expected active index {index}, found {actual}"),
                    )));
                }
            }
            ScenarioStep::AssertDrawer { open } => {
                let actual = self.engine.is_drawer_open();
                if actual != *open {
                    return Ok(Some((
                        "assert_drawer",
                        format!("expected drawer open={open}, found open={actual}"),
                    )));
                }
            }
            ScenarioStep::AssertAnimating { animating } => {
                let actual = self.engine.is_animating();
                if actual != *animating {
                    return Ok(Some((
                        "assert_animating",
                        format!("expected animating={animating}, found animating={actual}"),
                    )));
                }
            }
            ScenarioStep::AssertIdle => {
                if self.engine.is_active() {
                    let state = self.engine.stack().state();
                    return Ok(Some((
                        "assert_idle",
                        format!("engine still active, stack {state:?}"),
                    )));
                }
            }
            ScenarioStep::AssertRoute { route } => {
                match self.navigator.routes.last() {
                    Some(last) if last == route => {}
                    Some(last) => {
                        return Ok(Some((
                            "assert_route",
                            format!("expected route {route:?}, last route was {last:?}"),
                        )));
                    }
                    None => {
                        return Ok(Some((
                            "assert_route",
                            format!("expected route {route:?}, no route was followed"),
                        )));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Execute a pre-loaded scenario.
pub fn run_loaded_scenario(
    scenario: &Scenario,
    config: NavigationConfig,
    run_cfg: RunConfig,
) -> Result<RunOutcome> {
    let mut run = Run::new(scenario, config, run_cfg)?;

    for (step_index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!("step {}: {:?}", step_index, step);
        let failure = run
            .step(step)
            .with_context(|| format!("step {step_index} failed to run"))?;
        if let Some((assertion, message)) = failure {
            tracing::warn!("step {} {} failed: {}", step_index, assertion, message);
            let report = RunReport::failed(
                assertion,
                step_index,
                message,
                run.frames,
                run.now,
                run.navigator.routes.clone(),
                run.engine.snapshot(),
            );
            return Ok(RunOutcome::Failed { report });
        }
    }

    Ok(RunOutcome::Passed {
        report: RunReport::passed(
            run.frames,
            run.now,
            run.navigator.routes.clone(),
            run.engine.snapshot(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_scenario(input: &str) -> Result<RunOutcome> {
        let scenario = Scenario::from_json(input)?;
        run_loaded_scenario(&scenario, NavigationConfig::default(), RunConfig::default())
    }

    #[test]
    fn test_half_distance_pause_rolls_back() {
        let outcome = run_scenario(
            r#"{
                "steps": [
                    { "type": "wheel_stream", "delta": 5.0, "count": 78 },
                    { "type": "wheel_stream", "delta": 0.5, "count": 20 },
                    { "type": "assert_animating", "animating": false },
                    { "type": "settle" },
                    { "type": "assert_index", "index": 0 },
                    { "type": "assert_idle" }
                ]
            }"#,
        )
        .unwrap();
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
        let report = outcome.report();
        assert_eq!(report.final_state.stats.rollbacks, 1);
        assert!(report.elapsed_frames > 98);
    }

    #[test]
    fn test_failed_assertion_reports_step() {
        let outcome = run_scenario(
            r#"{
                "steps": [
                    { "type": "key", "name": "down" },
                    { "type": "settle" },
                    { "type": "assert_index", "index": 2 }
                ]
            }"#,
        )
        .unwrap();
        assert!(outcome.is_failed());
        let report = outcome.report();
        assert_eq!(report.failed_step_index, Some(2));
        assert_eq!(report.assertion.as_deref(), Some("assert_index"));
        assert_eq!(
            report.message.as_deref(),
            Some("expected active index 2, found 1")
        );
        assert_eq!(report.status, crate::report::ReportStatus::Failed);
    }

    #[test]
    fn test_notches_reach_drawer() {
        let outcome = run_scenario(
            r#"{
                "section_count": 2,
                "steps": [
                    { "type": "wheel", "delta": 120.0 },
                    { "type": "settle" },
                    { "type": "wait", "ms": 1500 },
                    { "type": "wheel", "delta": 120.0 },
                    { "type": "settle" },
                    { "type": "assert_index", "index": 1 },
                    { "type": "assert_drawer", "open": true }
                ]
            }"#,
        )
        .unwrap();
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
    }

    #[test]
    fn test_follow_link_closes_drawer() {
        let outcome = run_scenario(
            r#"{
                "sections": [
                    { "id": "hero", "route": "/collections" },
                    { "id": "story" }
                ],
                "steps": [
                    { "type": "command", "command": "next" },
                    { "type": "settle" },
                    { "type": "command", "command": "open_drawer" },
                    { "type": "settle" },
                    { "type": "assert_drawer", "open": true },
                    { "type": "follow_link", "index": 0 },
                    { "type": "settle" },
                    { "type": "assert_drawer", "open": false },
                    { "type": "assert_route", "route": "/collections" }
                ]
            }"#,
        )
        .unwrap();
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
        assert_eq!(outcome.report().routes, vec!["/collections".to_string()]);
    }

    #[test]
    fn test_missing_route_fails() {
        let outcome = run_scenario(
            r#"{ "steps": [{ "type": "follow_link", "index": 1 }] }"#,
        )
        .unwrap();
        assert!(outcome.is_failed());
        assert_eq!(outcome.report().assertion.as_deref(), Some("follow_link"));
    }

    #[test]
    fn test_claimed_scroll_ignores_wheel() {
        let outcome = run_scenario(
            r#"{
                "steps": [
                    { "type": "claim_scroll", "claimed": true },
                    { "type": "wheel", "delta": 120.0 },
                    { "type": "settle" },
                    { "type": "assert_index", "index": 0 },
                    { "type": "claim_scroll", "claimed": false },
                    { "type": "wait", "ms": 1500 },
                    { "type": "wheel", "delta": 120.0 },
                    { "type": "settle" },
                    { "type": "assert_index", "index": 1 }
                ]
            }"#,
        )
        .unwrap();
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let err = run_scenario(r#"{ "steps": [{ "type": "key", "name": "f13" }] }"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown key name"));
    }

    #[test]
    fn test_wait_advances_virtual_time() {
        let scenario = Scenario::from_json(r#"{ "steps": [{ "type": "wait", "ms": 100 }] }"#)
            .unwrap();
        let outcome = run_loaded_scenario(
            &scenario,
            NavigationConfig::default(),
            RunConfig { fps: 40 },
        )
        .unwrap();
        let report = outcome.report();
        assert_eq!(report.elapsed_ms, 100.0);
        assert_eq!(report.elapsed_frames, 4);
    }
}
