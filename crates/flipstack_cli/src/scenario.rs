//! Scenario definition for headless navigation runs.

use anyhow::{bail, Context, Result};
use flipstack_core::NavCommand;
use serde::Deserialize;
use std::path::Path;

fn default_gap_ms() -> f64 {
    16.0
}

fn default_section_count() -> usize {
    3
}

fn default_settle_frames() -> u32 {
    2_000
}

/// One section of the scenario's stack
#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    pub id: String,
    #[serde(default)]
    pub route: Option<String>,
}

/// A stack layout plus the steps to drive through it.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Explicit sections. When empty, `section_count` anonymous ones are used.
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
    #[serde(default = "default_section_count")]
    pub section_count: usize,
    #[serde(default)]
    pub viewport_height: Option<f32>,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load a scenario from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(input)?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Load a scenario from TOML text.
    pub fn from_toml(input: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(input)?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Load a scenario from file. `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&raw),
            _ => Self::from_json(&raw),
        };
        parsed.with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Section specs, generating ids when none were listed
    pub fn section_specs(&self) -> Vec<SectionSpec> {
        if !self.sections.is_empty() {
            return self.sections.clone();
        }
        (0..self.section_count)
            .map(|i| SectionSpec {
                id: format!("section-{i}"),
                route: None,
            })
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.sections.is_empty() && self.section_count == 0 {
            bail!("scenario needs at least one section");
        }
        if let Some(height) = self.viewport_height {
            if !(height.is_finite() && height > 0.0) {
                bail!("viewport_height must be positive, got {height}");
            }
        }
        Ok(())
    }
}

/// Scenario steps. Input steps advance virtual time by their gap and render
/// one frame per event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// A single wheel event
    Wheel {
        delta: f32,
        #[serde(default = "default_gap_ms")]
        gap_ms: f64,
    },
    /// `count` identical wheel events, `gap_ms` apart
    WheelStream {
        delta: f32,
        count: u32,
        #[serde(default = "default_gap_ms")]
        gap_ms: f64,
    },
    /// Finger down at `start_y`, `moves` moves of `step` pixels upward, lift
    TouchDrag {
        start_y: f32,
        step: f32,
        moves: u32,
        #[serde(default = "default_gap_ms")]
        gap_ms: f64,
    },
    /// Key press by name ("down", "page_up", "escape", ...)
    Key {
        name: String,
        #[serde(default)]
        repeat: bool,
    },
    Command { command: NavCommand },
    ClaimScroll { claimed: bool },
    Viewport { height: f32 },
    /// Hand the route of section `index` to the navigator
    FollowLink { index: usize },
    Wait { ms: u64 },
    Tick { frames: u32 },
    /// Render frames until the engine goes idle
    Settle {
        #[serde(default = "default_settle_frames")]
        max_frames: u32,
    },
    AssertIndex { index: usize },
    AssertDrawer { open: bool },
    AssertAnimating { animating: bool },
    AssertIdle,
    AssertRoute { route: String },
}

impl ScenarioStep {
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            ScenarioStep::AssertIndex { .. }
                | ScenarioStep::AssertDrawer { .. }
                | ScenarioStep::AssertAnimating { .. }
                | ScenarioStep::AssertIdle
                | ScenarioStep::AssertRoute { .. }
        )
    }
}
