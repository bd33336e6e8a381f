//! Navigation configuration
//!
//! One TOML document tunes every stage of the pipeline:
//!
//! ```toml
//! [gesture]
//! transition_distance = 900.0
//!
//! [decision]
//! snap_threshold = 0.35
//!
//! [stack]
//! easing = "ease_out_quart"
//!
//! [keys.bindings]
//! j = "next"
//! k = "prev"
//! ```
//!
//! Missing tables and fields take their defaults.

use std::collections::BTreeMap;
use std::path::Path;

use flipstack_animation::{Easing, PhysicsConfig};
use flipstack_core::error::{ensure_positive, ConfigError, Result};
use flipstack_core::{KeyBindings, KeyCode, NavCommand};
use flipstack_gesture::{ClassifierConfig, DecisionConfig, GestureConfig};
use serde::{Deserialize, Serialize};

/// Section stack transition timing
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Duration of button, key and wheel-notch transitions
    pub button_transition_ms: f32,
    /// Duration of a full-distance gesture completion
    pub gesture_transition_ms: f32,
    /// Shortest gesture completion
    pub min_transition_ms: f32,
    pub easing: Easing,
    /// Run the latest command rejected during a transition once it settles
    pub buffer_commands: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            button_transition_ms: 600.0,
            gesture_transition_ms: 350.0,
            min_transition_ms: 120.0,
            easing: Easing::EaseOutCubic,
            buffer_commands: true,
        }
    }
}

impl StackConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("stack.button_transition_ms", self.button_transition_ms)?;
        ensure_positive("stack.gesture_transition_ms", self.gesture_transition_ms)?;
        ensure_positive("stack.min_transition_ms", self.min_transition_ms)?;
        if self.min_transition_ms > self.gesture_transition_ms {
            return Err(ConfigError::invalid(
                "stack.min_transition_ms",
                "must not exceed stack.gesture_transition_ms",
            ));
        }
        Ok(())
    }
}

/// Keyboard bindings by key name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub allow_repeat: bool,
    /// Key name ("down", "page_up", "escape", ...) to command
    pub bindings: BTreeMap<String, NavCommand>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        let bindings = [
            ("down", NavCommand::Next),
            ("page_down", NavCommand::Next),
            ("space", NavCommand::Next),
            ("up", NavCommand::Prev),
            ("page_up", NavCommand::Prev),
            ("home", NavCommand::First),
            ("end", NavCommand::Last),
            ("escape", NavCommand::CloseDrawer),
        ]
        .into_iter()
        .map(|(name, command)| (name.to_string(), command))
        .collect();

        Self {
            allow_repeat: false,
            bindings,
        }
    }
}

impl KeyConfig {
    /// Resolve key names into a lookup table
    pub fn to_bindings(&self) -> Result<KeyBindings> {
        let mut bindings = KeyBindings::empty();
        bindings.allow_repeat = self.allow_repeat;
        for (name, command) in &self.bindings {
            let key = KeyCode::from_name(name).ok_or_else(|| {
                ConfigError::invalid("keys.bindings", format!("unknown key `{name}`"))
            })?;
            bindings = bindings.bind(key, *command);
        }
        Ok(bindings)
    }
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub classifier: ClassifierConfig,
    pub gesture: GestureConfig,
    pub decision: DecisionConfig,
    pub physics: PhysicsConfig,
    pub stack: StackConfig,
    pub keys: KeyConfig,
}

impl NavigationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: NavigationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            self.classifier.validate(),
            self.gesture.validate(),
            self.decision.validate(),
            self.physics.validate(),
            self.stack.validate(),
            self.keys.to_bindings().map(|_| ()),
        ];
        for check in checks {
            if let Err(err) = check {
                tracing::warn!("rejected navigation config: {}", err);
                return Err(err);
            }
        }
        Ok(())
    }
}
