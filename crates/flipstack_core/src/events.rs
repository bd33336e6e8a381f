//! Input events
//!
//! Platform-agnostic input delivered by the host. Hosts translate their native
//! wheel/pointer/touch/keydown events into [`InputEvent`] and hand them to the
//! navigation engine in arrival order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Direction of travel through the section stack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward higher indices (scroll down, swipe up)
    Next,
    /// Toward lower indices (scroll up, swipe down)
    Prev,
}

impl Direction {
    /// Direction implied by a signed delta. Positive deltas move forward.
    ///
    /// Returns `None` for zero and non-finite deltas.
    pub fn from_delta(delta: f32) -> Option<Direction> {
        if !delta.is_finite() || delta == 0.0 {
            None
        } else if delta > 0.0 {
            Some(Direction::Next)
        } else {
            Some(Direction::Prev)
        }
    }

    /// +1.0 for `Next`, -1.0 for `Prev`
    pub fn sign(self) -> f32 {
        match self {
            Direction::Next => 1.0,
            Direction::Prev => -1.0,
        }
    }

    pub fn reversed(self) -> Direction {
        match self {
            Direction::Next => Direction::Prev,
            Direction::Prev => Direction::Next,
        }
    }
}

/// Device class a gesture session originates from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Discrete, large-delta input (mouse wheel notches)
    Coarse,
    /// Streamed, small-delta input (trackpad, touch)
    Continuous,
}

/// A host input event
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Wheel or trackpad scroll. Positive `delta` scrolls forward.
    Wheel { delta: f32, timestamp_ms: f64 },
    /// Finger down at vertical position `y`
    TouchStart { y: f32, timestamp_ms: f64 },
    /// Finger moved to vertical position `y`
    TouchMove { y: f32, timestamp_ms: f64 },
    /// Finger lifted
    TouchEnd { timestamp_ms: f64 },
    /// Key pressed
    Key { key: KeyCode, repeat: bool },
}

impl InputEvent {
    /// Timestamp carried by the event, if any
    pub fn timestamp_ms(&self) -> Option<f64> {
        match self {
            InputEvent::Wheel { timestamp_ms, .. }
            | InputEvent::TouchStart { timestamp_ms, .. }
            | InputEvent::TouchMove { timestamp_ms, .. }
            | InputEvent::TouchEnd { timestamp_ms } => Some(*timestamp_ms),
            InputEvent::Key { .. } => None,
        }
    }
}

/// Virtual key codes (platform-agnostic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);

    // Arrow keys
    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);

    // Navigation keys
    pub const HOME: KeyCode = KeyCode(0x24);
    pub const END: KeyCode = KeyCode(0x23);
    pub const PAGE_UP: KeyCode = KeyCode(0x21);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x22);

    pub const UNKNOWN: KeyCode = KeyCode(0);

    /// Look up a key by its lowercase name ("down", "page_up", "escape", ...)
    pub fn from_name(name: &str) -> Option<KeyCode> {
        let key = match name.to_ascii_lowercase().as_str() {
            "enter" => Self::ENTER,
            "escape" | "esc" => Self::ESCAPE,
            "space" => Self::SPACE,
            "left" => Self::LEFT,
            "up" => Self::UP,
            "right" => Self::RIGHT,
            "down" => Self::DOWN,
            "home" => Self::HOME,
            "end" => Self::END,
            "page_up" | "pageup" => Self::PAGE_UP,
            "page_down" | "pagedown" => Self::PAGE_DOWN,
            _ => return None,
        };
        Some(key)
    }
}

/// Discrete navigation command issued by keys and buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavCommand {
    Next,
    Prev,
    First,
    Last,
    GoTo(usize),
    OpenDrawer,
    CloseDrawer,
}

/// Key → command table consulted for `InputEvent::Key`
#[derive(Clone, Debug)]
pub struct KeyBindings {
    bindings: FxHashMap<KeyCode, NavCommand>,
    /// Whether auto-repeated key events trigger commands
    pub allow_repeat: bool,
}

impl KeyBindings {
    /// An empty table
    pub fn empty() -> Self {
        Self {
            bindings: FxHashMap::default(),
            allow_repeat: false,
        }
    }

    /// Bind a key, replacing any previous binding
    pub fn bind(mut self, key: KeyCode, command: NavCommand) -> Self {
        self.bindings.insert(key, command);
        self
    }

    pub fn unbind(&mut self, key: KeyCode) -> Option<NavCommand> {
        self.bindings.remove(&key)
    }

    /// Command for a key press, honouring `allow_repeat`
    pub fn lookup(&self, key: KeyCode, repeat: bool) -> Option<NavCommand> {
        if repeat && !self.allow_repeat {
            return None;
        }
        self.bindings.get(&key).copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::empty()
            .bind(KeyCode::DOWN, NavCommand::Next)
            .bind(KeyCode::PAGE_DOWN, NavCommand::Next)
            .bind(KeyCode::SPACE, NavCommand::Next)
            .bind(KeyCode::UP, NavCommand::Prev)
            .bind(KeyCode::PAGE_UP, NavCommand::Prev)
            .bind(KeyCode::HOME, NavCommand::First)
            .bind(KeyCode::END, NavCommand::Last)
            .bind(KeyCode::ESCAPE, NavCommand::CloseDrawer)
    }
}
