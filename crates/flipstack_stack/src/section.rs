//! Sections and their render targets
//!
//! The stack never renders. It computes a normalized [`Placement`] per
//! section and hands it to whatever the host mounted behind
//! [`SectionMount`]. Offsets are in viewport heights: `0.0` is on screen,
//! `1.0` is one viewport below, `-1.0` one viewport above.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Stacking order, lowest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Resting and outgoing sections
    #[default]
    Base,
    /// The section being brought in
    Incoming,
    /// The trailing drawer, above everything
    Drawer,
}

/// Where a section sits and whether it is drawn
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub offset: f32,
    pub visible: bool,
    pub layer: Layer,
}

impl Placement {
    pub const fn new(offset: f32, visible: bool, layer: Layer) -> Self {
        Self {
            offset,
            visible,
            layer,
        }
    }

    /// Fully on screen
    pub const fn active() -> Self {
        Self::new(0.0, true, Layer::Base)
    }

    /// Parked one viewport away and drawn (an adjacent section)
    pub const fn adjacent(side: f32) -> Self {
        Self::new(side, true, Layer::Base)
    }

    /// Parked one viewport away and hidden
    pub const fn parked(side: f32) -> Self {
        Self::new(side, false, Layer::Base)
    }
}

/// A host render target
pub trait SectionMount {
    /// Apply a new placement
    fn apply(&mut self, placement: Placement);

    /// Whether the target currently exists. Unmounted targets receive no writes.
    fn is_mounted(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct MountState {
    placement: Option<Placement>,
    writes: u64,
    unmounted: bool,
}

/// Shareable in-memory mount.
///
/// The stack keeps one handle; the host keeps a clone and reads placements
/// back when rendering. Also what headless runs and tests mount.
#[derive(Clone, Debug, Default)]
pub struct SharedMount(Rc<RefCell<MountState>>);

impl SharedMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last placement written, if any
    pub fn placement(&self) -> Option<Placement> {
        self.0.borrow().placement
    }

    /// Number of placement writes received
    pub fn write_count(&self) -> u64 {
        self.0.borrow().writes
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.0.borrow_mut().unmounted = !mounted;
    }
}

impl SectionMount for SharedMount {
    fn apply(&mut self, placement: Placement) {
        let mut state = self.0.borrow_mut();
        state.placement = Some(placement);
        state.writes += 1;
    }

    fn is_mounted(&self) -> bool {
        !self.0.borrow().unmounted
    }
}

/// One section (or the drawer) of the stack
pub struct SectionRecord {
    id: String,
    route: Option<String>,
    mount: Box<dyn SectionMount>,
    applied: Option<Placement>,
}

impl SectionRecord {
    pub fn new(id: impl Into<String>, mount: impl SectionMount + 'static) -> Self {
        Self {
            id: id.into(),
            route: None,
            mount: Box::new(mount),
            applied: None,
        }
    }

    /// Attach the route a link inside this section navigates to
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Placement last delivered to the mount
    pub fn placement(&self) -> Option<Placement> {
        self.applied
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }

    /// Write `placement` if it differs from the last one delivered.
    /// Returns whether a write happened.
    pub(crate) fn place(&mut self, placement: Placement) -> bool {
        if self.applied == Some(placement) || !self.mount.is_mounted() {
            return false;
        }
        self.mount.apply(placement);
        self.applied = Some(placement);
        true
    }

    /// Forget the delivered placement so the next write always goes through
    pub(crate) fn invalidate(&mut self) {
        self.applied = None;
    }
}

impl std::fmt::Debug for SectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionRecord")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}
