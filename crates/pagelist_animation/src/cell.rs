//! Per-row appearance state
//!
//! A `CellAnimator` remembers whether its row has been on screen and turns
//! each appearance into the offset the row should slide in from.

use pagelist_core::events::element_events::{APPEAR, DISAPPEAR};
use pagelist_core::events::EventType;
use pagelist_core::fsm::{StateMachine, StateTransitions};
use pagelist_core::geometry::Offset;

use crate::direction::ScrollDirection;
use crate::offset::resolve_offset;
use crate::spec::{AnimationSpec, Timing};

/// Visibility of a row over its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellVisibility {
    /// Never appeared yet
    #[default]
    Unseen,
    /// In the viewport
    Visible,
    /// Appeared before, currently off screen
    Departed,
}

impl StateTransitions for CellVisibility {
    fn on_event(&self, event: EventType) -> Option<Self> {
        match (self, event) {
            (CellVisibility::Unseen, APPEAR) => Some(CellVisibility::Visible),
            (CellVisibility::Departed, APPEAR) => Some(CellVisibility::Visible),
            (CellVisibility::Visible, DISAPPEAR) => Some(CellVisibility::Departed),
            _ => None,
        }
    }
}

/// Appearance animation state for one row
#[derive(Debug, Clone)]
pub struct CellAnimator {
    spec: AnimationSpec,
    travel: f32,
    visibility: StateMachine<CellVisibility>,
}

impl CellAnimator {
    pub fn new(spec: AnimationSpec, travel: f32) -> Self {
        Self {
            spec,
            travel,
            visibility: StateMachine::new(CellVisibility::Unseen),
        }
    }

    pub fn spec(&self) -> AnimationSpec {
        self.spec
    }

    pub fn visibility(&self) -> CellVisibility {
        self.visibility.current()
    }

    /// Whether the next appearance should skip the slide-in
    ///
    /// `Once` rows count as visible forever after their first appearance;
    /// `Always` rows only while they are on screen.
    pub fn already_visible(&self) -> bool {
        match (self.spec.timing(), self.visibility.current()) {
            (_, CellVisibility::Visible) => true,
            (Timing::Once, CellVisibility::Departed) => true,
            (_, _) => false,
        }
    }

    /// Row entered the viewport; returns the offset to animate from
    pub fn appear(&mut self, direction: ScrollDirection) -> Offset {
        let offset = resolve_offset(self.spec, direction, self.already_visible(), self.travel);
        self.visibility.send(APPEAR);
        offset
    }

    /// Row entered the viewport while animations are suppressed
    ///
    /// Marks the row as seen without producing an offset.
    pub fn appear_still(&mut self) {
        self.visibility.send(APPEAR);
    }

    /// Row left the viewport
    pub fn disappear(&mut self) {
        self.visibility.send(DISAPPEAR);
    }
}
