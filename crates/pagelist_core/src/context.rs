//! Shared layout context
//!
//! A `LayoutContext` is the one object every geometry producer and consumer of
//! a list receives by reference. It registers the elements a list measures
//! (sentinels, indicators, rows, the viewport), records their latest frames
//! and owns the scheduler that drives deferred work. Clones share state.
//!
//! ```rust
//! use pagelist_core::context::LayoutContext;
//! use pagelist_core::geometry::Rect;
//!
//! let ctx = LayoutContext::new();
//! let header = ctx.mount("refresh-indicator");
//!
//! ctx.report(header, Rect::new(0.0, 0.0, 320.0, 50.0)).unwrap();
//! assert_eq!(ctx.frame(header).unwrap().height(), 50.0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotmap::{new_key_type, SlotMap};

use crate::error::{LayoutError, Result};
use crate::geometry::{GeometrySample, Rect};
use crate::scheduler::{Scheduler, Timestamp};

new_key_type! {
    /// Identifier of an element measured through a [`LayoutContext`]
    pub struct ElementId;
}

#[derive(Debug, Clone)]
struct ElementSlot {
    label: String,
    frame: Rect,
    updated_at: Option<Timestamp>,
}

/// Registry of measured elements plus the shared scheduler
#[derive(Clone, Default)]
pub struct LayoutContext {
    elements: Arc<Mutex<SlotMap<ElementId, ElementSlot>>>,
    scheduler: Scheduler,
}

impl LayoutContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing scheduler
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            elements: Arc::default(),
            scheduler,
        }
    }

    fn elements(&self) -> MutexGuard<'_, SlotMap<ElementId, ElementSlot>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current scheduler time
    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    /// Register an element. Its frame starts as the zero rect.
    pub fn mount(&self, label: impl Into<String>) -> ElementId {
        let label = label.into();
        tracing::debug!("Mounting element '{}'", label);
        self.elements().insert(ElementSlot {
            label,
            frame: Rect::ZERO,
            updated_at: None,
        })
    }

    /// Remove an element
    pub fn unmount(&self, id: ElementId) -> Result<()> {
        let slot = self
            .elements()
            .remove(id)
            .ok_or(LayoutError::UnknownElement(id))?;
        tracing::debug!("Unmounted element '{}'", slot.label);
        Ok(())
    }

    pub fn is_mounted(&self, id: ElementId) -> bool {
        self.elements().contains_key(id)
    }

    /// Record a new frame for an element and return it as a timestamped sample
    pub fn report(&self, id: ElementId, rect: Rect) -> Result<GeometrySample> {
        let now = self.now();
        let mut elements = self.elements();
        let slot = elements.get_mut(id).ok_or(LayoutError::UnknownElement(id))?;
        slot.frame = rect;
        slot.updated_at = Some(now);
        Ok(GeometrySample::new(rect, now))
    }

    /// Latest frame of an element (zero until first measured)
    pub fn frame(&self, id: ElementId) -> Result<Rect> {
        self.elements()
            .get(id)
            .map(|slot| slot.frame)
            .ok_or(LayoutError::UnknownElement(id))
    }

    /// When the element was last measured
    pub fn updated_at(&self, id: ElementId) -> Result<Option<Timestamp>> {
        self.elements()
            .get(id)
            .map(|slot| slot.updated_at)
            .ok_or(LayoutError::UnknownElement(id))
    }

    pub fn label(&self, id: ElementId) -> Result<String> {
        self.elements()
            .get(id)
            .map(|slot| slot.label.clone())
            .ok_or(LayoutError::UnknownElement(id))
    }

    /// Number of mounted elements
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }
}
