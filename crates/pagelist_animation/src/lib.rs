//! pagelist Animation
//!
//! Row appearance animation for the headless list. Timing curves belong to
//! the host renderer; this crate only decides where a row starts from.
//!
//! # Features
//!
//! - **Specs**: none, auto, from top/bottom (once or always), from left/right
//! - **Direction Tracking**: toward top / toward bottom from position samples
//! - **Offset Resolution**: pure table from (spec, direction, visibility)
//! - **Cell State**: per-row visibility machine honouring once/always timing

pub mod cell;
pub mod direction;
pub mod offset;
pub mod spec;

pub use cell::{CellAnimator, CellVisibility};
pub use direction::{direction_between, ScrollDirection, ScrollDirectionTracker};
pub use offset::resolve_offset;
pub use spec::{AnimationSpec, Timing, DEFAULT_TRAVEL_DISTANCE};
