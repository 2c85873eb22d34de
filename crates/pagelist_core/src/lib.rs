//! pagelist Core Runtime
//!
//! Foundational primitives for the headless pagelist component:
//!
//! - **Geometry**: rects, offsets and timestamped samples in list-local space
//! - **Layout Context**: shared registry of measured elements plus the scheduler
//! - **Scheduler**: deterministic, cancel-on-drop deferred callbacks
//! - **State Machines**: typed transitions with bounded history
//! - **Listeners**: synchronous subscription registries
//! - **Pagination**: fail-closed page windows over in-memory sources
//!
//! # Example
//!
//! ```rust
//! use pagelist_core::pagination::paginate;
//!
//! let users: Vec<u32> = (1..=100).collect();
//! let page = paginate(&users, 95, 20);
//!
//! assert_eq!(page.items, vec![96, 97, 98, 99, 100]);
//! assert_eq!(page.total_count, 100);
//! ```

pub mod context;
pub mod error;
pub mod events;
pub mod fsm;
pub mod geometry;
pub mod pagination;
pub mod scheduler;

pub use context::{ElementId, LayoutContext};
pub use error::{LayoutError, Result};
pub use events::{EventType, ListenerId, Listeners};
pub use fsm::{StateMachine, StateTransitions};
pub use geometry::{GeometrySample, Offset, Point, Rect, Size};
pub use pagination::{paginate, Page, PageRequest, PageSource};
pub use scheduler::{Scheduler, TimerGuard, TimerId, Timestamp};
