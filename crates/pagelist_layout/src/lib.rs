//! pagelist Layout
//!
//! Gesture-to-state logic for the headless list:
//!
//! - **Debouncing**: collapses bursts of geometry reports per element
//! - **Geometry Streams**: debounced, cancel-on-drop element observers
//! - **Edge Triggers**: refresh and load-more controllers that fire once per gesture
//! - **View State**: placeholder resolution and the render plan
//! - **Lazy List**: the composed component
//!
//! # Quick Start
//!
//! ```rust
//! use pagelist_layout::prelude::*;
//!
//! #[derive(Clone)]
//! struct Item(u64);
//!
//! impl Identifiable for Item {
//!     type Id = u64;
//!     fn id(&self) -> u64 {
//!         self.0
//!     }
//! }
//!
//! let ctx = LayoutContext::new();
//! let config = ListConfig::default()
//!     .with_refresh(RefreshConfig::default())
//!     .with_load_more(LoadMoreConfig::default());
//! let mut list = LazyList::new(&ctx, config).unwrap();
//!
//! list.on_refresh(|request| {
//!     request.complete(true);
//! })
//! .unwrap();
//! list.set_data(Some((0..20).map(Item).collect()));
//!
//! assert_eq!(list.render_plan().row_count, 20);
//! ```

pub mod debounce;
pub mod list;
pub mod stream;
pub mod trigger;
pub mod view_state;

pub use debounce::{DebounceConfig, DebounceExt, Debouncer};
pub use list::{
    Identifiable, LayoutPass, LazyList, ListConfig, ListEvent, LoadMoreConfig, LoadMoreMode,
    RefreshConfig,
};
pub use stream::GeometryStream;
pub use trigger::{
    Edge, EdgeTriggerController, EdgeTriggerState, FetchRequest, PullConfig, Reveal,
    TriggerEvent, TriggerPhase,
};
pub use view_state::{render, Activity, Placeholder, Placeholders, RenderPlan, ViewState, ViewType};

/// Commonly used types
pub mod prelude {
    pub use crate::list::{
        Identifiable, LayoutPass, LazyList, ListConfig, ListEvent, LoadMoreConfig, LoadMoreMode,
        RefreshConfig,
    };
    pub use crate::trigger::{Edge, EdgeTriggerController, FetchRequest, TriggerEvent, TriggerPhase};
    pub use crate::view_state::{RenderPlan, ViewState, ViewType};
    pub use pagelist_animation::{AnimationSpec, ScrollDirection, Timing};
    pub use pagelist_core::{GeometrySample, LayoutContext, Offset, Rect, Scheduler};
}
