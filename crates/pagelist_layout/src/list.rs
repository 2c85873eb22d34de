//! Headless lazy list
//!
//! `LazyList` wires the pieces of this crate into one component: a refresh
//! controller on the top edge, a load-more controller on the bottom edge,
//! debounced sentinel streams feeding them, per-row appearance animators and
//! the view state that drives placeholders.
//!
//! The host reports frames every layout pass and forwards row visibility; the
//! list answers with row offsets and a [`RenderPlan`].
//!
//! # Coordination
//!
//! - a controller only fires while the other one is idle
//! - firing a refresh re-arms a load-more controller that had run out of pages
//! - row animations are suppressed while either controller is fetching
//!
//! # Example
//!
//! ```rust
//! use pagelist_core::context::LayoutContext;
//! use pagelist_core::geometry::Rect;
//! use pagelist_layout::list::{Identifiable, LazyList, ListConfig, RefreshConfig};
//! use pagelist_layout::view_state::ViewState;
//!
//! #[derive(Clone)]
//! struct User {
//!     id: u32,
//! }
//!
//! impl Identifiable for User {
//!     type Id = u32;
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//! }
//!
//! let ctx = LayoutContext::new();
//! let config = ListConfig::default().with_refresh(RefreshConfig::default());
//! let mut list: LazyList<User> = LazyList::new(&ctx, config).unwrap();
//! assert_eq!(list.view_state(), ViewState::Loading);
//!
//! list.set_data(Some(vec![User { id: 1 }, User { id: 2 }]));
//! assert_eq!(list.view_state(), ViewState::List { rows: 2 });
//!
//! list.report_refresh_indicator(Rect::new(0.0, 0.0, 320.0, 50.0)).unwrap();
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use pagelist_animation::{
    AnimationSpec, CellAnimator, ScrollDirection, ScrollDirectionTracker, DEFAULT_TRAVEL_DISTANCE,
};
use pagelist_core::context::{ElementId, LayoutContext};
use pagelist_core::error::{LayoutError, Result};
use pagelist_core::events::{ListenerId, Listeners};
use pagelist_core::geometry::{Offset, Rect};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::debounce::DebounceConfig;
use crate::stream::GeometryStream;
use crate::trigger::{
    Edge, EdgeTriggerController, FetchRequest, PullConfig, TriggerEvent, DEFAULT_COOLDOWN_MS,
    LOAD_MORE_FIRE_DELAY_MS, REFRESH_ENGAGE_OFFSET,
};
use crate::view_state::{render, Activity, Placeholders, RenderPlan, ViewState};

/// Pull distance past the indicator edge that fires `OnLastRow` load-more
pub const LAST_ROW_TRIGGER_DISTANCE: f32 = 18.0;

// ============================================================================
// Configuration
// ============================================================================

/// What the load-more sentinel is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMoreMode {
    /// A footer below the last row, pulled up past the bottom edge
    #[default]
    OnPullUp,
    /// The last row itself, once it is inside the viewport
    OnLastRow,
}

impl LoadMoreMode {
    /// Fixed trigger distance, if the mode ignores the indicator height
    pub fn trigger_distance(&self) -> Option<f32> {
        match self {
            LoadMoreMode::OnPullUp => None,
            LoadMoreMode::OnLastRow => Some(LAST_ROW_TRIGGER_DISTANCE),
        }
    }
}

/// Pull-to-refresh settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default)]
    pub trigger_margin: f32,
    #[serde(default = "default_engage_offset")]
    pub engage_offset: f32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            trigger_margin: 0.0,
            engage_offset: REFRESH_ENGAGE_OFFSET,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl RefreshConfig {
    pub fn pull_config(&self) -> PullConfig {
        PullConfig::refresh(Rect::ZERO)
            .with_trigger_margin(self.trigger_margin)
            .with_engage_offset(self.engage_offset)
            .with_cooldown_ms(self.cooldown_ms)
    }
}

/// Load-more settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadMoreConfig {
    #[serde(default)]
    pub mode: LoadMoreMode,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_fire_delay_ms")]
    pub fire_delay_ms: u64,
}

impl Default for LoadMoreConfig {
    fn default() -> Self {
        Self {
            mode: LoadMoreMode::OnPullUp,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            fire_delay_ms: LOAD_MORE_FIRE_DELAY_MS,
        }
    }
}

impl LoadMoreConfig {
    pub fn with_mode(mut self, mode: LoadMoreMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn pull_config(&self) -> PullConfig {
        PullConfig::load_more(Rect::ZERO)
            .with_trigger_distance(self.mode.trigger_distance())
            .with_cooldown_ms(self.cooldown_ms)
            .with_fire_delay_ms(self.fire_delay_ms)
    }
}

/// Complete list configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default)]
    pub animation: AnimationSpec,
    /// Distance rows slide in from
    #[serde(default = "default_travel")]
    pub travel: f32,
    /// Pull-to-refresh, disabled when absent
    #[serde(default)]
    pub refresh: Option<RefreshConfig>,
    /// Load more, disabled when absent
    #[serde(default)]
    pub load_more: Option<LoadMoreConfig>,
    #[serde(default)]
    pub placeholders: Placeholders,
    #[serde(default)]
    pub debounce: DebounceConfig,
}

fn default_engage_offset() -> f32 {
    REFRESH_ENGAGE_OFFSET
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_fire_delay_ms() -> u64 {
    LOAD_MORE_FIRE_DELAY_MS
}

fn default_travel() -> f32 {
    DEFAULT_TRAVEL_DISTANCE
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            animation: AnimationSpec::None,
            travel: DEFAULT_TRAVEL_DISTANCE,
            refresh: None,
            load_more: None,
            placeholders: Placeholders::default(),
            debounce: DebounceConfig::default(),
        }
    }
}

impl ListConfig {
    pub fn with_animation(mut self, animation: AnimationSpec) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn with_load_more(mut self, load_more: LoadMoreConfig) -> Self {
        self.load_more = Some(load_more);
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.travel.is_finite() || self.travel < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "travel distance must be finite and non-negative: {}",
                self.travel
            )));
        }
        if let Some(load_more) = &self.load_more {
            load_more.pull_config().validate()?;
        }
        if let Some(refresh) = &self.refresh {
            refresh.pull_config().validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Items a list can track animation state for
pub trait Identifiable {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
}

/// Notification delivered to list listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListEvent {
    ViewStateChanged { from: ViewState, to: ViewState },
    Trigger { edge: Edge, event: TriggerEvent },
}

type SharedListeners = Arc<Listeners<ListEvent>>;

fn emit(listeners: &SharedListeners, event: ListEvent) {
    listeners.emit(event);
}

/// Frames measured in one layout pass. Absent fields are not reported.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutPass {
    pub viewport: Option<Rect>,
    pub refresh_indicator: Option<Rect>,
    pub refresh_sentinel: Option<Rect>,
    pub load_more_indicator: Option<Rect>,
    pub load_more_sentinel: Option<Rect>,
}

// ============================================================================
// List
// ============================================================================

struct EdgeBinding {
    controller: EdgeTriggerController,
    sentinel: GeometryStream,
    indicator: ElementId,
}

impl EdgeBinding {
    fn mount(
        ctx: &LayoutContext,
        edge: Edge,
        config: PullConfig,
        debounce: DebounceConfig,
    ) -> Result<Self> {
        let (controller, sentinel, indicator) = match edge {
            Edge::Top => (
                EdgeTriggerController::refresh(config, ctx.scheduler().clone())?,
                "refresh-sentinel",
                "refresh-indicator",
            ),
            Edge::Bottom => (
                EdgeTriggerController::load_more(config, ctx.scheduler().clone())?,
                "load-more-sentinel",
                "load-more-indicator",
            ),
        };
        Ok(Self {
            controller,
            sentinel: GeometryStream::mount(ctx, sentinel, debounce),
            indicator: ctx.mount(indicator),
        })
    }
}

/// Headless list with refresh, load-more and row animations
pub struct LazyList<T: Identifiable> {
    ctx: LayoutContext,
    config: ListConfig,
    data: Option<Vec<T>>,
    view_state: ViewState,
    viewport: ElementId,
    refresh: Option<EdgeBinding>,
    load_more: Option<EdgeBinding>,
    cells: FxHashMap<T::Id, CellAnimator>,
    direction: ScrollDirectionTracker,
    listeners: SharedListeners,
}

impl<T: Identifiable> LazyList<T> {
    pub fn new(ctx: &LayoutContext, config: ListConfig) -> Result<Self> {
        config.validate()?;

        let refresh = config
            .refresh
            .map(|c| EdgeBinding::mount(ctx, Edge::Top, c.pull_config(), config.debounce))
            .transpose()?;
        let load_more = config
            .load_more
            .map(|c| EdgeBinding::mount(ctx, Edge::Bottom, c.pull_config(), config.debounce))
            .transpose()?;

        let list = Self {
            ctx: ctx.clone(),
            view_state: ViewState::compute(None, &config.placeholders),
            config,
            data: None,
            viewport: ctx.mount("viewport"),
            refresh,
            load_more,
            cells: FxHashMap::default(),
            direction: ScrollDirectionTracker::new(),
            listeners: Arc::new(Listeners::new()),
        };
        list.wire();
        Ok(list)
    }

    fn wire(&self) {
        let refresh = self.refresh.as_ref().map(|b| b.controller.clone());
        let load_more = self.load_more.as_ref().map(|b| b.controller.clone());

        if let Some(binding) = &self.refresh {
            let controller = binding.controller.clone();
            let other = load_more.clone();
            binding.sentinel.subscribe(move |sample| {
                let may_fire = !other.as_ref().is_some_and(|c| c.is_firing());
                controller.observe_with(*sample, may_fire);
            });

            let listeners = self.listeners.clone();
            let other = load_more.clone();
            binding.controller.subscribe(move |event| {
                emit(
                    &listeners,
                    ListEvent::Trigger {
                        edge: Edge::Top,
                        event: *event,
                    },
                );
                if let (TriggerEvent::Triggered { .. }, Some(load_more)) = (event, &other) {
                    load_more.rearm();
                }
            });
        }

        if let Some(binding) = &self.load_more {
            let controller = binding.controller.clone();
            let other = refresh;
            let needs_visible_row = self
                .config
                .load_more
                .is_some_and(|c| c.mode == LoadMoreMode::OnLastRow);
            let ctx = self.ctx.clone();
            let viewport = self.viewport;
            binding.sentinel.subscribe(move |sample| {
                let row_visible = !needs_visible_row
                    || ctx
                        .frame(viewport)
                        .is_ok_and(|vp| !vp.is_zero() && vp.intersects_y(&sample.rect));
                let may_fire = row_visible && !other.as_ref().is_some_and(|c| c.is_firing());
                controller.observe_with(*sample, may_fire);
            });

            let listeners = self.listeners.clone();
            binding.controller.subscribe(move |event| {
                emit(
                    &listeners,
                    ListEvent::Trigger {
                        edge: Edge::Bottom,
                        event: *event,
                    },
                );
            });
        }
    }

    pub fn context(&self) -> &LayoutContext {
        &self.ctx
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// The refresh controller, if refresh is enabled
    pub fn refresh(&self) -> Option<&EdgeTriggerController> {
        self.refresh.as_ref().map(|b| &b.controller)
    }

    /// The load-more controller, if load more is enabled
    pub fn load_more(&self) -> Option<&EdgeTriggerController> {
        self.load_more.as_ref().map(|b| &b.controller)
    }

    fn binding(&self, edge: Edge) -> Result<&EdgeBinding> {
        let binding = match edge {
            Edge::Top => self.refresh.as_ref(),
            Edge::Bottom => self.load_more.as_ref(),
        };
        binding.ok_or_else(|| {
            LayoutError::InvalidConfig(format!("{:?} edge trigger is not enabled", edge))
        })
    }

    /// Register the refresh fetch callback
    pub fn on_refresh<F>(&self, fetch: F) -> Result<()>
    where
        F: FnMut(FetchRequest) + Send + 'static,
    {
        self.binding(Edge::Top)?.controller.on_fetch(fetch);
        Ok(())
    }

    /// Register the load-more fetch callback
    pub fn on_load_more<F>(&self, fetch: F) -> Result<()>
    where
        F: FnMut(FetchRequest) + Send + 'static,
    {
        self.binding(Edge::Bottom)?.controller.on_fetch(fetch);
        Ok(())
    }

    /// Complete whichever request is outstanding
    pub fn respond(&self, continue_allowed: bool) -> bool {
        self.refresh()
            .into_iter()
            .chain(self.load_more())
            .find(|c| c.is_firing())
            .is_some_and(|c| c.complete(continue_allowed))
    }

    /// Whether either controller is fetching
    pub fn is_busy(&self) -> bool {
        self.refresh().is_some_and(|c| c.is_firing())
            || self.load_more().is_some_and(|c| c.is_firing())
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&ListEvent) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    pub fn report_viewport(&self, rect: Rect) -> Result<()> {
        self.ctx.report(self.viewport, rect).map(|_| ())
    }

    /// Frame of the refresh indicator at rest
    pub fn report_refresh_indicator(&self, rect: Rect) -> Result<()> {
        let binding = self.binding(Edge::Top)?;
        self.ctx.report(binding.indicator, rect)?;
        if !rect.is_zero() && binding.controller.config().display_rect != rect {
            binding.controller.set_display_rect(rect)?;
        }
        Ok(())
    }

    /// Frame of the load-more indicator at rest
    ///
    /// Only the first measured frame is used: the indicator moves down as
    /// pages are appended.
    pub fn report_load_more_indicator(&self, rect: Rect) -> Result<()> {
        let binding = self.binding(Edge::Bottom)?;
        self.ctx.report(binding.indicator, rect)?;
        if !rect.is_zero() && binding.controller.config().display_rect.is_zero() {
            tracing::debug!("Load-more indicator measured at {:?}", rect);
            binding.controller.set_display_rect(rect)?;
        }
        Ok(())
    }

    /// Frame of the element pulled down from the top edge
    pub fn report_refresh_sentinel(&self, rect: Rect) -> Result<()> {
        self.binding(Edge::Top)?.sentinel.report(rect)
    }

    /// Frame of the load-more sentinel: the footer in `OnPullUp` mode, the
    /// last row in `OnLastRow` mode
    pub fn report_load_more_sentinel(&self, rect: Rect) -> Result<()> {
        self.binding(Edge::Bottom)?.sentinel.report(rect)
    }

    /// Report every frame measured in one layout pass
    pub fn layout_pass(&self, pass: &LayoutPass) -> Result<()> {
        if let Some(rect) = pass.viewport {
            self.report_viewport(rect)?;
        }
        if let Some(rect) = pass.refresh_indicator {
            self.report_refresh_indicator(rect)?;
        }
        if let Some(rect) = pass.load_more_indicator {
            self.report_load_more_indicator(rect)?;
        }
        if let Some(rect) = pass.refresh_sentinel {
            self.report_refresh_sentinel(rect)?;
        }
        if let Some(rect) = pass.load_more_sentinel {
            self.report_load_more_sentinel(rect)?;
        }
        Ok(())
    }

    /// Report the content offset; returns the resulting scroll direction
    pub fn report_scroll_offset(&mut self, y: f32) -> ScrollDirection {
        self.direction.update(y)
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction.direction()
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// A row entered the viewport; returns the offset it slides in from
    pub fn row_appeared(&mut self, id: &T::Id) -> Offset {
        let busy = self.is_busy();
        let direction = self.direction.direction();
        let (spec, travel) = (self.config.animation, self.config.travel);
        let cell = self
            .cells
            .entry(id.clone())
            .or_insert_with(|| CellAnimator::new(spec, travel));

        if busy {
            cell.appear_still();
            return Offset::ZERO;
        }
        let offset = cell.appear(direction);
        tracing::trace!("Row {:?} appears from {:?}", id, offset);
        offset
    }

    /// A row left the viewport
    pub fn row_disappeared(&mut self, id: &T::Id) {
        if let Some(cell) = self.cells.get_mut(id) {
            cell.disappear();
        }
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Replace the rows (`None` while the first load is pending)
    pub fn set_data(&mut self, data: Option<Vec<T>>) {
        if let Some(rows) = &data {
            let ids: FxHashSet<T::Id> = rows.iter().map(T::id).collect();
            self.cells.retain(|id, _| ids.contains(id));
        } else {
            self.cells.clear();
        }
        self.data = data;
        self.recompute();
    }

    /// Append a page of rows
    pub fn append(&mut self, rows: impl IntoIterator<Item = T>) {
        self.data.get_or_insert_with(Vec::new).extend(rows);
        self.recompute();
    }

    pub fn data(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    fn recompute(&mut self) {
        let next = ViewState::compute(self.data.as_ref().map(Vec::len), &self.config.placeholders);
        if next == self.view_state {
            return;
        }
        tracing::debug!("View state {:?} -> {:?}", self.view_state, next);
        let from = std::mem::replace(&mut self.view_state, next);
        emit(&self.listeners, ListEvent::ViewStateChanged { from, to: next });
    }

    /// What to draw right now
    pub fn render_plan(&self) -> RenderPlan {
        let activity = Activity {
            refreshing: self.refresh().is_some_and(|c| c.is_firing()),
            loading_page: self.load_more().is_some_and(|c| c.is_firing()),
        };
        render(&self.view_state, &self.config.placeholders, activity)
    }

}

impl<T: Identifiable> Drop for LazyList<T> {
    fn drop(&mut self) {
        let indicators = self
            .refresh
            .iter()
            .chain(self.load_more.iter())
            .map(|b| b.indicator);
        for id in std::iter::once(self.viewport).chain(indicators) {
            if self.ctx.unmount(id).is_err() {
                tracing::warn!("List element {:?} was already unmounted", id);
            }
        }
    }
}
