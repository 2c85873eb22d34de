//! Edge-trigger controllers
//!
//! An `EdgeTriggerController` watches a sentinel element sliding past a
//! placeholder indicator and fires a fetch exactly once per gesture. A list
//! owns two: one on the top edge (pull-to-refresh) and one on the bottom edge
//! (load more).
//!
//! # Phases
//!
//! ```text
//!          ENGAGE            CROSS              COMPLETE
//!   Idle ----------> Tracking ------> Triggered ---------> Cooldown
//!    ^  <----------            (fetch runs)                  |
//!    |     RETRACT                                           |
//!    +------------------- COOLDOWN_ELAPSED ------------------+
//!                                                            |
//!   Disarmed <------------- COOLDOWN_DISARMED ---------------+
//!       |  REARM -> Idle
//! ```
//!
//! The rising edge is latched: once a gesture has crossed the threshold it
//! cannot fire again until the sentinel retracts to the engage offset, even
//! if a cooldown elapses in between. Samples that arrive while triggered, in
//! cooldown or disarmed are dropped, but a retraction among them still
//! releases the latch.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use pagelist_core::geometry::{GeometrySample, Rect};
//! use pagelist_core::scheduler::Scheduler;
//! use pagelist_layout::trigger::{EdgeTriggerController, PullConfig};
//!
//! let scheduler = Scheduler::new();
//! let config = PullConfig::refresh(Rect::new(0.0, 0.0, 320.0, 50.0)).with_trigger_margin(20.0);
//! let refresh = EdgeTriggerController::refresh(config, scheduler.clone()).unwrap();
//!
//! let outstanding = Arc::new(Mutex::new(None));
//! let slot = outstanding.clone();
//! refresh.on_fetch(move |request| *slot.lock().unwrap() = Some(request));
//!
//! for y in [0.0, 10.0, 30.0, 55.0, 72.0, 76.0, 80.0] {
//!     refresh.observe(GeometrySample::new(Rect::new(0.0, y, 320.0, 44.0), scheduler.now()));
//! }
//! assert!(refresh.is_firing());
//!
//! let request = outstanding.lock().unwrap().take().unwrap();
//! request.complete(true);
//! assert!(!refresh.is_firing());
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use pagelist_core::error::{LayoutError, Result};
use pagelist_core::events::trigger_events::*;
use pagelist_core::events::{EventType, ListenerId, Listeners};
use pagelist_core::fsm::{StateMachine, StateTransitions};
use pagelist_core::geometry::{GeometrySample, Rect};
use pagelist_core::scheduler::{Scheduler, TimerGuard, Timestamp};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Cooldown after a completion before a new gesture may fire
pub const DEFAULT_COOLDOWN_MS: u64 = 2000;

/// Distance the refresh sentinel must travel before a pull counts
pub const REFRESH_ENGAGE_OFFSET: f32 = 8.0;

/// Load-more fires this far before the indicator is fully revealed
pub const PULL_UP_TRIGGER_MARGIN: f32 = 18.0;

/// Delay between a load-more trigger and its fetch
pub const LOAD_MORE_FIRE_DELAY_MS: u64 = 700;

// ============================================================================
// Configuration
// ============================================================================

/// Which list edge a controller watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Sentinel moves down from the top edge (pull-to-refresh)
    Top,
    /// Sentinel moves up from the bottom edge (load more)
    Bottom,
}

/// Geometry and timing of one pull gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PullConfig {
    /// Natural frame of the indicator revealed by the pull. Zero until
    /// measured; an unmeasured controller does not evaluate samples.
    #[serde(default)]
    pub display_rect: Rect,
    /// Top edge: extra distance past the indicator height before firing.
    /// Bottom edge: distance short of the indicator height at which to fire.
    #[serde(default)]
    pub trigger_margin: f32,
    /// Fixed pull distance that fires regardless of the indicator height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_distance: Option<f32>,
    /// Pulls at or below this distance count as retracted
    #[serde(default)]
    pub engage_offset: f32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Delay between the trigger and the fetch callback
    #[serde(default)]
    pub fire_delay_ms: u64,
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

impl PullConfig {
    /// Pull-to-refresh defaults
    pub fn refresh(display_rect: Rect) -> Self {
        Self {
            display_rect,
            trigger_margin: 0.0,
            trigger_distance: None,
            engage_offset: REFRESH_ENGAGE_OFFSET,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            fire_delay_ms: 0,
        }
    }

    /// Pull-up load-more defaults
    pub fn load_more(display_rect: Rect) -> Self {
        Self {
            display_rect,
            trigger_margin: PULL_UP_TRIGGER_MARGIN,
            trigger_distance: None,
            engage_offset: 0.0,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            fire_delay_ms: LOAD_MORE_FIRE_DELAY_MS,
        }
    }

    pub fn with_display_rect(mut self, rect: Rect) -> Self {
        self.display_rect = rect;
        self
    }

    pub fn with_trigger_margin(mut self, margin: f32) -> Self {
        self.trigger_margin = margin;
        self
    }

    pub fn with_trigger_distance(mut self, distance: Option<f32>) -> Self {
        self.trigger_distance = distance;
        self
    }

    pub fn with_engage_offset(mut self, offset: f32) -> Self {
        self.engage_offset = offset;
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_fire_delay_ms(mut self, delay_ms: u64) -> Self {
        self.fire_delay_ms = delay_ms;
        self
    }

    /// Reject non-finite values and negative sizes
    pub fn validate(&self) -> Result<()> {
        let rect = self.display_rect;
        let finite = [
            rect.x(),
            rect.y(),
            rect.width(),
            rect.height(),
            self.trigger_margin,
            self.trigger_distance.unwrap_or_default(),
            self.engage_offset,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(LayoutError::InvalidConfig(format!(
                "pull config values must be finite: {:?}",
                self
            )));
        }
        if rect.width() < 0.0 || rect.height() < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "display rect has negative size: {:?}",
                rect
            )));
        }
        if self.engage_offset < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "engage offset must not be negative: {}",
                self.engage_offset
            )));
        }
        Ok(())
    }

    /// Distance the sentinel has travelled past the indicator's resting edge
    pub fn pulled_distance(&self, edge: Edge, sentinel: &Rect) -> f32 {
        match edge {
            Edge::Top => sentinel.min_y() - self.display_rect.min_y(),
            Edge::Bottom => self.display_rect.min_y() - sentinel.min_y(),
        }
    }

    /// Pull distance that fires the trigger once exceeded
    pub fn threshold(&self, edge: Edge) -> f32 {
        if let Some(distance) = self.trigger_distance {
            return distance;
        }
        match edge {
            Edge::Top => self.display_rect.height() + self.trigger_margin,
            Edge::Bottom => self.display_rect.height() - self.trigger_margin,
        }
    }
}

// ============================================================================
// Phases and events
// ============================================================================

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPhase {
    /// Armed, sentinel at rest
    #[default]
    Idle,
    /// Armed, sentinel pulled but short of the threshold
    Tracking,
    /// Fired; waiting for the request to complete
    Triggered,
    /// Completed; ignoring geometry until the cooldown elapses
    Cooldown,
    /// A completion refused further loading; waiting for re-arm
    Disarmed,
}

impl StateTransitions for TriggerPhase {
    fn on_event(&self, event: EventType) -> Option<Self> {
        use TriggerPhase::*;
        match (self, event) {
            (Idle, ENGAGE) => Some(Tracking),
            (Tracking, RETRACT) => Some(Idle),
            (Idle | Tracking, CROSS) => Some(Triggered),
            (Triggered, COMPLETE) => Some(Cooldown),
            (Cooldown, COOLDOWN_ELAPSED) => Some(Idle),
            (Cooldown, COOLDOWN_DISARMED) => Some(Disarmed),
            (Idle | Tracking, DISARM) => Some(Disarmed),
            (Disarmed, REARM) => Some(Idle),
            _ => None,
        }
    }
}

/// Notification delivered to controller listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerEvent {
    PhaseChanged {
        from: TriggerPhase,
        to: TriggerPhase,
    },
    /// A rising edge fired
    Triggered { request_id: u64, pulled: f32 },
    /// The fetch callback was invoked
    Dispatched { request_id: u64 },
    /// The outstanding request completed
    Completed {
        request_id: u64,
        continue_allowed: bool,
    },
}

/// Snapshot of the controller's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTriggerState {
    pub armed: bool,
    pub firing: bool,
    pub cooldown_until: Option<Timestamp>,
}

/// How much of the indicator a pull currently reveals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reveal {
    pub height: f32,
    pub opacity: f32,
}

impl Reveal {
    pub const HIDDEN: Reveal = Reveal {
        height: 0.0,
        opacity: 0.0,
    };

    pub fn is_hidden(&self) -> bool {
        self.opacity <= 0.0
    }
}

// ============================================================================
// Fetch request handle
// ============================================================================

/// Fetch callback type
pub type FetchFn = Box<dyn FnMut(FetchRequest) + Send>;

/// Handle for one outstanding fetch
///
/// Passed to the fetch callback when the controller fires. Completing it
/// reports whether more loading is allowed; dropping it without completing
/// leaves the controller triggered.
pub struct FetchRequest {
    id: u64,
    edge: Edge,
    controller: Weak<ControllerShared>,
    completed: bool,
}

impl FetchRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Finish the request. Returns false if the controller is gone or has
    /// already moved past this request.
    pub fn complete(mut self, continue_allowed: bool) -> bool {
        self.completed = true;
        match self.controller.upgrade() {
            Some(shared) => shared.complete(Some(self.id), continue_allowed),
            None => false,
        }
    }
}

impl Drop for FetchRequest {
    fn drop(&mut self) {
        if !self.completed && self.controller.strong_count() > 0 {
            tracing::warn!(
                "{:?} fetch request {} dropped without completion; controller stays triggered",
                self.edge,
                self.id
            );
        }
    }
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("id", &self.id)
            .field("edge", &self.edge)
            .finish()
    }
}

// ============================================================================
// Controller
// ============================================================================

type Events = SmallVec<[TriggerEvent; 4]>;

struct ControllerState {
    config: PullConfig,
    phase: StateMachine<TriggerPhase>,
    armed: bool,
    firing: bool,
    /// Set once a gesture crosses; cleared when the sentinel retracts
    latched: bool,
    rearm_pending: bool,
    cooldown_until: Option<Timestamp>,
    request_id: u64,
    last_sentinel: Option<Rect>,
    cooldown_timer: Option<TimerGuard>,
    dispatch_timer: Option<TimerGuard>,
}

impl ControllerState {
    fn transition(&mut self, event: EventType, events: &mut Events) -> bool {
        let from = self.phase.current();
        match self.phase.send(event) {
            Some(to) => {
                events.push(TriggerEvent::PhaseChanged { from, to });
                true
            }
            None => false,
        }
    }

    fn expire_cooldown(&mut self, now: Timestamp, events: &mut Events) {
        let Some(until) = self.cooldown_until else {
            return;
        };
        if now < until {
            return;
        }

        self.cooldown_until = None;
        self.cooldown_timer = None;
        if self.rearm_pending {
            self.rearm_pending = false;
            self.armed = true;
        }
        let event = if self.armed {
            COOLDOWN_ELAPSED
        } else {
            COOLDOWN_DISARMED
        };
        self.transition(event, events);
    }
}

struct ControllerShared {
    edge: Edge,
    scheduler: Scheduler,
    state: Mutex<ControllerState>,
    listeners: Listeners<TriggerEvent>,
    fetch: Mutex<Option<FetchFn>>,
}

impl ControllerShared {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, events: &Events) {
        if !events.is_empty() {
            self.listeners.emit_all(events.iter().copied());
        }
    }

    fn complete(self: &Arc<Self>, request_id: Option<u64>, continue_allowed: bool) -> bool {
        let mut events = Events::new();
        {
            let mut state = self.state();
            if !state.firing || request_id.is_some_and(|id| id != state.request_id) {
                tracing::warn!(
                    "{:?} completion for request {:?} ignored (outstanding: {})",
                    self.edge,
                    request_id,
                    if state.firing { state.request_id } else { 0 }
                );
                return false;
            }

            let now = self.scheduler.now();
            let until = now.saturating_add(state.config.cooldown_ms);
            state.firing = false;
            state.armed = continue_allowed;
            state.rearm_pending = false;
            state.dispatch_timer = None;
            state.cooldown_until = Some(until);
            state.transition(COMPLETE, &mut events);
            events.push(TriggerEvent::Completed {
                request_id: state.request_id,
                continue_allowed,
            });

            let weak = Arc::downgrade(self);
            state.cooldown_timer = Some(self.scheduler.schedule_at(until, move |at| {
                if let Some(shared) = weak.upgrade() {
                    shared.tick(at);
                }
            }));

            tracing::debug!(
                "{:?} request {} completed (continue={}), cooldown until {}ms",
                self.edge,
                state.request_id,
                continue_allowed,
                until
            );
        }
        self.notify(&events);
        true
    }

    fn tick(&self, now: Timestamp) {
        let mut events = Events::new();
        self.state().expire_cooldown(now, &mut events);
        self.notify(&events);
    }

    /// Invoke the fetch callback for `request_id` if it is still outstanding
    fn dispatch(self: &Arc<Self>, request_id: u64) {
        {
            let mut state = self.state();
            state.dispatch_timer = None;
            if !state.firing || state.request_id != request_id {
                return;
            }
        }

        let callback = self.fetch.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut callback) = callback else {
            tracing::warn!(
                "{:?} fired request {} with no fetch callback registered",
                self.edge,
                request_id
            );
            return;
        };

        tracing::debug!("{:?} dispatching request {}", self.edge, request_id);
        let mut events = Events::new();
        events.push(TriggerEvent::Dispatched { request_id });
        self.notify(&events);

        callback(FetchRequest {
            id: request_id,
            edge: self.edge,
            controller: Arc::downgrade(self),
            completed: false,
        });

        let mut slot = self.fetch.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

/// Fires a fetch once per pull gesture past one list edge
///
/// Clones share the same controller.
#[derive(Clone)]
pub struct EdgeTriggerController {
    shared: Arc<ControllerShared>,
}

impl EdgeTriggerController {
    pub fn new(edge: Edge, config: PullConfig, scheduler: Scheduler) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(ControllerShared {
                edge,
                scheduler,
                state: Mutex::new(ControllerState {
                    config,
                    phase: StateMachine::new(TriggerPhase::Idle),
                    armed: true,
                    firing: false,
                    latched: false,
                    rearm_pending: false,
                    cooldown_until: None,
                    request_id: 0,
                    last_sentinel: None,
                    cooldown_timer: None,
                    dispatch_timer: None,
                }),
                listeners: Listeners::new(),
                fetch: Mutex::new(None),
            }),
        })
    }

    /// Top-edge controller
    pub fn refresh(config: PullConfig, scheduler: Scheduler) -> Result<Self> {
        Self::new(Edge::Top, config, scheduler)
    }

    /// Bottom-edge controller
    pub fn load_more(config: PullConfig, scheduler: Scheduler) -> Result<Self> {
        Self::new(Edge::Bottom, config, scheduler)
    }

    pub fn edge(&self) -> Edge {
        self.shared.edge
    }

    pub fn config(&self) -> PullConfig {
        self.shared.state().config
    }

    /// Update the measured indicator frame
    pub fn set_display_rect(&self, rect: Rect) -> Result<()> {
        let mut state = self.shared.state();
        let config = state.config.with_display_rect(rect);
        config.validate()?;
        state.config = config;
        Ok(())
    }

    /// Register the fetch callback, replacing any previous one
    pub fn on_fetch<F>(&self, fetch: F)
    where
        F: FnMut(FetchRequest) + Send + 'static,
    {
        *self.shared.fetch.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(fetch));
    }

    /// Receive every phase change and request lifecycle event
    ///
    /// Listeners run synchronously with no controller lock held, so they may
    /// complete, re-arm or disarm this controller.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&TriggerEvent) + Send + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    /// Evaluate a settled sentinel sample. Returns the request id if it fired.
    pub fn observe(&self, sample: GeometrySample) -> Option<u64> {
        self.observe_with(sample, true)
    }

    /// Evaluate a sample, allowing a rising edge to fire only if `may_fire`
    ///
    /// Retraction is always honoured so a gated gesture can still reset.
    pub fn observe_with(&self, sample: GeometrySample, may_fire: bool) -> Option<u64> {
        let edge = self.shared.edge;
        let mut events = Events::new();
        let mut fired = None;
        let mut fire_delay_ms = 0;

        {
            let mut state = self.shared.state();
            state.expire_cooldown(sample.observed_at, &mut events);

            if state.config.display_rect.is_zero() || sample.rect.is_zero() {
                tracing::trace!("{:?} not measured yet, sample ignored", edge);
            } else {
                let pulled = state.config.pulled_distance(edge, &sample.rect);
                let threshold = state.config.threshold(edge);
                let retracted = pulled <= state.config.engage_offset;
                if retracted {
                    state.latched = false;
                }
                let phase = state.phase.current();

                if matches!(
                    phase,
                    TriggerPhase::Triggered | TriggerPhase::Cooldown | TriggerPhase::Disarmed
                ) {
                    tracing::trace!("{:?} {:?}, sample dropped", edge, phase);
                } else {
                    state.last_sentinel = Some(sample.rect);
                    tracing::trace!(
                        "{:?} pulled={:.1} threshold={:.1} latched={}",
                        edge,
                        pulled,
                        threshold,
                        state.latched
                    );

                    if retracted {
                        state.transition(RETRACT, &mut events);
                    } else {
                        state.transition(ENGAGE, &mut events);
                        if pulled > threshold && !state.latched && may_fire {
                            state.latched = true;
                            state.firing = true;
                            state.request_id += 1;
                            state.transition(CROSS, &mut events);
                            events.push(TriggerEvent::Triggered {
                                request_id: state.request_id,
                                pulled,
                            });
                            fired = Some(state.request_id);
                            fire_delay_ms = state.config.fire_delay_ms;
                            if fire_delay_ms > 0 {
                                // Stale until rows are appended
                                state.last_sentinel = None;
                            }

                            tracing::debug!(
                                "{:?} triggered request {} at pulled={:.1} (threshold {:.1})",
                                edge,
                                state.request_id,
                                pulled,
                                threshold
                            );
                        }
                    }
                }
            }
        }

        self.shared.notify(&events);

        if let Some(request_id) = fired {
            if fire_delay_ms == 0 {
                self.shared.dispatch(request_id);
            } else {
                let weak = Arc::downgrade(&self.shared);
                let guard = self.shared.scheduler.schedule_after(fire_delay_ms, move |_| {
                    if let Some(shared) = weak.upgrade() {
                        shared.dispatch(request_id);
                    }
                });
                self.shared.state().dispatch_timer = Some(guard);
            }
        }

        fired
    }

    /// Complete the outstanding request from outside the fetch callback
    pub fn complete(&self, continue_allowed: bool) -> bool {
        self.shared.complete(None, continue_allowed)
    }

    /// Apply any cooldown that has elapsed by `now`
    pub fn tick(&self, now: Timestamp) {
        self.shared.tick(now);
    }

    /// Allow firing again after a refused completion
    ///
    /// During a cooldown the re-arm takes effect when the cooldown elapses.
    pub fn rearm(&self) {
        let mut events = Events::new();
        {
            let mut state = self.shared.state();
            match state.phase.current() {
                TriggerPhase::Cooldown => state.rearm_pending = true,
                TriggerPhase::Triggered => {}
                _ => {
                    state.armed = true;
                    state.transition(REARM, &mut events);
                }
            }
        }
        if !events.is_empty() {
            tracing::debug!("{:?} re-armed", self.shared.edge);
        }
        self.shared.notify(&events);
    }

    /// Stop evaluating geometry until re-armed
    pub fn disarm(&self) {
        let mut events = Events::new();
        {
            let mut state = self.shared.state();
            state.rearm_pending = false;
            if !state.firing {
                state.armed = false;
                state.transition(DISARM, &mut events);
            }
        }
        self.shared.notify(&events);
    }

    pub fn phase(&self) -> TriggerPhase {
        self.shared.state().phase.current()
    }

    pub fn state(&self) -> EdgeTriggerState {
        let state = self.shared.state();
        EdgeTriggerState {
            armed: state.armed,
            firing: state.firing,
            cooldown_until: state.cooldown_until,
        }
    }

    pub fn is_firing(&self) -> bool {
        self.shared.state().firing
    }

    pub fn is_armed(&self) -> bool {
        self.shared.state().armed
    }

    /// Id of the most recent request (0 before the first fire)
    pub fn last_request_id(&self) -> u64 {
        self.shared.state().request_id
    }

    /// Pulled distance of the last evaluated sample
    pub fn pulled_distance(&self) -> Option<f32> {
        let state = self.shared.state();
        state
            .last_sentinel
            .map(|rect| state.config.pulled_distance(self.shared.edge, &rect))
    }

    /// Indicator reveal for the last evaluated sample
    pub fn reveal(&self) -> Reveal {
        let state = self.shared.state();
        let display = state.config.display_rect;
        let Some(sentinel) = state.last_sentinel else {
            return Reveal::HIDDEN;
        };
        if display.height() <= 0.0 {
            return Reveal::HIDDEN;
        }

        let pulled = state.config.pulled_distance(self.shared.edge, &sentinel);
        let height = match self.shared.edge {
            Edge::Top => {
                let max_allowed = sentinel.height().max(display.height());
                if pulled > 0.0 && pulled < max_allowed * 3.0 {
                    pulled
                } else {
                    return Reveal::HIDDEN;
                }
            }
            Edge::Bottom => {
                if pulled < 0.0 {
                    return Reveal::HIDDEN;
                }
                pulled.min(display.height())
            }
        };

        Reveal {
            height,
            opacity: (height / display.height()).min(1.0),
        }
    }
}

impl std::fmt::Debug for EdgeTriggerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("EdgeTriggerController")
            .field("edge", &self.shared.edge)
            .field("phase", &state.phase.current())
            .field("armed", &state.armed)
            .field("firing", &state.firing)
            .field("cooldown_until", &state.cooldown_until)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> Rect {
        Rect::new(0.0, 0.0, 320.0, 50.0)
    }

    fn sentinel(y: f32) -> Rect {
        Rect::new(0.0, y, 320.0, 44.0)
    }

    struct Harness {
        scheduler: Scheduler,
        controller: EdgeTriggerController,
        requests: Arc<Mutex<Vec<FetchRequest>>>,
    }

    impl Harness {
        fn refresh(config: PullConfig) -> Self {
            let scheduler = Scheduler::new();
            let controller = EdgeTriggerController::refresh(config, scheduler.clone()).unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let sink = requests.clone();
            controller.on_fetch(move |request| sink.lock().unwrap().push(request));
            Self {
                scheduler,
                controller,
                requests,
            }
        }

        fn pull(&self, ys: &[f32]) -> Vec<u64> {
            ys.iter()
                .filter_map(|y| {
                    self.scheduler.advance_by(16);
                    self.controller
                        .observe(GeometrySample::new(sentinel(*y), self.scheduler.now()))
                })
                .collect()
        }

        fn take_request(&self) -> FetchRequest {
            self.requests.lock().unwrap().remove(0)
        }
    }

    fn refresh_config() -> PullConfig {
        PullConfig::refresh(display()).with_trigger_margin(20.0)
    }

    #[test]
    fn test_fires_once_at_rising_edge() {
        let h = Harness::refresh(refresh_config());
        let fired = h.pull(&[0.0, 10.0, 30.0, 55.0, 72.0, 76.0, 80.0]);

        assert_eq!(fired, vec![1]);
        assert_eq!(h.requests.lock().unwrap().len(), 1);
        assert_eq!(h.controller.phase(), TriggerPhase::Triggered);
        assert!(h.controller.is_firing());
    }

    #[test]
    fn test_phase_walk() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[0.0]);
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);
        h.pull(&[30.0]);
        assert_eq!(h.controller.phase(), TriggerPhase::Tracking);
        h.pull(&[5.0]);
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);
        h.pull(&[71.0]);
        assert_eq!(h.controller.phase(), TriggerPhase::Triggered);
    }

    #[test]
    fn test_dense_samples_fire_at_most_once() {
        let h = Harness::refresh(refresh_config());
        let ys: Vec<f32> = (0..400).map(|i| (i % 200) as f32 * 0.5).collect();
        let fired = h.pull(&ys);
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_refused_completion_disarms_for_good() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[0.0, 80.0]);
        assert!(h.take_request().complete(false));

        assert_eq!(h.controller.phase(), TriggerPhase::Cooldown);
        h.scheduler.advance_by(DEFAULT_COOLDOWN_MS);
        assert_eq!(h.controller.phase(), TriggerPhase::Disarmed);

        let fired = h.pull(&[0.0, 80.0, 0.0, 90.0]);
        assert!(fired.is_empty());
        assert!(!h.controller.is_armed());
    }

    #[test]
    fn test_rearms_after_cooldown() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[0.0, 80.0]);
        assert!(h.take_request().complete(true));

        // Within the cooldown nothing fires
        assert!(h.pull(&[85.0]).is_empty());

        h.scheduler.advance_by(DEFAULT_COOLDOWN_MS);
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);

        // Still held past the threshold from before: needs a retract first
        assert!(h.pull(&[90.0]).is_empty());
        assert_eq!(h.pull(&[0.0, 85.0]), vec![2]);
    }

    #[test]
    fn test_release_during_fetch_clears_latch() {
        let h = Harness::refresh(refresh_config().with_cooldown_ms(100));
        h.pull(&[0.0, 80.0, 40.0, 0.0]);
        h.take_request().complete(true);
        h.scheduler.advance_by(100);

        assert_eq!(h.pull(&[80.0]), vec![2]);
    }

    #[test]
    fn test_cooldown_expires_from_sample_time_without_timer() {
        let h = Harness::refresh(refresh_config().with_cooldown_ms(100));
        h.pull(&[0.0, 80.0]);
        h.take_request().complete(true);

        let late = h.scheduler.now() + 150;
        h.controller
            .observe(GeometrySample::new(sentinel(0.0), late));
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);
    }

    #[test]
    fn test_unmeasured_display_does_not_evaluate() {
        let h = Harness::refresh(PullConfig::refresh(Rect::ZERO));
        assert!(h.pull(&[0.0, 500.0, 1000.0]).is_empty());
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);

        h.controller.set_display_rect(display()).unwrap();
        assert_eq!(h.pull(&[0.0, 500.0]), vec![1]);
    }

    #[test]
    fn test_stale_and_double_completion_ignored() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[0.0, 80.0]);
        let request = h.take_request();

        assert!(h.controller.complete(true));
        assert!(!request.complete(true));
        assert!(!h.controller.complete(true));
    }

    #[test]
    fn test_listeners_see_lifecycle() {
        let h = Harness::refresh(refresh_config());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        h.controller.subscribe(move |e| sink.lock().unwrap().push(*e));

        h.pull(&[0.0, 40.0, 80.0]);
        h.take_request().complete(true);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TriggerEvent::PhaseChanged {
                    from: TriggerPhase::Idle,
                    to: TriggerPhase::Tracking
                },
                TriggerEvent::PhaseChanged {
                    from: TriggerPhase::Tracking,
                    to: TriggerPhase::Triggered
                },
                TriggerEvent::Triggered {
                    request_id: 1,
                    pulled: 80.0
                },
                TriggerEvent::Dispatched { request_id: 1 },
                TriggerEvent::PhaseChanged {
                    from: TriggerPhase::Triggered,
                    to: TriggerPhase::Cooldown
                },
                TriggerEvent::Completed {
                    request_id: 1,
                    continue_allowed: true
                },
            ]
        );
    }

    #[test]
    fn test_synchronous_completion_inside_fetch() {
        let scheduler = Scheduler::new();
        let controller =
            EdgeTriggerController::refresh(refresh_config(), scheduler.clone()).unwrap();
        controller.on_fetch(|request| {
            request.complete(true);
        });

        controller.observe(GeometrySample::new(sentinel(0.0), 0));
        assert_eq!(
            controller.observe(GeometrySample::new(sentinel(80.0), 16)),
            Some(1)
        );
        assert!(!controller.is_firing());
        assert_eq!(controller.phase(), TriggerPhase::Cooldown);
    }

    #[test]
    fn test_listener_completes_on_dispatch() {
        let harness = Harness::refresh(refresh_config());
        let controller = harness.controller.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let id = harness.controller.subscribe(move |event| {
            log.lock().unwrap().push(*event);
            match event {
                TriggerEvent::Dispatched { .. } => {
                    assert!(controller.complete(false));
                }
                TriggerEvent::Completed { .. } => controller.rearm(),
                _ => {}
            }
        });

        assert_eq!(harness.pull(&[0.0, 80.0]), vec![1]);
        assert_eq!(harness.controller.phase(), TriggerPhase::Cooldown);
        assert!(!harness.take_request().complete(true));

        let seen = seen.lock().unwrap();
        let dispatched = seen
            .iter()
            .position(|e| matches!(e, TriggerEvent::Dispatched { request_id: 1 }))
            .unwrap();
        assert_eq!(
            seen[dispatched + 1..],
            [
                TriggerEvent::PhaseChanged {
                    from: TriggerPhase::Triggered,
                    to: TriggerPhase::Cooldown
                },
                TriggerEvent::Completed {
                    request_id: 1,
                    continue_allowed: false
                },
            ]
        );
        drop(seen);

        // The re-arm from the listener outlasts the refused completion
        harness.scheduler.advance_by(DEFAULT_COOLDOWN_MS);
        assert_eq!(harness.controller.phase(), TriggerPhase::Idle);
        assert!(harness.controller.unsubscribe(id));
    }

    #[test]
    fn test_load_more_fire_delay_and_geometry() {
        let scheduler = Scheduler::new();
        // Indicator sits at the bottom edge of a 600pt viewport
        let config = PullConfig::load_more(Rect::new(0.0, 600.0, 320.0, 60.0));
        let controller = EdgeTriggerController::load_more(config, scheduler.clone()).unwrap();
        assert_eq!(config.threshold(Edge::Bottom), 42.0);

        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = requests.clone();
        controller.on_fetch(move |request| sink.lock().unwrap().push(request));

        controller.observe(GeometrySample::new(sentinel(620.0), 0));
        assert_eq!(controller.reveal(), Reveal::HIDDEN);
        controller.observe(GeometrySample::new(sentinel(580.0), 16));
        assert_eq!(controller.phase(), TriggerPhase::Tracking);
        assert_eq!(controller.reveal().height, 20.0);

        assert_eq!(
            controller.observe(GeometrySample::new(sentinel(550.0), 32)),
            Some(1)
        );
        assert!(requests.lock().unwrap().is_empty());
        assert_eq!(controller.reveal(), Reveal::HIDDEN);

        scheduler.advance_to(32 + LOAD_MORE_FIRE_DELAY_MS);
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert_eq!(requests.lock().unwrap()[0].edge(), Edge::Bottom);
    }

    #[test]
    fn test_dropping_controller_cancels_deferred_work() {
        let scheduler = Scheduler::new();
        let config = PullConfig::load_more(Rect::new(0.0, 600.0, 320.0, 60.0));
        let controller = EdgeTriggerController::load_more(config, scheduler.clone()).unwrap();
        controller.on_fetch(|_| panic!("fetch after teardown"));

        controller.observe(GeometrySample::new(sentinel(620.0), 0));
        controller.observe(GeometrySample::new(sentinel(500.0), 16));
        assert_eq!(scheduler.pending(), 1);

        drop(controller);
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance_by(5000);
    }

    #[test]
    fn test_rearm_during_cooldown_waits() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[0.0, 80.0]);
        h.take_request().complete(false);

        h.controller.rearm();
        assert!(!h.controller.is_armed());
        assert!(h.controller.state().cooldown_until.is_some());

        h.scheduler.advance_by(DEFAULT_COOLDOWN_MS);
        assert!(h.controller.is_armed());
        assert_eq!(h.controller.phase(), TriggerPhase::Idle);
    }

    #[test]
    fn test_refresh_reveal() {
        let h = Harness::refresh(refresh_config());
        h.pull(&[25.0]);
        let reveal = h.controller.reveal();
        assert_eq!(reveal.height, 25.0);
        assert_eq!(reveal.opacity, 0.5);

        h.pull(&[0.0]);
        assert!(h.controller.reveal().is_hidden());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let scheduler = Scheduler::new();
        let config = PullConfig::refresh(display()).with_trigger_margin(f32::NAN);
        assert!(matches!(
            EdgeTriggerController::refresh(config, scheduler.clone()),
            Err(LayoutError::InvalidConfig(_))
        ));

        let config = PullConfig::refresh(Rect::new(0.0, 0.0, 320.0, -1.0));
        assert!(config.validate().is_err());
    }
}
