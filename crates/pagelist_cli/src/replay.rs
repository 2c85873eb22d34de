//! Script replay
//!
//! Drives a `LazyList` frame by frame the way a host renderer would. Fetch
//! requests are parked when the list fires and answered from the generated
//! dataset once the simulated latency has passed on the list's scheduler.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use pagelist_core::context::LayoutContext;
use pagelist_core::geometry::{Offset, Rect};
use pagelist_core::pagination::{PageRequest, PageSource};
use pagelist_core::scheduler::Timestamp;
use pagelist_layout::list::{LayoutPass, LazyList, ListEvent};
use pagelist_layout::trigger::{Edge, FetchRequest};
use pagelist_layout::view_state::{RenderPlan, ViewState};
use serde::Serialize;

use crate::config::{ReplayScript, Step};
use crate::dataset::{self, User};

/// Duration of one simulated frame
pub const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub at: Timestamp,
    pub event: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowAnimation {
    pub at: Timestamp,
    pub id: u32,
    pub offset: Offset,
}

/// Outcome of a replay
#[derive(Debug, Serialize)]
pub struct Summary {
    pub elapsed_ms: Timestamp,
    pub refreshes: usize,
    pub pages_loaded: usize,
    pub rows: usize,
    pub total: usize,
    pub view_state: ViewState,
    pub load_more_armed: Option<bool>,
    pub render: RenderPlan,
    pub animations: Vec<RowAnimation>,
    pub timeline: Vec<TimelineEntry>,
}

enum Job {
    InitialLoad,
    Fetch(FetchRequest),
}

struct InFlight {
    due: Timestamp,
    job: Job,
}

pub struct Replay {
    script: ReplayScript,
    ctx: LayoutContext,
    list: LazyList<User>,
    source: Vec<User>,
    inbox: Arc<Mutex<Vec<FetchRequest>>>,
    in_flight: Vec<InFlight>,
    next_offset: i64,
    refreshes: usize,
    pages_loaded: usize,
    animations: Vec<RowAnimation>,
    timeline: Arc<Mutex<Vec<TimelineEntry>>>,
}

impl Replay {
    pub fn new(script: ReplayScript) -> Result<Self> {
        let ctx = LayoutContext::new();
        let list = LazyList::new(&ctx, script.list.clone()).context("Failed to build list")?;

        let inbox: Arc<Mutex<Vec<FetchRequest>>> = Arc::default();
        if list.refresh().is_some() {
            let inbox = inbox.clone();
            list.on_refresh(move |request| park(&inbox, request))?;
        }
        if list.load_more().is_some() {
            let inbox = inbox.clone();
            list.on_load_more(move |request| park(&inbox, request))?;
        }

        let timeline: Arc<Mutex<Vec<TimelineEntry>>> = Arc::default();
        {
            let timeline = timeline.clone();
            let clock = ctx.clone();
            list.subscribe(move |event| {
                let at = clock.now();
                match event {
                    ListEvent::Trigger { edge, event } => {
                        tracing::info!("[{at:>6}ms] {edge:?}: {event:?}")
                    }
                    ListEvent::ViewStateChanged { from, to } => {
                        tracing::info!("[{at:>6}ms] view: {from:?} -> {to:?}")
                    }
                }
                timeline
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(TimelineEntry {
                        at,
                        event: format!("{event:?}"),
                    });
            });
        }

        let source = dataset::generate(script.dataset.total);
        let in_flight = vec![InFlight {
            due: script.dataset.latency_ms,
            job: Job::InitialLoad,
        }];

        Ok(Self {
            script,
            ctx,
            list,
            source,
            inbox,
            in_flight,
            next_offset: 0,
            refreshes: 0,
            pages_loaded: 0,
            animations: Vec::new(),
            timeline,
        })
    }

    /// Run every step and summarise
    pub fn run(mut self) -> Result<Summary> {
        let steps = std::mem::take(&mut self.script.steps);
        for (index, step) in steps.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", index + 1, step);
            self.step(step)
                .with_context(|| format!("Step {} ({:?}) failed", index + 1, step))?;
        }
        self.settle();
        Ok(self.summary())
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        match *step {
            Step::PullDown { distance, frames } => {
                for pulled in gesture(distance, frames) {
                    let sentinel = self.refresh_indicator().offset(0.0, pulled);
                    self.frame(LayoutPass {
                        refresh_sentinel: Some(sentinel),
                        ..Default::default()
                    })?;
                }
            }
            Step::PullUp { distance, frames } => {
                for pulled in gesture(distance, frames) {
                    let sentinel = self.load_more_indicator().offset(0.0, -pulled);
                    self.frame(LayoutPass {
                        load_more_sentinel: Some(sentinel),
                        ..Default::default()
                    })?;
                }
            }
            Step::LastRow { frames } => {
                let geometry = &self.script.geometry;
                let (width, bottom, row) = (
                    geometry.width,
                    geometry.viewport_height,
                    geometry.row_height,
                );
                let frames = frames.max(1);
                for i in 0..=frames {
                    let y = bottom - row * i as f32 / frames as f32;
                    self.frame(LayoutPass {
                        load_more_sentinel: Some(Rect::new(0.0, y, width, row)),
                        ..Default::default()
                    })?;
                }
            }
            Step::Wait { ms } => self.advance(ms),
            Step::Scroll { offset } => {
                let direction = self.list.report_scroll_offset(offset);
                tracing::info!("[{:>6}ms] scroll to {} ({:?})", self.ctx.now(), offset, direction);
            }
            Step::RowAppear { id } => {
                let offset = self.list.row_appeared(&id);
                tracing::info!(
                    "[{:>6}ms] row {} appears from ({}, {})",
                    self.ctx.now(),
                    id,
                    offset.dx,
                    offset.dy
                );
                self.animations.push(RowAnimation {
                    at: self.ctx.now(),
                    id,
                    offset,
                });
            }
            Step::RowDisappear { id } => self.list.row_disappeared(&id),
        }
        Ok(())
    }

    fn viewport(&self) -> Rect {
        let g = &self.script.geometry;
        Rect::new(0.0, 0.0, g.width, g.viewport_height)
    }

    fn refresh_indicator(&self) -> Rect {
        let g = &self.script.geometry;
        Rect::new(0.0, 0.0, g.width, g.refresh_indicator_height)
    }

    fn load_more_indicator(&self) -> Rect {
        let g = &self.script.geometry;
        Rect::new(0.0, g.viewport_height, g.width, g.load_more_indicator_height)
    }

    /// Report one layout pass, then let a frame of time pass
    fn frame(&mut self, pass: LayoutPass) -> Result<()> {
        let pass = LayoutPass {
            viewport: Some(self.viewport()),
            refresh_indicator: self.list.refresh().map(|_| self.refresh_indicator()),
            load_more_indicator: self.list.load_more().map(|_| self.load_more_indicator()),
            ..pass
        };
        self.list.layout_pass(&pass)?;
        self.advance(FRAME_MS);
        Ok(())
    }

    fn advance(&mut self, ms: u64) {
        let target = self.ctx.now().saturating_add(ms);
        while self.ctx.now() < target {
            let step = FRAME_MS.min(target - self.ctx.now());
            self.ctx.scheduler().advance_by(step);
            self.settle();
        }
    }

    /// Accept newly parked requests and answer the ones that are due
    fn settle(&mut self) {
        let now = self.ctx.now();
        let latency = self.script.dataset.latency_ms;
        let parked: Vec<FetchRequest> = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for request in parked {
            tracing::debug!("{:?} request {} in flight", request.edge(), request.id());
            self.in_flight.push(InFlight {
                due: now.saturating_add(latency),
                job: Job::Fetch(request),
            });
        }

        let (ready, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.in_flight).into_iter().partition(|f| f.due <= now);
        self.in_flight = waiting;
        for flight in ready {
            self.resolve(flight.job);
        }
    }

    fn resolve(&mut self, job: Job) {
        let page_size = self.script.dataset.page_size;
        match job {
            Job::InitialLoad => self.load_first_page(page_size),
            Job::Fetch(request) => match request.edge() {
                Edge::Top => {
                    self.load_first_page(page_size);
                    self.refreshes += 1;
                    request.complete(true);
                }
                Edge::Bottom => {
                    let offset = self.next_offset;
                    let page = self.source.page(PageRequest::new(offset, page_size));
                    let more = page.has_more_after(offset);
                    self.next_offset += page.items.len() as i64;
                    self.list.append(page.items);
                    self.pages_loaded += 1;
                    request.complete(more);
                }
            },
        }
    }

    fn load_first_page(&mut self, page_size: i64) {
        let page = self.source.page(PageRequest::new(0, page_size));
        self.next_offset = page.items.len() as i64;
        self.list.set_data(Some(page.items));
    }

    fn summary(&self) -> Summary {
        Summary {
            elapsed_ms: self.ctx.now(),
            refreshes: self.refreshes,
            pages_loaded: self.pages_loaded,
            rows: self.list.len(),
            total: self.source.len(),
            view_state: self.list.view_state(),
            load_more_armed: self.list.load_more().map(|c| c.is_armed()),
            render: self.list.render_plan(),
            animations: self.animations.clone(),
            timeline: self
                .timeline
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

fn park(inbox: &Mutex<Vec<FetchRequest>>, request: FetchRequest) {
    inbox
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);
}

/// Pull distances for a drag to `distance` over `frames` frames and back
fn gesture(distance: f32, frames: u32) -> Vec<f32> {
    let frames = frames.max(1);
    let out = (0..=frames).map(|i| distance * i as f32 / frames as f32);
    let back = (0..frames).rev().map(|i| distance * i as f32 / frames as f32);
    out.chain(back).collect()
}

impl Summary {
    /// Human readable report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("elapsed:        {}ms\n", self.elapsed_ms));
        out.push_str(&format!("refreshes:      {}\n", self.refreshes));
        out.push_str(&format!("pages loaded:   {}\n", self.pages_loaded));
        out.push_str(&format!("rows:           {}/{}\n", self.rows, self.total));
        out.push_str(&format!("view state:     {:?}\n", self.view_state));
        if let Some(armed) = self.load_more_armed {
            out.push_str(&format!("load more:      {}\n", if armed { "armed" } else { "exhausted" }));
        }
        if let Some(placeholder) = &self.render.placeholder {
            let text = placeholder.text().unwrap_or("(custom view)");
            out.push_str(&format!("placeholder:    {}\n", text));
        }
        for animation in &self.animations {
            out.push_str(&format!(
                "row {:>4} @ {:>6}ms from ({}, {})\n",
                animation.id, animation.at, animation.offset.dx, animation.offset.dy
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_path() {
        assert_eq!(
            gesture(80.0, 4),
            vec![0.0, 20.0, 40.0, 60.0, 80.0, 60.0, 40.0, 20.0, 0.0]
        );
    }

    #[test]
    fn test_sample_script() {
        let summary = Replay::new(ReplayScript::sample()).unwrap().run().unwrap();

        assert_eq!(summary.pages_loaded, 2);
        assert_eq!(summary.refreshes, 1);
        // The refresh reloaded the first page
        assert_eq!(summary.rows, 20);
        assert_eq!(summary.view_state, ViewState::List { rows: 20 });
        // Exhausted after the second page, re-armed by the refresh
        assert_eq!(summary.load_more_armed, Some(true));
        assert_eq!(summary.animations.len(), 1);
        assert_eq!(summary.animations[0].offset, Offset::new(0.0, 700.0));
    }

    #[test]
    fn test_initial_load_resolves_placeholder() {
        let mut script = ReplayScript::parse("[dataset]\ntotal = 0\nlatency_ms = 50").unwrap();
        script.steps = vec![Step::Wait { ms: 10 }];
        let summary = Replay::new(script).unwrap().run().unwrap();
        assert_eq!(summary.view_state, ViewState::Loading);

        let mut script = ReplayScript::parse("[dataset]\ntotal = 0\nlatency_ms = 50").unwrap();
        script.steps = vec![Step::Wait { ms: 100 }];
        let summary = Replay::new(script).unwrap().run().unwrap();
        assert_eq!(summary.view_state, ViewState::DataNotFound);
        assert!(summary.render_text().contains("No data found."));
    }

    #[test]
    fn test_pull_without_refresh_is_an_error() {
        let script = ReplayScript::parse(
            r#"
            [[steps]]
            action = "pull_down"
            distance = 80.0
            "#,
        )
        .unwrap();
        let err = Replay::new(script).unwrap().run().unwrap_err();
        assert!(format!("{err:#}").contains("not enabled"));
    }

    #[test]
    fn test_last_row_mode_pages_through_everything() {
        let script = ReplayScript::parse(
            r#"
            [list.load_more]
            mode = "on_last_row"
            cooldown_ms = 100
            fire_delay_ms = 0

            [dataset]
            total = 50
            page_size = 20
            latency_ms = 0

            [[steps]]
            action = "wait"
            ms = 50

            [[steps]]
            action = "last_row"

            [[steps]]
            action = "wait"
            ms = 200

            [[steps]]
            action = "last_row"

            [[steps]]
            action = "wait"
            ms = 200

            [[steps]]
            action = "last_row"
            "#,
        )
        .unwrap();
        let summary = Replay::new(script).unwrap().run().unwrap();

        assert_eq!(summary.pages_loaded, 2);
        assert_eq!(summary.rows, 50);
        assert_eq!(summary.load_more_armed, Some(false));
    }
}
