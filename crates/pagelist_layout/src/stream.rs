//! Live geometry streams
//!
//! A `GeometryStream` is bound to one mounted element of a [`LayoutContext`].
//! The host reports the element's frame on every layout pass; the stream
//! debounces those reports on the context's scheduler and delivers settled
//! samples to its listeners.
//!
//! Dropping the stream unmounts the element and cancels any pending flush, so
//! no deferred callback outlives the element it observes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use pagelist_core::context::{ElementId, LayoutContext};
use pagelist_core::error::Result;
use pagelist_core::events::{ListenerId, Listeners};
use pagelist_core::geometry::{GeometrySample, Rect};
use pagelist_core::scheduler::{TimerGuard, Timestamp};

use crate::debounce::{DebounceConfig, Debouncer};

struct StreamState {
    debouncer: Debouncer,
    flush_timer: Option<TimerGuard>,
    scheduled_for: Option<Timestamp>,
}

struct StreamShared {
    label: String,
    state: Mutex<StreamState>,
    listeners: Listeners<GeometrySample>,
}

impl StreamShared {
    fn state(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, sample: GeometrySample) {
        tracing::trace!(
            "Stream '{}' emits y={:.1} h={:.1} at {}ms",
            self.label,
            sample.rect.y(),
            sample.rect.height(),
            sample.observed_at
        );
        self.listeners.emit(sample);
    }

    /// Timer callback: emit the held sample if it is due
    fn flush_due(&self, now: Timestamp) {
        let emitted = {
            let mut state = self.state();
            state.flush_timer = None;
            state.scheduled_for = None;
            state.debouncer.poll(now)
        };
        if let Some(sample) = emitted {
            self.emit(sample);
        }
    }
}

/// Debounced geometry source for one element
pub struct GeometryStream {
    ctx: LayoutContext,
    element: ElementId,
    shared: Arc<StreamShared>,
}

impl GeometryStream {
    /// Mount a new element in `ctx` and observe it
    pub fn mount(ctx: &LayoutContext, label: impl Into<String>, config: DebounceConfig) -> Self {
        let label = label.into();
        let element = ctx.mount(label.clone());
        Self {
            ctx: ctx.clone(),
            element,
            shared: Arc::new(StreamShared {
                label,
                state: Mutex::new(StreamState {
                    debouncer: Debouncer::new(config),
                    flush_timer: None,
                    scheduled_for: None,
                }),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Receive every settled sample
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&GeometrySample) + Send + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    /// Report the element's frame for this layout pass
    pub fn report(&self, rect: Rect) -> Result<()> {
        let sample = self.ctx.report(self.element, rect)?;

        let flushed = {
            let mut state = self.shared.state();
            let flushed = state.debouncer.push(sample);
            let deadline = state.debouncer.deadline();
            if deadline != state.scheduled_for {
                state.flush_timer = deadline.map(|due| self.schedule_flush(due));
                state.scheduled_for = deadline;
            }
            flushed
        };

        if let Some(sample) = flushed {
            self.shared.emit(sample);
        }
        Ok(())
    }

    fn schedule_flush(&self, due: Timestamp) -> TimerGuard {
        let weak: Weak<StreamShared> = Arc::downgrade(&self.shared);
        self.ctx.scheduler().schedule_at(due, move |now| {
            if let Some(shared) = weak.upgrade() {
                shared.flush_due(now);
            }
        })
    }

    /// The most recent settled frame
    pub fn latest(&self) -> Option<Rect> {
        self.shared.state().debouncer.last_emitted()
    }

    /// Whether a flush is waiting on the scheduler
    pub fn has_pending(&self) -> bool {
        self.shared.state().debouncer.has_pending()
    }
}

impl Drop for GeometryStream {
    fn drop(&mut self) {
        self.shared.state().flush_timer = None;
        if self.ctx.unmount(self.element).is_err() {
            tracing::warn!("Stream '{}' element was already unmounted", self.shared.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(stream: &GeometryStream) -> Arc<Mutex<Vec<f32>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        stream.subscribe(move |sample| sink.lock().unwrap().push(sample.rect.y()));
        seen
    }

    fn row(y: f32) -> Rect {
        Rect::new(0.0, y, 320.0, 44.0)
    }

    #[test]
    fn test_emits_after_quiet_interval() {
        let ctx = LayoutContext::new();
        let stream = GeometryStream::mount(&ctx, "first-row", DebounceConfig::default());
        let seen = collect(&stream);

        stream.report(row(0.0)).unwrap();
        ctx.scheduler().advance_by(3);
        stream.report(row(12.0)).unwrap();
        ctx.scheduler().advance_by(3);
        stream.report(row(30.0)).unwrap();

        assert!(seen.lock().unwrap().is_empty());
        ctx.scheduler().advance_by(10);

        assert_eq!(*seen.lock().unwrap(), vec![30.0]);
        assert_eq!(stream.latest(), Some(row(30.0)));
        assert_eq!(ctx.frame(stream.element()).unwrap(), row(30.0));
    }

    #[test]
    fn test_repeated_frames_are_not_reemitted() {
        let ctx = LayoutContext::new();
        let stream = GeometryStream::mount(&ctx, "last-row", DebounceConfig::default());
        let seen = collect(&stream);

        for _ in 0..5 {
            stream.report(row(600.0)).unwrap();
            ctx.scheduler().advance_by(20);
        }

        assert_eq!(*seen.lock().unwrap(), vec![600.0]);
    }

    #[test]
    fn test_drop_cancels_pending_flush_and_unmounts() {
        let ctx = LayoutContext::new();
        let stream = GeometryStream::mount(&ctx, "row", DebounceConfig::default());
        let element = stream.element();
        stream.report(row(10.0)).unwrap();
        assert_eq!(ctx.scheduler().pending(), 1);

        drop(stream);

        assert_eq!(ctx.scheduler().pending(), 0);
        assert!(!ctx.is_mounted(element));
        assert_eq!(ctx.scheduler().advance_by(50), 0);
    }
}
