//! Event identifiers and listener registry
//!
//! Event ids drive the typed state machines in [`crate::fsm`]. Listener sets
//! are the subscription side: components call every registered listener
//! synchronously when their observable state changes.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use slotmap::{new_key_type, SlotMap};

/// Event type identifier
pub type EventType = u32;

/// Events understood by edge-trigger state machines
pub mod trigger_events {
    use super::EventType;

    /// The gesture moved past the engage offset but not the threshold
    pub const ENGAGE: EventType = 1;
    /// The gesture crossed the threshold on a rising edge
    pub const CROSS: EventType = 2;
    /// The gesture retracted back to rest
    pub const RETRACT: EventType = 3;
    /// The outstanding request completed
    pub const COMPLETE: EventType = 10;
    /// The post-completion cooldown elapsed and the controller may fire again
    pub const COOLDOWN_ELAPSED: EventType = 11;
    /// The cooldown elapsed but the last completion refused further loading
    pub const COOLDOWN_DISARMED: EventType = 12;
    /// External re-arm after a refused completion
    pub const REARM: EventType = 20;
    /// External disarm
    pub const DISARM: EventType = 21;
}

/// Row visibility events
pub mod element_events {
    use super::EventType;

    /// Row entered the viewport
    pub const APPEAR: EventType = 62;
    /// Row left the viewport
    pub const DISAPPEAR: EventType = 63;
}

new_key_type! {
    /// Handle returned by [`Listeners::subscribe`]
    pub struct ListenerId;
}

/// Listener callback type
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

struct Registry<E> {
    // A slot is empty while its listener is running
    handlers: SlotMap<ListenerId, Option<Listener<E>>>,
    queue: VecDeque<E>,
    emitting: bool,
}

/// Thread-safe registry of listeners for events of type `E`
///
/// No lock is held while a listener runs, so a listener may call back into
/// the component that notified it, subscribe, or unsubscribe. Events emitted
/// during delivery are queued and delivered in order once the current event
/// has reached every listener.
pub struct Listeners<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                handlers: SlotMap::with_key(),
                queue: VecDeque::new(),
                emitting: false,
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.registry().handlers.insert(Some(Box::new(listener)))
    }

    /// Remove a listener, returning whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.registry().handlers.remove(id).is_some()
    }

    /// Deliver one event to every listener in registration order
    pub fn emit(&self, event: E) {
        self.emit_all(std::iter::once(event));
    }

    /// Deliver a batch of events in order
    ///
    /// If another emission is in progress the events join its queue and this
    /// call returns before they are delivered.
    pub fn emit_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = E>,
    {
        {
            let mut registry = self.registry();
            registry.queue.extend(events);
            if registry.emitting || registry.queue.is_empty() {
                return;
            }
            registry.emitting = true;
        }

        loop {
            let (event, ids) = {
                let mut registry = self.registry();
                let Some(event) = registry.queue.pop_front() else {
                    registry.emitting = false;
                    return;
                };
                let ids: Vec<ListenerId> = registry.handlers.keys().collect();
                (event, ids)
            };

            for id in ids {
                let handler = self.registry().handlers.get_mut(id).and_then(Option::take);
                let Some(mut handler) = handler else {
                    continue;
                };
                handler(&event);
                if let Some(slot) = self.registry().handlers.get_mut(id) {
                    *slot = Some(handler);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().handlers.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_reaches_all_listeners() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::new();

        let a = seen.clone();
        listeners.subscribe(move |v: &u32| a.lock().unwrap().push(("a", *v)));
        let b = seen.clone();
        listeners.subscribe(move |v: &u32| b.lock().unwrap().push(("b", *v)));

        listeners.emit(7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let listeners = Listeners::new();

        let c = count.clone();
        let id = listeners.subscribe(move |_: &()| *c.lock().unwrap() += 1);
        listeners.emit(());
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.emit(());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_listener_may_emit_and_unsubscribe_reentrantly() {
        let listeners = Arc::new(Listeners::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = listeners.clone();
        let s = seen.clone();
        let echo = listeners.subscribe(move |v: &u32| {
            s.lock().unwrap().push(("echo", *v));
            if *v == 1 {
                inner.emit(2);
            }
        });
        let s = seen.clone();
        listeners.subscribe(move |v: &u32| s.lock().unwrap().push(("tail", *v)));

        listeners.emit(1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("echo", 1), ("tail", 1), ("echo", 2), ("tail", 2)]
        );

        let inner = listeners.clone();
        let once = listeners.subscribe(move |_: &u32| {});
        listeners.subscribe(move |_: &u32| {
            inner.unsubscribe(echo);
        });
        listeners.emit(3);
        assert!(listeners.unsubscribe(once));
        assert!(!listeners.unsubscribe(echo));
        assert_eq!(seen.lock().unwrap().last(), Some(&("tail", 3)));
    }
}
