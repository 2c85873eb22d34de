//! Typed state machines
//!
//! States are user-defined enums implementing [`StateTransitions`]; the
//! machine applies events, keeps a bounded transition history for debugging
//! and reports whether an event caused a transition.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

use crate::events::EventType;

/// Maximum number of transitions kept in history
const HISTORY_LIMIT: usize = 64;

/// Trait for state types that map events to transitions
///
/// # Example
///
/// ```rust
/// use pagelist_core::fsm::{StateMachine, StateTransitions};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// impl StateTransitions for Door {
///     fn on_event(&self, event: u32) -> Option<Self> {
///         match (self, event) {
///             (Door::Open, 1) => Some(Door::Closed),
///             (Door::Closed, 2) => Some(Door::Open),
///             _ => None,
///         }
///     }
/// }
///
/// let mut door = StateMachine::new(Door::Open);
/// assert_eq!(door.send(1), Some(Door::Closed));
/// assert_eq!(door.send(1), None);
/// ```
pub trait StateTransitions: Clone + Copy + PartialEq + Eq + Hash + Send + Debug + 'static {
    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: EventType) -> Option<Self>;
}

/// A state machine over a [`StateTransitions`] type
#[derive(Debug, Clone)]
pub struct StateMachine<S: StateTransitions> {
    current: S,
    history: VecDeque<(S, EventType, S)>,
}

impl<S: StateTransitions> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            history: VecDeque::new(),
        }
    }

    /// Get the current state
    pub fn current(&self) -> S {
        self.current
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current == state
    }

    /// Check if an event would trigger a transition from the current state
    pub fn can_send(&self, event: EventType) -> bool {
        self.current.on_event(event).is_some()
    }

    /// Send an event, returning the new state if a transition happened
    pub fn send(&mut self, event: EventType) -> Option<S> {
        let from = self.current;
        let to = from.on_event(event)?;

        self.current = to;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back((from, event, to));

        Some(to)
    }

    /// Transition history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &(S, EventType, S)> {
        self.history.iter()
    }

    /// Clear transition history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
