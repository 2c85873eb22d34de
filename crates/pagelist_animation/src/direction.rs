//! Scroll direction tracking
//!
//! Direction is derived from successive vertical positions of an observed
//! element: moving down the coordinate space means the list is heading
//! toward its bottom rows.

use serde::{Deserialize, Serialize};

/// Direction the list content is travelling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    TowardTop,
    /// Rows first appear while the list settles downward
    #[default]
    TowardBottom,
}

/// Reduce two positions to a direction
pub fn direction_between(previous_y: f32, current_y: f32) -> ScrollDirection {
    if current_y > previous_y {
        ScrollDirection::TowardBottom
    } else {
        ScrollDirection::TowardTop
    }
}

/// Keeps the last observed position and the direction derived from it
#[derive(Clone, Copy, Debug, Default)]
pub struct ScrollDirectionTracker {
    last_y: Option<f32>,
    direction: ScrollDirection,
}

impl ScrollDirectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a new position and return the current direction
    ///
    /// The first sample only seeds the tracker. Repeated identical positions
    /// keep the previous direction.
    pub fn update(&mut self, y: f32) -> ScrollDirection {
        if let Some(previous) = self.last_y {
            if previous != y {
                let direction = direction_between(previous, y);
                if direction != self.direction {
                    tracing::trace!("Scroll direction {:?} -> {:?}", self.direction, direction);
                }
                self.direction = direction;
            }
        }
        self.last_y = Some(y);
        self.direction
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    pub fn last_position(&self) -> Option<f32> {
        self.last_y
    }

    /// Forget the last position, keeping the direction
    pub fn reset(&mut self) {
        self.last_y = None;
    }
}
