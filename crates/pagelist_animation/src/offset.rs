//! Entry offset resolution

use pagelist_core::geometry::Offset;

use crate::direction::ScrollDirection;
use crate::spec::AnimationSpec;

/// Offset a row starts from when it enters the viewport
///
/// Rows already on screen never re-animate. The host animates from the
/// returned offset back to zero.
pub fn resolve_offset(
    spec: AnimationSpec,
    direction: ScrollDirection,
    already_visible: bool,
    travel: f32,
) -> Offset {
    if already_visible {
        return Offset::ZERO;
    }

    use AnimationSpec::*;
    use ScrollDirection::*;
    match (spec, direction) {
        (None, _) => Offset::ZERO,
        (Auto(_) | FromBottom(_), TowardBottom) => Offset::new(0.0, travel),
        (Auto(_) | FromBottom(_), TowardTop) => Offset::ZERO,
        (FromTop(_), TowardTop) => Offset::new(0.0, -travel),
        (FromTop(_), TowardBottom) => Offset::ZERO,
        (FromRight, TowardBottom) => Offset::new(travel, 0.0),
        (FromLeft, TowardBottom) => Offset::new(-travel, 0.0),
        (FromRight | FromLeft, TowardTop) => Offset::ZERO,
    }
}
