//! Row appearance animation specs

use serde::{Deserialize, Serialize};

/// Distance a row travels while sliding in, in points
pub const DEFAULT_TRAVEL_DISTANCE: f32 = 700.0;

/// Whether a row animates only the first time it appears or on every entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    #[default]
    Once,
    Always,
}

/// How a row animates into view
///
/// Horizontal slides always run once per row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "timing", rename_all = "snake_case")]
pub enum AnimationSpec {
    #[default]
    None,
    /// Follow the scroll direction
    Auto(Timing),
    FromTop(Timing),
    FromBottom(Timing),
    FromRight,
    FromLeft,
}

impl AnimationSpec {
    pub fn timing(&self) -> Timing {
        match self {
            AnimationSpec::Auto(timing)
            | AnimationSpec::FromTop(timing)
            | AnimationSpec::FromBottom(timing) => *timing,
            AnimationSpec::None | AnimationSpec::FromRight | AnimationSpec::FromLeft => {
                Timing::Once
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AnimationSpec::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_slides_run_once() {
        assert_eq!(AnimationSpec::FromRight.timing(), Timing::Once);
        assert_eq!(AnimationSpec::FromLeft.timing(), Timing::Once);
        assert_eq!(AnimationSpec::Auto(Timing::Always).timing(), Timing::Always);
    }

    #[test]
    fn test_spec_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            animation: AnimationSpec,
        }

        let doc: Doc = toml::from_str(
            r#"
            animation = { kind = "from_bottom", timing = "always" }
            "#,
        )
        .unwrap();
        assert_eq!(doc.animation, AnimationSpec::FromBottom(Timing::Always));

        let doc: Doc = toml::from_str(r#"animation = { kind = "from_left" }"#).unwrap();
        assert_eq!(doc.animation, AnimationSpec::FromLeft);
    }

    #[test]
    fn test_spec_json_shape() {
        let json = serde_json::to_value(AnimationSpec::Auto(Timing::Once)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "auto", "timing": "once" }));
    }
}
