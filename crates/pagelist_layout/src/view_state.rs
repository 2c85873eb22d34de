//! List view state and render plan
//!
//! The view state is computed once whenever the list's data changes. The
//! render plan is a pure function of that state, the placeholder settings and
//! which controllers are currently fetching.

use serde::{Deserialize, Serialize};

/// Text of the built-in loading placeholder
pub const DEFAULT_LOADING_TEXT: &str = "Loading data...";

/// Text of the built-in data-not-found placeholder
pub const DEFAULT_NOT_FOUND_TEXT: &str = "No data found.";

/// How a placeholder is drawn
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// Draw nothing
    None,
    /// The built-in text placeholder
    #[default]
    System,
    /// A host-provided view, looked up by key
    Custom(String),
}

impl ViewType {
    pub fn is_none(&self) -> bool {
        matches!(self, ViewType::None)
    }
}

/// Placeholder views shown instead of rows
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholders {
    #[serde(default)]
    pub loading: ViewType,
    #[serde(default)]
    pub data_not_found: ViewType,
}

/// What the list body shows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ViewState {
    /// Nothing at all
    Empty,
    /// Waiting for the first data
    Loading,
    /// Data arrived and was empty
    DataNotFound,
    /// Rows
    List { rows: usize },
}

impl ViewState {
    /// Resolve the state for `rows` (`None` while no data has been set)
    pub fn compute(rows: Option<usize>, placeholders: &Placeholders) -> Self {
        match rows {
            Some(rows) if rows > 0 => ViewState::List { rows },
            Some(_) if !placeholders.data_not_found.is_none() => ViewState::DataNotFound,
            _ if !placeholders.loading.is_none() => ViewState::Loading,
            _ => ViewState::Empty,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            ViewState::List { rows } => *rows,
            _ => 0,
        }
    }
}

/// Which kind of placeholder to show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Loading,
    DataNotFound,
}

/// A resolved placeholder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub view: ViewType,
}

impl Placeholder {
    /// Text for the built-in view
    pub fn text(&self) -> Option<&'static str> {
        match (&self.view, self.kind) {
            (ViewType::System, PlaceholderKind::Loading) => Some(DEFAULT_LOADING_TEXT),
            (ViewType::System, PlaceholderKind::DataNotFound) => Some(DEFAULT_NOT_FOUND_TEXT),
            _ => None,
        }
    }
}

/// Fetches in flight, as far as rendering cares
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Activity {
    pub refreshing: bool,
    pub loading_page: bool,
}

/// Everything a renderer needs to draw the list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPlan {
    pub state: ViewState,
    pub placeholder: Option<Placeholder>,
    /// Show the refresh indicator above the rows
    pub header_indicator: bool,
    /// Show the page-loading indicator below the rows
    pub footer_indicator: bool,
    pub row_count: usize,
}

/// Build the render plan for a view state
pub fn render(state: &ViewState, placeholders: &Placeholders, activity: Activity) -> RenderPlan {
    let placeholder = match state {
        ViewState::Loading => Some(Placeholder {
            kind: PlaceholderKind::Loading,
            view: placeholders.loading.clone(),
        }),
        ViewState::DataNotFound => Some(Placeholder {
            kind: PlaceholderKind::DataNotFound,
            view: placeholders.data_not_found.clone(),
        }),
        ViewState::Empty | ViewState::List { .. } => None,
    };

    RenderPlan {
        state: *state,
        placeholder,
        header_indicator: activity.refreshing,
        footer_indicator: activity.loading_page && matches!(state, ViewState::List { .. }),
        row_count: state.row_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute() {
        let defaults = Placeholders::default();
        assert_eq!(ViewState::compute(None, &defaults), ViewState::Loading);
        assert_eq!(ViewState::compute(Some(0), &defaults), ViewState::DataNotFound);
        assert_eq!(
            ViewState::compute(Some(3), &defaults),
            ViewState::List { rows: 3 }
        );
    }

    #[test]
    fn test_compute_without_placeholders() {
        let hidden = Placeholders {
            loading: ViewType::None,
            data_not_found: ViewType::None,
        };
        assert_eq!(ViewState::compute(None, &hidden), ViewState::Empty);
        assert_eq!(ViewState::compute(Some(0), &hidden), ViewState::Empty);

        // Empty data falls back to the loading placeholder
        let loading_only = Placeholders {
            loading: ViewType::Custom("spinner".into()),
            data_not_found: ViewType::None,
        };
        assert_eq!(ViewState::compute(Some(0), &loading_only), ViewState::Loading);
    }

    #[test]
    fn test_render_placeholder_text() {
        let plan = render(
            &ViewState::DataNotFound,
            &Placeholders::default(),
            Activity::default(),
        );
        let placeholder = plan.placeholder.unwrap();
        assert_eq!(placeholder.text(), Some(DEFAULT_NOT_FOUND_TEXT));
        assert_eq!(plan.row_count, 0);
    }

    #[test]
    fn test_render_indicators() {
        let activity = Activity {
            refreshing: true,
            loading_page: true,
        };
        let plan = render(
            &ViewState::List { rows: 20 },
            &Placeholders::default(),
            activity,
        );
        assert!(plan.placeholder.is_none());
        assert!(plan.header_indicator);
        assert!(plan.footer_indicator);
        assert_eq!(plan.row_count, 20);

        let plan = render(&ViewState::Loading, &Placeholders::default(), activity);
        assert!(!plan.footer_indicator);
    }

    #[test]
    fn test_render_plan_json_shape() {
        let plan = render(&ViewState::Loading, &Placeholders::default(), Activity::default());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["state"], serde_json::json!({ "state": "loading" }));
        assert_eq!(json["placeholder"]["view"], "system");
    }

    #[test]
    fn test_placeholders_from_toml() {
        let placeholders: Placeholders = toml::from_str(
            r#"
            loading = "none"
            data_not_found = { custom = "empty-inbox" }
            "#,
        )
        .unwrap();
        assert_eq!(placeholders.loading, ViewType::None);
        assert_eq!(
            placeholders.data_not_found,
            ViewType::Custom("empty-inbox".into())
        );
    }
}
