//! Replay script handling

use anyhow::{Context, Result};
use pagelist_animation::{AnimationSpec, Timing};
use pagelist_layout::list::{ListConfig, LoadMoreConfig, RefreshConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A gesture script (pagelist.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// The simulated backend
#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Number of generated users
    #[serde(default = "default_total")]
    pub total: usize,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Simulated fetch latency
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_total() -> usize {
    100
}

fn default_page_size() -> i64 {
    20
}

fn default_latency_ms() -> u64 {
    300
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            total: default_total(),
            page_size: default_page_size(),
            latency_ms: default_latency_ms(),
        }
    }
}

/// Screen geometry used to place sentinels and indicators
#[derive(Debug, Deserialize, Serialize)]
pub struct GeometryConfig {
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f32,
    #[serde(default = "default_row_height")]
    pub row_height: f32,
    #[serde(default = "default_refresh_indicator_height")]
    pub refresh_indicator_height: f32,
    #[serde(default = "default_load_more_indicator_height")]
    pub load_more_indicator_height: f32,
}

fn default_width() -> f32 {
    320.0
}

fn default_viewport_height() -> f32 {
    600.0
}

fn default_row_height() -> f32 {
    44.0
}

fn default_refresh_indicator_height() -> f32 {
    50.0
}

fn default_load_more_indicator_height() -> f32 {
    60.0
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            viewport_height: default_viewport_height(),
            row_height: default_row_height(),
            refresh_indicator_height: default_refresh_indicator_height(),
            load_more_indicator_height: default_load_more_indicator_height(),
        }
    }
}

/// One scripted host action
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Pull the top edge down by `distance`, then release
    PullDown {
        distance: f32,
        #[serde(default = "default_frames")]
        frames: u32,
    },
    /// Pull the bottom edge up by `distance`, then release
    PullUp {
        distance: f32,
        #[serde(default = "default_frames")]
        frames: u32,
    },
    /// Scroll the last row fully into view
    LastRow {
        #[serde(default = "default_frames")]
        frames: u32,
    },
    /// Let time pass
    Wait { ms: u64 },
    /// Move the content offset
    Scroll { offset: f32 },
    RowAppear { id: u32 },
    RowDisappear { id: u32 },
}

fn default_frames() -> u32 {
    5
}

impl ReplayScript {
    /// Load and validate a script
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "No script found at {}. Run `pagelist init` to create one.",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let script = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(script)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let script: ReplayScript = toml::from_str(content)?;
        script
            .list
            .validate()
            .context("Invalid list configuration")?;
        if script.dataset.page_size <= 0 {
            anyhow::bail!("dataset.page_size must be positive");
        }
        Ok(script)
    }

    /// The script written by `pagelist init`
    pub fn sample() -> Self {
        let list = ListConfig::default()
            .with_animation(AnimationSpec::Auto(Timing::Once))
            .with_refresh(RefreshConfig {
                trigger_margin: 20.0,
                ..Default::default()
            })
            .with_load_more(LoadMoreConfig::default());

        Self {
            list,
            dataset: DatasetConfig {
                total: 50,
                ..Default::default()
            },
            geometry: GeometryConfig::default(),
            steps: vec![
                Step::Wait { ms: 400 },
                Step::Scroll { offset: 0.0 },
                Step::Scroll { offset: 300.0 },
                Step::RowAppear { id: 19 },
                Step::PullUp {
                    distance: 80.0,
                    frames: 5,
                },
                Step::Wait { ms: 1200 },
                Step::Wait { ms: 2000 },
                Step::PullUp {
                    distance: 80.0,
                    frames: 5,
                },
                Step::Wait { ms: 3200 },
                Step::PullUp {
                    distance: 80.0,
                    frames: 5,
                },
                Step::PullDown {
                    distance: 90.0,
                    frames: 6,
                },
                Step::Wait { ms: 500 },
            ],
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize script")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelist_layout::list::LoadMoreMode;

    #[test]
    fn test_minimal_script_uses_defaults() {
        let script = ReplayScript::parse(
            r#"
            [[steps]]
            action = "pull_down"
            distance = 80.0
            "#,
        )
        .unwrap();

        assert_eq!(script.dataset.total, 100);
        assert_eq!(script.geometry.viewport_height, 600.0);
        assert!(script.list.refresh.is_none());
        assert_eq!(
            script.steps,
            vec![Step::PullDown {
                distance: 80.0,
                frames: 5
            }]
        );
    }

    #[test]
    fn test_full_script() {
        let script = ReplayScript::parse(
            r#"
            [list]
            animation = { kind = "from_left" }

            [list.load_more]
            mode = "on_last_row"

            [dataset]
            total = 7
            page_size = 3
            latency_ms = 0

            [[steps]]
            action = "last_row"

            [[steps]]
            action = "row_appear"
            id = 4
            "#,
        )
        .unwrap();

        assert_eq!(script.list.animation, AnimationSpec::FromLeft);
        assert_eq!(script.list.load_more.unwrap().mode, LoadMoreMode::OnLastRow);
        assert_eq!(script.dataset.page_size, 3);
        assert_eq!(script.steps[0], Step::LastRow { frames: 5 });
        assert_eq!(script.steps[1], Step::RowAppear { id: 4 });
    }

    #[test]
    fn test_sample_survives_toml() {
        let text = ReplayScript::sample().to_toml().unwrap();
        let parsed = ReplayScript::parse(&text).unwrap();
        assert_eq!(parsed.steps, ReplayScript::sample().steps);
        assert_eq!(parsed.list, ReplayScript::sample().list);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ReplayScript::parse("[dataset]\npage_size = 0").is_err());
        assert!(ReplayScript::parse("[list]\ntravel = -1.0").is_err());
        assert!(ReplayScript::parse("[[steps]]\naction = \"jump\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ReplayScript::load(Path::new("/nonexistent/pagelist.toml")).unwrap_err();
        assert!(err.to_string().contains("pagelist init"));
    }
}
