use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// Chart geometry knobs. All lengths are in output pixels; the timeline
/// pad is in calendar days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub row_height: f32,
    pub day_width: f32,
    pub padding: f32,
    pub label_gap: f32,
    pub indent_step: f32,
    pub axis_height: f32,
    pub gutter_min_width: f32,
    pub gutter_max_width: f32,
    pub timeline_pad_days: i64,
    pub bar_height_frac: f32,
    pub bracket_cap_frac: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_height: 28.0,
            day_width: 18.0,
            padding: 24.0,
            label_gap: 14.0,
            indent_step: 12.0,
            axis_height: 34.0,
            gutter_min_width: 120.0,
            gutter_max_width: 360.0,
            timeline_pad_days: 7,
            bar_height_frac: 0.6,
            bracket_cap_frac: 0.22,
        }
    }
}

/// Rasterization defaults used when the SVG carries no intrinsic size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

/// Load a config file (JSON, with JSON5 relaxations) merged over the
/// defaults, or plain defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = json5::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}
