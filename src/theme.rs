use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Visual styling for the chart: fonts, chrome colors, and the category
/// palette. `category_overrides` maps category ids to explicit colors and
/// is filled from plan color hints (or a config file) before layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub title_font_size: f32,
    pub tick_font_size: f32,
    pub footer_font_size: f32,
    pub background: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub grid_color: String,
    pub bar_edge_color: String,
    pub bar_fallback_color: String,
    pub milestone_fill: String,
    pub arrow_color: String,
    pub palette: Vec<String>,
    #[serde(default)]
    pub category_overrides: BTreeMap<String, String>,
}

impl Theme {
    pub fn default_light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 18.0,
            tick_font_size: 11.0,
            footer_font_size: 10.0,
            background: "#FFFFFF".to_string(),
            text_color: "#1C2430".to_string(),
            muted_text_color: "#7A8AA6".to_string(),
            grid_color: "#C7D2E5".to_string(),
            bar_edge_color: "#1C2430".to_string(),
            bar_fallback_color: "#999999".to_string(),
            milestone_fill: "#666666".to_string(),
            arrow_color: "#3A3A3A".to_string(),
            palette: vec![
                "#1F77B4".to_string(),
                "#FF7F0E".to_string(),
                "#2CA02C".to_string(),
                "#D62728".to_string(),
                "#9467BD".to_string(),
                "#8C564B".to_string(),
                "#E377C2".to_string(),
                "#7F7F7F".to_string(),
                "#BCBD22".to_string(),
                "#17BECF".to_string(),
            ],
            category_overrides: BTreeMap::new(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_light()
    }
}
