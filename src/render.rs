use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::layout::GanttLayout;
use crate::theme::Theme;

#[cfg(feature = "png")]
use crate::config::RenderConfig;

/// Serialize a computed layout to an SVG document string.
pub fn render_svg(layout: &GanttLayout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"dep-arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.arrow_color
    ));
    svg.push_str("</defs>");

    // Day grid first so everything else draws over it.
    let grid_top = layout.chart_y;
    let grid_bottom = layout.chart_y + layout.chart_height;
    for x in &layout.day_lines {
        svg.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"{grid_top:.2}\" x2=\"{x:.2}\" y2=\"{grid_bottom:.2}\" stroke=\"{}\" stroke-width=\"0.5\" stroke-dasharray=\"1 3\" opacity=\"0.35\"/>",
            theme.grid_color
        ));
    }
    for tick in &layout.ticks {
        svg.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"{grid_top:.2}\" x2=\"{x:.2}\" y2=\"{grid_bottom:.2}\" stroke=\"{}\" stroke-width=\"0.8\" stroke-dasharray=\"5 4\" opacity=\"0.6\"/>",
            theme.grid_color,
            x = tick.x
        ));
        let label_y = grid_top - 6.0;
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{label_y:.2}\" text-anchor=\"start\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" transform=\"rotate(-30 {x:.2} {label_y:.2})\">{}</text>",
            theme.font_family,
            theme.tick_font_size,
            theme.muted_text_color,
            escape_xml(&tick.label),
            x = tick.x
        ));
    }

    for label in &layout.labels {
        let weight = if label.bold { " font-weight=\"bold\"" } else { "" };
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\"{weight}>{}</text>",
            label.x,
            label.y,
            theme.font_family,
            theme.font_size,
            theme.text_color,
            escape_xml(&label.text)
        ));
    }

    for bracket in &layout.brackets {
        let d = format!(
            "M {x0:.2} {top:.2} L {x0:.2} {bot:.2} M {x0:.2} {y:.2} L {x1:.2} {y:.2} M {x1:.2} {top:.2} L {x1:.2} {bot:.2}",
            x0 = bracket.x_start,
            x1 = bracket.x_end,
            y = bracket.y,
            top = bracket.y - bracket.cap,
            bot = bracket.y + bracket.cap,
        );
        svg.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2.5\"/>",
            bracket.color
        ));
    }

    for bar in &layout.bars {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" ry=\"2\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            bar.x, bar.y, bar.width, bar.height, bar.color, theme.bar_edge_color
        ));
    }

    for diamond in &layout.diamonds {
        let points = format!(
            "{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            diamond.cx - diamond.half_width,
            diamond.cy,
            diamond.cx,
            diamond.cy - diamond.half_height,
            diamond.cx + diamond.half_width,
            diamond.cy,
            diamond.cx,
            diamond.cy + diamond.half_height,
        );
        svg.push_str(&format!(
            "<polygon points=\"{points}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            theme.milestone_fill, theme.bar_edge_color
        ));
    }

    for arrow in &layout.arrows {
        let d = points_to_path(&arrow.points);
        if d.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.2\" marker-end=\"url(#dep-arrow)\"/>",
            theme.arrow_color
        ));
    }

    if !layout.title.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            layout.width / 2.0,
            theme.title_font_size * 1.4,
            theme.font_family,
            theme.title_font_size,
            theme.text_color,
            escape_xml(&layout.title)
        ));
    }
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" opacity=\"0.8\">{}</text>",
        layout.width - 6.0,
        layout.height - 6.0,
        theme.font_family,
        theme.footer_font_size,
        theme.muted_text_color,
        escape_xml(&layout.footer)
    ));

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.len() < 2 {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// Write the SVG document, creating parent directories as needed.
pub fn write_output_svg(svg: &str, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, svg)?;
    info!(path = %output.display(), "svg written");
    Ok(())
}

/// Rasterize the SVG to PNG, creating parent directories as needed.
#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    pixmap.save_png(output)?;
    info!(path = %output.display(), "png written");
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::model::{RenderRow, RowKind};
    use chrono::NaiveDate;

    #[test]
    fn render_svg_basic() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = vec![RenderRow {
            order: 0,
            indent: 1,
            kind: RowKind::Bar,
            id: "w".to_string(),
            name: "Write <docs>".to_string(),
            category: Some("cat".to_string()),
            depends_on: Vec::new(),
            start_date: Some(start),
            finish_date: Some(start + chrono::Duration::days(1)),
            deadline_date: None,
        }];
        let theme = Theme::default_light();
        let layout = compute_layout(&rows, &theme, &LayoutConfig::default(), "Demo", None, None)
            .unwrap();
        let svg = render_svg(&layout, &theme);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("Write &lt;docs&gt;"));
        assert!(svg.contains("dep-arrow"));
    }
}
