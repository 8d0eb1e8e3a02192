pub mod routing;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::model::{RenderRow, RowKind};
use crate::text_metrics::measure_text_width;
use crate::theme::Theme;

use self::routing::{Rect, bevel_polyline, route_dependency};

/// A dated axis tick with its x position and preformatted label.
#[derive(Debug, Clone)]
pub struct Tick {
    pub x: f32,
    pub label: String,
}

/// Gutter text for one row.
#[derive(Debug, Clone)]
pub struct GutterLabel {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone)]
pub struct BarLayout {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct DiamondLayout {
    pub cx: f32,
    pub cy: f32,
    pub half_width: f32,
    pub half_height: f32,
}

#[derive(Debug, Clone)]
pub struct BracketLayout {
    pub x_start: f32,
    pub x_end: f32,
    pub y: f32,
    pub cap: f32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct ArrowLayout {
    pub points: Vec<(f32, f32)>,
}

/// Fully resolved chart geometry handed to the SVG renderer.
#[derive(Debug, Clone)]
pub struct GanttLayout {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub footer: String,
    pub chart_x: f32,
    pub chart_y: f32,
    pub chart_width: f32,
    pub chart_height: f32,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub ticks: Vec<Tick>,
    pub day_lines: Vec<f32>,
    pub labels: Vec<GutterLabel>,
    pub bars: Vec<BarLayout>,
    pub diamonds: Vec<DiamondLayout>,
    pub brackets: Vec<BracketLayout>,
    pub arrows: Vec<ArrowLayout>,
}

/// Compute the full chart geometry for a scheduled row list.
///
/// Fails on an empty row list and when no date window can be inferred;
/// everything downstream of this point is a pure drawing concern.
pub fn compute_layout(
    rows: &[RenderRow],
    theme: &Theme,
    config: &LayoutConfig,
    title: &str,
    min_override: Option<NaiveDate>,
    max_override: Option<NaiveDate>,
) -> Result<GanttLayout> {
    if rows.is_empty() {
        bail!("rows must not be empty");
    }

    let (min_date, max_date) = resolve_date_window(rows, min_override, max_override)?;
    let window_min = min_date - Duration::days(config.timeline_pad_days);
    let window_max = max_date + Duration::days(config.timeline_pad_days);
    let span_days = (window_max - window_min).num_days();

    let gutter_width = gutter_width(rows, theme, config);
    let chart_x = config.padding + gutter_width + config.label_gap;
    let chart_y = config.padding + theme.title_font_size + config.axis_height;
    let chart_width = (span_days as f32 + 1.0) * config.day_width;
    let chart_height = rows.len() as f32 * config.row_height;

    let date_to_x =
        |date: NaiveDate| chart_x + (date - window_min).num_days() as f32 * config.day_width;

    let colors = category_colors(rows, theme);
    let bar_height = config.row_height * config.bar_height_frac;

    let mut labels = Vec::with_capacity(rows.len());
    let mut bars = Vec::new();
    let mut diamonds = Vec::new();
    let mut brackets = Vec::new();
    let mut bar_rects: HashMap<&str, Rect> = HashMap::new();

    for row in rows {
        let y_center = chart_y + (row.order as f32 + 0.5) * config.row_height;
        labels.push(GutterLabel {
            x: config.padding + row.indent as f32 * config.indent_step,
            y: y_center,
            text: row.name.clone(),
            bold: row.kind == RowKind::Heading,
        });

        match row.kind {
            RowKind::Heading => {}
            RowKind::Bar => {
                let (Some(start), Some(finish)) = (row.start_date, row.finish_date) else {
                    continue;
                };
                let x = date_to_x(start);
                // Bars span through the end of the inclusive finish day.
                let width = date_to_x(finish + Duration::days(1)) - x;
                let color = row
                    .category
                    .as_deref()
                    .and_then(|cat| colors.get(cat))
                    .cloned()
                    .unwrap_or_else(|| theme.bar_fallback_color.clone());
                bars.push(BarLayout {
                    id: row.id.clone(),
                    x,
                    y: y_center - bar_height / 2.0,
                    width,
                    height: bar_height,
                    color,
                });
                bar_rects.insert(
                    row.id.as_str(),
                    Rect::new(x, x + width, y_center - bar_height / 2.0, y_center + bar_height / 2.0),
                );
            }
            RowKind::Lozenge => {
                let Some(deadline) = row.deadline_date else {
                    continue;
                };
                diamonds.push(DiamondLayout {
                    cx: date_to_x(deadline),
                    cy: y_center,
                    half_width: config.day_width * 0.45,
                    half_height: bar_height / 1.5,
                });
            }
            RowKind::Bracket => {
                let (Some(start), Some(finish)) = (row.start_date, row.finish_date) else {
                    continue;
                };
                let color = row
                    .category
                    .as_deref()
                    .and_then(|cat| colors.get(cat))
                    .cloned()
                    .unwrap_or_else(|| theme.bar_fallback_color.clone());
                brackets.push(BracketLayout {
                    x_start: date_to_x(start),
                    x_end: date_to_x(finish + Duration::days(1)),
                    y: y_center,
                    cap: config.row_height * config.bracket_cap_frac,
                    color,
                });
            }
        }
    }

    // Arrows run in document order so the drawing z-order is stable.
    let all_rects: Vec<Rect> = rows
        .iter()
        .filter_map(|row| bar_rects.get(row.id.as_str()).copied())
        .collect();
    let mut arrows = Vec::new();
    for row in rows {
        if row.kind != RowKind::Bar || row.depends_on.is_empty() {
            continue;
        }
        let Some(&target) = bar_rects.get(row.id.as_str()) else {
            continue;
        };
        for dep_id in &row.depends_on {
            let Some(&source) = bar_rects.get(dep_id.as_str()) else {
                continue;
            };
            let polyline = route_dependency(source, target, &all_rects);
            arrows.push(ArrowLayout {
                points: bevel_polyline(&polyline),
            });
        }
    }
    debug!(
        bars = bars.len(),
        arrows = arrows.len(),
        span_days,
        "layout computed"
    );

    let ticks = compute_ticks(window_min, window_max, span_days, &date_to_x);
    let day_lines = (0..=span_days)
        .map(|day| date_to_x(window_min + Duration::days(day)))
        .collect();

    let width = chart_x + chart_width + config.padding;
    let height = chart_y + chart_height + config.padding + theme.footer_font_size * 2.0;

    Ok(GanttLayout {
        width,
        height,
        title: title.to_string(),
        footer: format!("gantt-rs-renderer v{}", env!("CARGO_PKG_VERSION")),
        chart_x,
        chart_y,
        chart_width,
        chart_height,
        min_date,
        max_date,
        ticks,
        day_lines,
        labels,
        bars,
        diamonds,
        brackets,
        arrows,
    })
}

/// Resolve the chart date window. Overrides win; otherwise the window is
/// inferred from row dates, failing when nothing carries a date.
fn resolve_date_window(
    rows: &[RenderRow],
    min_override: Option<NaiveDate>,
    max_override: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate)> {
    let mut starts: Vec<NaiveDate> = Vec::new();
    let mut finishes: Vec<NaiveDate> = Vec::new();
    for row in rows {
        if let Some(start) = row.start_date {
            starts.push(start);
        }
        if let Some(deadline) = row.deadline_date {
            starts.push(deadline);
        }
        if let Some(finish) = row.finish_date {
            finishes.push(finish);
        }
    }

    let min_date = match min_override {
        Some(date) => date,
        None => match starts.iter().min() {
            Some(&date) => date,
            None => bail!("cannot infer min date; no date values present"),
        },
    };
    let max_date = match max_override {
        Some(date) => date,
        None => match finishes.iter().chain(starts.iter()).max() {
            Some(&date) => date,
            None => bail!("cannot infer max date; no date values present"),
        },
    };
    Ok((min_date, max_date))
}

/// Deterministic per-category palette: categories sorted by id take
/// palette slots in that order, so insertion order never shows through.
/// Entries in `theme.category_overrides` (plan color hints or config)
/// replace the assigned slot.
fn category_colors(rows: &[RenderRow], theme: &Theme) -> BTreeMap<String, String> {
    let sorted: BTreeSet<&str> = rows
        .iter()
        .filter_map(|row| row.category.as_deref())
        .collect();
    sorted
        .iter()
        .enumerate()
        .map(|(idx, cat)| {
            let color = theme
                .category_overrides
                .get(*cat)
                .cloned()
                .unwrap_or_else(|| theme.palette[idx % theme.palette.len()].clone());
            (cat.to_string(), color)
        })
        .collect()
}

/// Major tick positions chosen to keep labels readable across spans:
/// monthly beyond ~6 months, biweekly beyond ~3, weekly beyond ~6 weeks,
/// every other day below that.
fn compute_ticks(
    window_min: NaiveDate,
    window_max: NaiveDate,
    span_days: i64,
    date_to_x: &impl Fn(NaiveDate) -> f32,
) -> Vec<Tick> {
    let mut ticks = Vec::new();
    let mut date = window_min;
    while date <= window_max {
        let keep = if span_days > 180 {
            date.day() == 1
        } else if span_days > 90 {
            date.weekday() == Weekday::Mon && week_index(date) % 2 == 0
        } else if span_days > 45 {
            date.weekday() == Weekday::Mon
        } else {
            (date - window_min).num_days() % 2 == 0
        };
        if keep {
            let label = if span_days > 180 {
                date.format("%b %Y").to_string()
            } else {
                date.format("%b %d").to_string()
            };
            ticks.push(Tick {
                x: date_to_x(date),
                label,
            });
        }
        date += Duration::days(1);
    }
    ticks
}

/// Stable week parity anchored at the epoch, so biweekly ticks don't
/// shift with the chart window.
fn week_index(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 / 7
}

/// Width of the label gutter: the widest measured row label plus its
/// indent offset, clamped to the configured range. Falls back to a
/// character estimate when no font is available.
fn gutter_width(rows: &[RenderRow], theme: &Theme, config: &LayoutConfig) -> f32 {
    let mut widest = 0.0f32;
    for row in rows {
        let measured = measure_text_width(&row.name, theme.font_size, &theme.font_family)
            .unwrap_or_else(|| row.name.chars().count() as f32 * theme.font_size * 0.56);
        widest = widest.max(measured + row.indent as f32 * config.indent_step);
    }
    (widest + config.label_gap).clamp(config.gutter_min_width, config.gutter_max_width)
}
