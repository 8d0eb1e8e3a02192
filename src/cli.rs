use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::load_config;
use crate::layout::compute_layout;
use crate::parser::parse_plan_str;
use crate::render::{render_svg, write_output_svg};
use crate::rows::flatten_rows;
use crate::schedule::schedule;

#[derive(Parser, Debug)]
#[command(
    name = "ganttr",
    version,
    about = "Deterministic Gantt chart renderer (YAML plan to SVG)"
)]
pub struct Args {
    /// Input plan YAML
    pub input: PathBuf,

    /// Output file path
    #[arg(short = 'o', long = "out", default_value = "output/gantt_chart.svg")]
    pub out: PathBuf,

    /// Override the inferred minimum date (YYYY-MM-DD)
    #[arg(long = "min-date", value_parser = parse_cli_date)]
    pub min_date: Option<NaiveDate>,

    /// Override the inferred maximum date (YYYY-MM-DD)
    #[arg(long = "max-date", value_parser = parse_cli_date)]
    pub max_date: Option<NaiveDate>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "svg")]
    pub format: OutputFormat,

    /// Config JSON file (theme and layout overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Best-effort open the output file after rendering
    #[arg(long = "view")]
    pub view: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GANTT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("gantt_rs_renderer=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read plan file {}", args.input.display()))?;

    let mut plan = parse_plan_str(&input)?;
    schedule(&mut plan)?;

    // Plan color hints take a category's palette slot.
    for category in &plan.categories {
        if let Some(color) = &category.color {
            config
                .theme
                .category_overrides
                .insert(category.id.clone(), color.clone());
        }
    }

    let rows = flatten_rows(&plan);
    debug!(rows = rows.len(), "plan flattened");

    let layout = compute_layout(
        &rows,
        &config.theme,
        &config.layout,
        &plan.name,
        args.min_date,
        args.max_date,
    )?;
    let svg = render_svg(&layout, &config.theme);

    match args.format {
        OutputFormat::Svg => write_output_svg(&svg, &args.out)?,
        OutputFormat::Png => {
            #[cfg(feature = "png")]
            crate::render::write_output_png(&svg, &args.out, &config.render)?;
            #[cfg(not(feature = "png"))]
            anyhow::bail!("this build does not include PNG support");
        }
    }

    if args.view {
        let _ = open::that(&args.out);
    }
    Ok(())
}
