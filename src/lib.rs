#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod parser;
pub mod render;
pub mod rows;
pub mod schedule;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::PlanError;
