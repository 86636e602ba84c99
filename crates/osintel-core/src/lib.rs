//! Shared domain types and configuration for osintel.
//!
//! Holds the analysis-type vocabulary, the read shapes exchanged between the
//! analysis engine, aggregator, and persistence layer, and the application
//! configuration loaded from environment variables.

pub mod app_config;
pub mod config;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use types::{AnalysisDoc, AnalysisType, Period};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
