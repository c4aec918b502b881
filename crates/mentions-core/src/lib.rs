//! Shared domain types and configuration for the mention aggregator.
//!
//! Holds the brand configuration model, the canonical mention shape, match
//! results, and environment-driven application config.

pub mod app_config;
pub mod brands;
pub mod config;
pub mod mention;

use thiserror::Error;

pub use app_config::{AppConfig, DeliveryMode, Environment};
pub use brands::{load_brands, parse_brands, slugify, BrandsFile, Competitor, TrackedBrand};
pub use config::{load_app_config, load_app_config_from_env};
pub use mention::{
    CompetitorTag, MatchDiagnostics, MatchResult, MatchType, MentionMetadata, NormalizedMention,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read brands file {path}: {source}")]
    BrandsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brands file: {0}")]
    BrandsFileParse(#[from] serde_yaml::Error),

    #[error("brands validation failed: {0}")]
    Validation(String),
}
