//! Error type shared by the whole crate.
//!
//! Data sparsity (no feasible zone, no facility, no flow-consistent
//! destination) is not an error and never ends up here. Only invalid
//! configuration values and I/O failures do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid value for weighting: {value}. Allowed values are {allowed:?}")]
    UnsupportedWeighting {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid mode: {value}. Mode must be one of {allowed:?}")]
    UnsupportedMode {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid sample column: {value}. The only supported column is {allowed:?}")]
    UnsupportedSampleColumn {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid assignment strategy: {0}. Expected `iterative` or `optimization`")]
    UnsupportedStrategy(String),

    #[error("time tolerance must be a fraction in [0, 1), got {0}")]
    InvalidTolerance(f64),

    #[error("cannot parse travel time combination `{0}`")]
    InvalidCombination(String),

    #[error("no centroid for zone {0}")]
    MissingCentroid(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
