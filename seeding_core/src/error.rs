//! Error types for the seeding_core library.
//!
//! Messy input data (bad marks, missing result rows) never surfaces here; it is
//! reported as a [`crate::SeedingWarning`] on an otherwise successful result.
//! The variants below are for I/O failures and for configurations that cannot
//! produce a fair draw.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for seeding_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Preset id not present in the catalog
    #[error("Unknown seeding preset '{0}'")]
    UnknownPreset(String),

    /// Lane, heat-size or qualification settings that cannot produce a fair draw
    #[error("Infeasible configuration: {0}")]
    Infeasible(String),

    /// More athletes in a laned heat than there are lanes
    #[error("Heat of {entrants} athletes does not fit {lane_count} lanes")]
    HeatOverflow { entrants: usize, lane_count: u8 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
