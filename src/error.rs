use std::path::PathBuf;
use thiserror::Error;

/// Problems with the run configuration. These are fatal and are raised
/// before any segment is looked at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid cell size must be finite and no smaller than a few nanometres (got {0})")]
    InvalidCellSize(f64),
    #[error("endpoint tolerance must be zero (exact) or a positive, finite distance (got {0})")]
    InvalidTolerance(f64),
    #[error("unrecognised arterial keyword set '{0}' (expected one of: highway, none, custom)")]
    UnknownKeywordSet(String),
    #[error("arterial keyword set 'custom' needs at least one keyword")]
    EmptyCustomKeywords,
    #[error("ordinal start must be 0 or 1 (got {0})")]
    InvalidOrdinalStart(u32),
    #[error("readable id separator must be a single non-alphanumeric ASCII character (got '{0}')")]
    InvalidSeparator(String),
    #[error("could not parse run configuration: {0}")]
    Parse(String),
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(err: ron::error::SpannedError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// A connectivity strategy could not produce a partition for one street.
/// Local to that street (and, in the benchmark, to that one strategy).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("geometry operation failed: {0}")]
    Geometry(String),
    #[error("strategy panicked: {0}")]
    Panicked(String),
    #[error("non-finite coordinate in segment {0}")]
    NonFinite(usize),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("expected a FeatureCollection at the top level")]
    NotFeatureCollection,
}
