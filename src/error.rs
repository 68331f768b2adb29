//! Error type shared by the whole prediction pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Grid axis, used to report which coordinate left the samplable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    Longitude,
    Latitude,
    Altitude,
    Time,
}

impl std::fmt::Display for GridAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GridAxis::Longitude => "longitude",
            GridAxis::Latitude => "latitude",
            GridAxis::Altitude => "altitude",
            GridAxis::Time => "time",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PredictorError {
    /// A mapped coordinate falls outside `[0, max]` on some grid axis.
    #[error("{axis} grid coordinate {coordinate} outside samplable range [0, {max}]")]
    OutOfRangeGridCoordinate {
        axis: GridAxis,
        coordinate: f64,
        max: f64,
    },

    /// No model source reaches up to the pressure of the current state.
    #[error("no weather model covers {pressure_hpa} hPa (highest level available: {top_hpa} hPa)")]
    NoCoveringModel { pressure_hpa: f64, top_hpa: f64 },

    /// The positioned read on the dataset failed or came back short.
    #[error("grid dataset read failed at byte offset {offset}: {source}")]
    DataSource {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("{quantity} value {value} outside the atmosphere model domain")]
    NumericDomain { quantity: &'static str, value: f64 },

    #[error("interpolation over {dimensions} dimension(s) expects {expected} values, got {actual}")]
    InterpolationArityMismatch {
        dimensions: usize,
        expected: usize,
        actual: usize,
    },

    #[error("interpolation supports 1 to {max} dimensions, got {dimensions}")]
    UnsupportedDimensions { dimensions: usize, max: usize },

    #[error("invalid grid parameters: {0}")]
    InvalidGridParams(String),

    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
