//! # Balloon Predictor
//!
//! Descent trajectory prediction for high-altitude balloon payloads using
//! gridded ARPEGE / AROME wind forecasts pre-processed by wgrib2.

// Re-export the main types and functions
pub use config::{ModelEntry, PredictionConfig, RunConfig};
pub use dataset::{GridFile, MemoryDataset, PositionedRead};
pub use error::{GridAxis, PredictorError, Result};
pub use grid::{map_to_grid, GridCoordinates, GridParams, ModelVariant};
pub use integrator::{step, InverseSqrt, TrajectoryIntegrator};
pub use kml::{write_kml, KmlWriter};
pub use prediction::{ModelSource, Predictor, Termination, TerminationPolicy, Trajectory};
pub use state::State;

// Module declarations
pub mod atmosphere;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod fast_math;
pub mod geodesy;
pub mod grid;
pub mod integrator;
pub mod interpolation;
pub mod kml;
pub mod prediction;
pub mod sampler;
pub mod state;
