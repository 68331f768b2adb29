//! TOML description of a prediction run.
//!
//! ```toml
//! [launch]
//! longitude = 5.9572
//! latitude = 43.744
//! altitude = 30000.0
//! time = 0.0
//!
//! [run]
//! timestep_s = 30.0
//!
//! [[models]]
//! name = "arome"
//! path = "bin/arome.bin"
//! preset = "arome"
//!
//! [[models]]
//! name = "arpege"
//! path = "bin/arpege.bin"
//! preset = "arpege"
//! ```
//!
//! Models are listed in priority order. Relative paths are resolved against
//! the directory holding the configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::GridFile;
use crate::error::{PredictorError, Result};
use crate::grid::{GridParams, ModelVariant};
use crate::prediction::{
    ModelSource, Predictor, TerminationPolicy, DEFAULT_MAX_ALTITUDE_M, DEFAULT_MAX_STEPS,
};
use crate::state::State;

/// Step length used when `[run]` does not give one.
pub const DEFAULT_TIMESTEP_S: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub launch: State,
    #[serde(default)]
    pub run: RunConfig,
    pub models: Vec<ModelEntry>,

    /// Directory relative model paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub timestep_s: f64,
    pub max_steps: usize,
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timestep_s: DEFAULT_TIMESTEP_S,
            max_steps: DEFAULT_MAX_STEPS,
            min_altitude_m: 0.0,
            max_altitude_m: DEFAULT_MAX_ALTITUDE_M,
        }
    }
}

impl RunConfig {
    pub fn policy(&self) -> TerminationPolicy {
        TerminationPolicy {
            max_steps: self.max_steps,
            min_altitude_m: self.min_altitude_m,
            max_altitude_m: self.max_altitude_m,
        }
    }
}

/// A `[[models]]` entry: either a named preset or an inline grid table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<ModelVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridParams>,
}

impl ModelEntry {
    pub fn grid_params(&self) -> std::result::Result<GridParams, String> {
        match (&self.preset, &self.grid) {
            (Some(model), None) => Ok(model.preset()),
            (None, Some(grid)) => Ok(grid.clone()),
            (Some(_), Some(_)) => Err(format!(
                "model '{}' sets both `preset` and `grid`",
                self.name
            )),
            (None, None) => Err(format!(
                "model '{}' needs either `preset` or `grid`",
                self.name
            )),
        }
    }
}

impl PredictionConfig {
    /// Reads and validates the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let config = Self::parse(&content, base_dir).map_err(|message| PredictorError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), models = config.models.len(), "loaded configuration");
        Ok(config)
    }

    /// Parses a configuration from TOML text.
    pub fn parse(content: &str, base_dir: PathBuf) -> std::result::Result<Self, String> {
        let mut config: PredictionConfig = toml::from_str(content).map_err(|e| e.to_string())?;
        config.base_dir = base_dir;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.models.is_empty() {
            return Err("at least one [[models]] entry is required".to_string());
        }
        for entry in &self.models {
            entry
                .grid_params()?
                .validate()
                .map_err(|e| format!("model '{}': {e}", entry.name))?;
        }
        if !(self.run.timestep_s > 0.0) || !self.run.timestep_s.is_finite() {
            return Err(format!(
                "run.timestep_s must be positive, got {}",
                self.run.timestep_s
            ));
        }
        if !(self.run.min_altitude_m < self.run.max_altitude_m) {
            return Err(format!(
                "run.min_altitude_m ({}) must be below run.max_altitude_m ({})",
                self.run.min_altitude_m, self.run.max_altitude_m
            ));
        }
        if !self.launch.is_finite() {
            return Err("launch state must be finite".to_string());
        }
        Ok(())
    }

    /// Model path with relative paths resolved against `base_dir`.
    pub fn model_path(&self, entry: &ModelEntry) -> PathBuf {
        if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            self.base_dir.join(&entry.path)
        }
    }

    /// Opens every model file and assembles a [`Predictor`].
    pub fn predictor(&self) -> Result<Predictor> {
        let mut sources = Vec::with_capacity(self.models.len());
        for entry in &self.models {
            let grid = entry.grid_params().map_err(PredictorError::InvalidGridParams)?;
            let file = GridFile::open(self.model_path(entry), &grid)?;
            sources.push(ModelSource::new(entry.name.clone(), grid, Box::new(file))?);
        }
        Ok(Predictor::new(sources, self.run.policy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [launch]
        longitude = 5.9572
        latitude = 43.744
        altitude = 30000.0
        time = 0.0

        [[models]]
        name = "arome"
        path = "bin/arome.bin"
        preset = "arome"

        [[models]]
        name = "custom"
        path = "/data/custom.bin"

        [models.grid]
        west = 3.0
        south = 43.0
        lng_points = 2
        lat_points = 2
        alt_points = 2
        time_points = 2
        lng_angle = 1.0
        lat_angle = 1.0
        fcst_interval = 3.0
        pressure_levels = [1.0, 1000.0]
        model = "arpege"
    "#;

    #[test]
    fn test_parse_sample() {
        let config = PredictionConfig::parse(SAMPLE, PathBuf::from("/work")).unwrap();
        assert_eq!(config.launch, State::new(5.9572, 43.744, 30_000.0, 0.0));
        assert_eq!(config.run, RunConfig::default());
        assert_eq!(config.models.len(), 2);

        assert_eq!(config.models[0].grid_params().unwrap(), GridParams::arome());
        assert_eq!(
            config.model_path(&config.models[0]),
            PathBuf::from("/work/bin/arome.bin")
        );
        assert_eq!(
            config.model_path(&config.models[1]),
            PathBuf::from("/data/custom.bin")
        );
        assert_eq!(config.models[1].grid_params().unwrap().model, ModelVariant::Arpege);
    }

    #[test]
    fn test_run_overrides() {
        let content = format!("{SAMPLE}\n[run]\ntimestep_s = 10.0\nmax_steps = 50\n");
        let config = PredictionConfig::parse(&content, PathBuf::new()).unwrap();
        let policy = config.run.policy();
        assert_eq!(config.run.timestep_s, 10.0);
        assert_eq!(policy.max_steps, 50);
        assert_eq!(policy.max_altitude_m, DEFAULT_MAX_ALTITUDE_M);
    }

    #[test]
    fn test_rejects_model_without_grid() {
        let content = r#"
            [launch]
            longitude = 5.0
            latitude = 43.0
            altitude = 1000.0
            time = 0.0

            [[models]]
            name = "orphan"
            path = "x.bin"
        "#;
        let err = PredictionConfig::parse(content, PathBuf::new()).unwrap_err();
        assert!(err.contains("orphan"), "{err}");
    }

    #[test]
    fn test_rejects_invalid_grid_and_run() {
        let bad_grid = SAMPLE.replace("lng_points = 2", "lng_points = 1");
        assert!(PredictionConfig::parse(&bad_grid, PathBuf::new()).is_err());

        let bad_step = format!("{SAMPLE}\n[run]\ntimestep_s = -1.0\n");
        assert!(PredictionConfig::parse(&bad_step, PathBuf::new()).is_err());

        let no_models = "models = []\n[launch]\nlongitude = 5.0\nlatitude = 43.0\naltitude = 1.0\ntime = 0.0\n";
        assert!(PredictionConfig::parse(no_models, PathBuf::new()).is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "launch = 3").unwrap();
        match PredictionConfig::load(&path) {
            Err(PredictorError::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PredictionConfig::parse(SAMPLE, PathBuf::new()).unwrap();
        let text = config.to_toml_string().unwrap();
        let again = PredictionConfig::parse(&text, PathBuf::new()).unwrap();
        assert_eq!(config, again);
    }
}
