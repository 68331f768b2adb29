//! Multi-step descent prediction across one or more weather models.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::atmosphere::pressure_from_altitude;
use crate::constants::{KPA_TO_HPA, MIN_MODEL_ALTITUDE_M};
use crate::dataset::PositionedRead;
use crate::error::{PredictorError, Result};
use crate::grid::GridParams;
use crate::integrator::TrajectoryIntegrator;
use crate::state::State;

/// Default cap on the number of integration steps of a run.
pub const DEFAULT_MAX_STEPS: usize = 10_000;
/// Default ceiling; a trajectory reaching it is stopped.
pub const DEFAULT_MAX_ALTITUDE_M: f64 = 40_000.0;

/// One weather dataset together with the grid describing it.
pub struct ModelSource {
    pub name: String,
    pub grid: GridParams,
    pub source: Box<dyn PositionedRead>,
}

impl ModelSource {
    /// Pairs a dataset with its grid, rejecting grids that fail
    /// [`GridParams::validate`].
    pub fn new(
        name: impl Into<String>,
        grid: GridParams,
        source: Box<dyn PositionedRead>,
    ) -> Result<Self> {
        grid.validate()?;
        Ok(Self {
            name: name.into(),
            grid,
            source,
        })
    }
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSource")
            .field("name", &self.name)
            .field("model", &self.grid.model)
            .finish_non_exhaustive()
    }
}

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminationPolicy {
    pub max_steps: usize,
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            min_altitude_m: MIN_MODEL_ALTITUDE_M,
            max_altitude_m: DEFAULT_MAX_ALTITUDE_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Altitude fell to or below the floor
    Landed,
    /// Altitude rose to or above the ceiling
    CeilingReached,
    /// `max_steps` steps were taken without crossing a bound
    StepLimit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Landed => f.write_str("landed"),
            Termination::CeilingReached => f.write_str("ceiling reached"),
            Termination::StepLimit => f.write_str("step limit"),
        }
    }
}

/// States of a run, initial state first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub states: Vec<State>,
    pub termination: Termination,
}

impl Trajectory {
    /// Number of integration steps taken.
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    /// Forecast hours between the first and last state.
    pub fn duration_hours(&self) -> f64 {
        match (self.states.first(), self.states.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}

/// Integrates a state through a priority-ordered list of model sources.
#[derive(Debug)]
pub struct Predictor {
    sources: Vec<ModelSource>,
    policy: TerminationPolicy,
    integrator: TrajectoryIntegrator,
}

impl Predictor {
    /// `sources` are tried in order, so finer models go first.
    pub fn new(sources: Vec<ModelSource>, policy: TerminationPolicy) -> Self {
        Self {
            sources,
            policy,
            integrator: TrajectoryIntegrator::default(),
        }
    }

    pub fn with_integrator(mut self, integrator: TrajectoryIntegrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn sources(&self) -> &[ModelSource] {
        &self.sources
    }

    pub fn policy(&self) -> &TerminationPolicy {
        &self.policy
    }

    /// First source whose pressure levels reach the pressure at `state`.
    ///
    /// A source covers everything from its top level to the ground, so with
    /// a fine limited-height model listed before a global one the fine model
    /// is used as soon as the payload drops below its top.
    pub fn select(&self, state: &State) -> Result<&ModelSource> {
        self.select_index(state).map(|i| &self.sources[i])
    }

    fn select_index(&self, state: &State) -> Result<usize> {
        let pressure_hpa = pressure_from_altitude(state.altitude)? * KPA_TO_HPA;
        self.sources
            .iter()
            .position(|s| s.grid.covers_pressure(pressure_hpa))
            .ok_or_else(|| PredictorError::NoCoveringModel {
                pressure_hpa,
                top_hpa: self
                    .sources
                    .iter()
                    .filter_map(|s| s.grid.pressure_range().ok())
                    .map(|(top, _)| top)
                    .fold(f64::INFINITY, f64::min),
            })
    }

    fn terminated(&self, state: &State) -> Option<Termination> {
        if state.altitude <= self.policy.min_altitude_m {
            Some(Termination::Landed)
        } else if state.altitude >= self.policy.max_altitude_m {
            Some(Termination::CeilingReached)
        } else {
            None
        }
    }

    /// Steps from `initial` until a bound of the policy is crossed.
    ///
    /// The first failing step aborts the run with its error.
    pub fn run(&self, initial: State, timestep_s: f64) -> Result<Trajectory> {
        if !(timestep_s > 0.0) || !timestep_s.is_finite() {
            return Err(PredictorError::NumericDomain {
                quantity: "timestep",
                value: timestep_s,
            });
        }
        if !initial.is_finite() {
            return Err(PredictorError::NumericDomain {
                quantity: "initial state",
                value: f64::NAN,
            });
        }
        if self.terminated(&initial).is_some() {
            return Err(PredictorError::NumericDomain {
                quantity: "initial altitude",
                value: initial.altitude,
            });
        }

        info!(
            lng = initial.longitude,
            lat = initial.latitude,
            alt = initial.altitude,
            timestep_s,
            sources = self.sources.len(),
            "starting prediction"
        );

        let mut states = Vec::with_capacity(self.policy.max_steps.min(4096) + 1);
        states.push(initial);
        let mut current = initial;
        let mut active: Option<usize> = None;
        let mut termination = Termination::StepLimit;

        for _ in 0..self.policy.max_steps {
            let index = self.select_index(&current)?;
            let model = &self.sources[index];
            if active != Some(index) {
                debug!(
                    source = %model.name,
                    model = %model.grid.model,
                    alt = current.altitude,
                    "using dataset"
                );
                active = Some(index);
            }

            current = self
                .integrator
                .step(&current, &*model.source, &model.grid, timestep_s)?;
            states.push(current);

            if let Some(reason) = self.terminated(&current) {
                termination = reason;
                break;
            }
        }

        let trajectory = Trajectory {
            states,
            termination,
        };
        info!(
            steps = trajectory.steps(),
            hours = trajectory.duration_hours(),
            %termination,
            "prediction finished"
        );
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::error::GridAxis;
    use crate::grid::ModelVariant;

    fn grid(model: ModelVariant, pressure_levels: Vec<f64>) -> GridParams {
        GridParams {
            west: 5.0,
            south: 43.0,
            lng_points: 2,
            lat_points: 2,
            alt_points: 2,
            time_points: 2,
            var_points: 2,
            lng_angle: 1.0,
            lat_angle: 1.0,
            fcst_interval: 3.0,
            pressure_levels,
            model,
        }
    }

    fn uniform_source(name: &str, grid: GridParams, u: f32, v: f32) -> ModelSource {
        let half = grid.element_count() / 2;
        let dataset = MemoryDataset::from_fn(&grid, |i| if i < half { u } else { v });
        ModelSource::new(name, grid, Box::new(dataset)).unwrap()
    }

    fn two_model_predictor(policy: TerminationPolicy) -> Predictor {
        Predictor::new(
            vec![
                uniform_source("fine", grid(ModelVariant::Arome, vec![100.0, 1000.0]), 5.0, 0.0),
                uniform_source("coarse", grid(ModelVariant::Arpege, vec![1.0, 1000.0]), 2.0, 1.0),
            ],
            policy,
        )
    }

    #[test]
    fn test_select_prefers_first_covering_source() {
        let predictor = two_model_predictor(TerminationPolicy::default());
        let low = State::new(5.5, 43.5, 5_000.0, 0.0);
        let high = State::new(5.5, 43.5, 30_000.0, 0.0);
        assert_eq!(predictor.select(&low).unwrap().name, "fine");
        assert_eq!(predictor.select(&high).unwrap().name, "coarse");
    }

    #[test]
    fn test_select_without_covering_source() {
        let predictor = Predictor::new(
            vec![uniform_source("fine", grid(ModelVariant::Arome, vec![100.0, 1000.0]), 5.0, 0.0)],
            TerminationPolicy::default(),
        );
        let high = State::new(5.5, 43.5, 30_000.0, 0.0);
        match predictor.select(&high) {
            Err(PredictorError::NoCoveringModel { pressure_hpa, top_hpa }) => {
                assert!(pressure_hpa > 10.0 && pressure_hpa < 15.0, "{pressure_hpa}");
                assert_eq!(top_hpa, 100.0);
            }
            other => panic!("expected no covering model, got {other:?}"),
        }
    }

    #[test]
    fn test_select_covers_ground_layer() {
        // ~1014 hPa at sea level, below the 1000 hPa bottom level
        let predictor = two_model_predictor(TerminationPolicy::default());
        let ground = State::new(5.5, 43.5, 0.0, 0.0);
        assert_eq!(predictor.select(&ground).unwrap().name, "fine");
    }

    #[test]
    fn test_model_source_rejects_invalid_grid() {
        let mut bad = grid(ModelVariant::Arome, vec![100.0, 1000.0]);
        bad.lng_points = 0;
        let result = ModelSource::new("bad", bad, Box::new(MemoryDataset::default()));
        assert!(matches!(result, Err(PredictorError::InvalidGridParams(_))));

        let empty = grid(ModelVariant::Arome, Vec::new());
        let result = ModelSource::new("empty", empty, Box::new(MemoryDataset::default()));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_lands() {
        let predictor = two_model_predictor(TerminationPolicy::default());
        let initial = State::new(5.2, 43.2, 30_000.0, 0.0);
        let trajectory = predictor.run(initial, 60.0).unwrap();

        assert_eq!(trajectory.termination, Termination::Landed);
        assert_eq!(trajectory.states[0], initial);
        let last = trajectory.last().unwrap();
        assert!(last.altitude <= 0.0);
        assert!(trajectory.states[..trajectory.states.len() - 1]
            .iter()
            .all(|s| s.altitude > 0.0));

        // altitude strictly decreases, time advances a minute per step
        for pair in trajectory.states.windows(2) {
            assert!(pair[1].altitude < pair[0].altitude);
            assert!((pair[1].time - pair[0].time - 60.0 / 3600.0).abs() < 1e-12);
        }
        // both sources push east, only the coarse one pushes north
        assert!(last.longitude > initial.longitude);
        assert!(last.latitude > initial.latitude);
    }

    #[test]
    fn test_run_step_limit() {
        let policy = TerminationPolicy {
            max_steps: 3,
            ..Default::default()
        };
        let predictor = two_model_predictor(policy);
        let trajectory = predictor.run(State::new(5.2, 43.2, 20_000.0, 0.0), 30.0).unwrap();
        assert_eq!(trajectory.termination, Termination::StepLimit);
        assert_eq!(trajectory.states.len(), 4);
        assert_eq!(trajectory.steps(), 3);
    }

    #[test]
    fn test_run_ceiling_reached() {
        let policy = TerminationPolicy {
            max_altitude_m: 12_000.0,
            ..Default::default()
        };
        let rising = TrajectoryIntegrator {
            drag: -TrajectoryIntegrator::default().drag,
            ..Default::default()
        };
        let predictor = two_model_predictor(policy).with_integrator(rising);
        let trajectory = predictor.run(State::new(5.2, 43.2, 10_000.0, 0.0), 60.0).unwrap();
        assert_eq!(trajectory.termination, Termination::CeilingReached);
        assert!(trajectory.last().unwrap().altitude >= 12_000.0);
    }

    #[test]
    fn test_run_rejects_bad_start() {
        let predictor = two_model_predictor(TerminationPolicy::default());
        assert!(predictor.run(State::new(5.2, 43.2, 0.0, 0.0), 30.0).is_err());
        assert!(predictor.run(State::new(5.2, 43.2, 45_000.0, 0.0), 30.0).is_err());
        assert!(predictor.run(State::new(5.2, 43.2, 10_000.0, 0.0), 0.0).is_err());
        assert!(predictor.run(State::new(f64::NAN, 43.2, 10_000.0, 0.0), 30.0).is_err());
    }

    #[test]
    fn test_run_stops_at_first_failing_step() {
        // starts one step away from the eastern edge of the grid
        let predictor = Predictor::new(
            vec![uniform_source("fine", grid(ModelVariant::Arome, vec![5.0, 1000.0]), 50.0, 0.0)],
            TerminationPolicy::default(),
        );
        let err = predictor
            .run(State::new(5.99, 43.5, 10_000.0, 0.0), 60.0)
            .unwrap_err();
        assert!(matches!(
            err,
            PredictorError::OutOfRangeGridCoordinate { axis: GridAxis::Longitude, .. }
        ));
    }

    #[test]
    fn test_trajectory_serializes() {
        let trajectory = Trajectory {
            states: vec![State::new(5.0, 43.0, 100.0, 0.0)],
            termination: Termination::Landed,
        };
        let json = serde_json::to_string(&trajectory).unwrap();
        assert!(json.contains("\"termination\":\"landed\""));
        assert_eq!(trajectory.duration_hours(), 0.0);
    }
}
