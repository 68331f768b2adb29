//! Single explicit Euler step of the balloon trajectory.
//!
//! Horizontal motion follows the interpolated forecast wind; vertical motion
//! is a fixed-drag descent whose rate scales with the inverse square root of
//! air density (a parachute at terminal velocity).

use nalgebra::Vector2;
use tracing::trace;

use crate::atmosphere::density_from_altitude;
use crate::constants::{GROUND_AIR_DENSITY, GROUND_DESCENT_RATE_MPS, SECONDS_PER_HOUR};
use crate::dataset::PositionedRead;
use crate::error::{PredictorError, Result};
use crate::fast_math::fast_inv_sqrt;
use crate::geodesy::fast_meters_per_degree;
use crate::grid::{map_to_grid, GridParams};
use crate::interpolation::nlerp;
use crate::sampler::sample;
use crate::state::State;

/// How `density^(-1/2)` is evaluated in the descent law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InverseSqrt {
    /// Bit-cast estimate plus one Newton step, within 0.18 %
    #[default]
    Fast,
    /// `1.0 / x.sqrt()`
    Exact,
}

impl InverseSqrt {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            InverseSqrt::Fast => fast_inv_sqrt(x as f32) as f64,
            InverseSqrt::Exact => 1.0 / x.sqrt(),
        }
    }
}

/// Descent coefficient giving `descent_rate_mps` at `density` (kg/m³).
pub fn drag_coefficient(descent_rate_mps: f64, density: f64) -> f64 {
    descent_rate_mps * density.sqrt()
}

/// Stateless step function; holds only the descent law parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryIntegrator {
    /// Descent rate times sqrt(density), so that rate = drag / sqrt(rho)
    pub drag: f64,
    pub inverse_sqrt: InverseSqrt,
}

impl Default for TrajectoryIntegrator {
    fn default() -> Self {
        Self {
            drag: drag_coefficient(GROUND_DESCENT_RATE_MPS, GROUND_AIR_DENSITY),
            inverse_sqrt: InverseSqrt::Fast,
        }
    }
}

impl TrajectoryIntegrator {
    pub fn new(drag: f64, inverse_sqrt: InverseSqrt) -> Self {
        Self { drag, inverse_sqrt }
    }

    /// Vertical speed (m/s, positive down) at `altitude_m`.
    pub fn descent_rate(&self, altitude_m: f64) -> Result<f64> {
        let density = density_from_altitude(altitude_m)?;
        Ok(self.drag * self.inverse_sqrt.apply(density))
    }

    /// Advances `state` by `timestep_s` seconds through `source`.
    ///
    /// Fails when the state maps outside the samplable part of `grid`, when
    /// the dataset cannot be read, or when the result is not finite.
    pub fn step<R: PositionedRead + ?Sized>(
        &self,
        state: &State,
        source: &R,
        grid: &GridParams,
        timestep_s: f64,
    ) -> Result<State> {
        if !timestep_s.is_finite() {
            return Err(PredictorError::NumericDomain {
                quantity: "timestep",
                value: timestep_s,
            });
        }

        let position = map_to_grid(state, grid)?.locate(grid)?;
        let cubes = sample(source, position.cell, grid)?;
        let wind = Vector2::new(
            nlerp(4, &cubes.u, &position.fraction)?,
            nlerp(4, &cubes.v, &position.fraction)?,
        );

        let displacement = wind * timestep_s;
        let scale = fast_meters_per_degree(state.latitude);
        let (d_lng, d_lat) = scale.to_degrees(displacement.x, displacement.y);

        let next = State {
            longitude: state.longitude + d_lng,
            latitude: state.latitude + d_lat,
            altitude: state.altitude - timestep_s * self.descent_rate(state.altitude)?,
            time: state.time + timestep_s / SECONDS_PER_HOUR,
        };
        trace!(
            wind_u = wind.x,
            wind_v = wind.y,
            lng = next.longitude,
            lat = next.latitude,
            alt = next.altitude,
            "step"
        );

        if !next.is_finite() {
            return Err(PredictorError::NumericDomain {
                quantity: "state",
                value: f64::NAN,
            });
        }
        Ok(next)
    }
}

/// [`TrajectoryIntegrator::step`] with the default descent law.
pub fn step<R: PositionedRead + ?Sized>(
    state: &State,
    source: &R,
    grid: &GridParams,
    timestep_s: f64,
) -> Result<State> {
    TrajectoryIntegrator::default().step(state, source, grid, timestep_s)
}
