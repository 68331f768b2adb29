//! Barometric atmosphere model.
//!
//! A three-band approximation of the standard atmosphere relating altitude,
//! pressure, temperature and density. Pressures are expressed in kPa
//! throughout this module; the grid mapper converts to hPa.
//!
//! Out-of-envelope inputs are clamped to [`MIN_MODEL_ALTITUDE_M`,
//! `MAX_MODEL_ALTITUDE_M`] (or the matching pressures). Non-finite altitudes
//! and non-positive pressures cannot be clamped meaningfully and are reported
//! as [`PredictorError::NumericDomain`].

use crate::constants::{
    CELSIUS_OFFSET, MAX_MODEL_ALTITUDE_M, MIN_MODEL_ALTITUDE_M, R_SPECIFIC_AIR,
    TROPOPAUSE_ALTITUDE_M, TROPOPAUSE_PRESSURE_KPA, UPPER_STRATOSPHERE_ALTITUDE_M,
    UPPER_STRATOSPHERE_PRESSURE_KPA,
};
use crate::error::{PredictorError, Result};

/// Upper altitude of the range the fast polynomial was fitted on (m)
pub const FAST_PRESSURE_MAX_ALTITUDE_M: f64 = 40_000.0;

/// Worst-case absolute error of [`fast_pressure_from_altitude`] on
/// `[0, FAST_PRESSURE_MAX_ALTITUDE_M]` (kPa)
pub const FAST_PRESSURE_TOLERANCE_KPA: f64 = 0.15;

/// Near-minimax fit of the banded model in the normalized variable
/// `s = altitude / 40000`, lowest order first.
const FAST_PRESSURE_COEFFS: [f64; 6] = [
    101.5327373,
    -482.911553,
    919.6020403,
    -830.203992,
    322.1907555,
    -29.78661836,
];

/// Band of the piecewise model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    /// 0 - 11 km, linear temperature decrease
    Troposphere,
    /// 11 - 25 km, isothermal
    LowerStratosphere,
    /// Above 25 km, linear temperature increase
    UpperStratosphere,
}

impl Band {
    fn for_altitude(altitude_m: f64) -> Self {
        if altitude_m > UPPER_STRATOSPHERE_ALTITUDE_M {
            Band::UpperStratosphere
        } else if altitude_m > TROPOPAUSE_ALTITUDE_M {
            Band::LowerStratosphere
        } else {
            Band::Troposphere
        }
    }

    fn for_pressure(pressure_kpa: f64) -> Self {
        if pressure_kpa < UPPER_STRATOSPHERE_PRESSURE_KPA {
            Band::UpperStratosphere
        } else if pressure_kpa <= TROPOPAUSE_PRESSURE_KPA {
            Band::LowerStratosphere
        } else {
            Band::Troposphere
        }
    }

    /// Temperature in °C
    fn temperature_c(self, altitude_m: f64) -> f64 {
        match self {
            Band::Troposphere => 15.04 - 0.00649 * altitude_m,
            Band::LowerStratosphere => -56.46,
            Band::UpperStratosphere => -131.21 + 0.00299 * altitude_m,
        }
    }

    /// Pressure in kPa given the band temperature at the same altitude
    fn pressure_kpa(self, altitude_m: f64, temperature_c: f64) -> f64 {
        match self {
            Band::Troposphere => {
                101.29 * ((temperature_c + CELSIUS_OFFSET) / 288.08).powf(5.256)
            }
            Band::LowerStratosphere => 22.65 * (1.73 - 0.000157 * altitude_m).exp(),
            Band::UpperStratosphere => {
                2.488 * ((temperature_c + CELSIUS_OFFSET) / 216.6).powf(-11.388)
            }
        }
    }

    /// Algebraic inverse of `pressure_kpa`
    fn altitude_m(self, pressure_kpa: f64) -> f64 {
        match self {
            Band::Troposphere => {
                let t_abs = 288.08 * (pressure_kpa / 101.29).powf(1.0 / 5.256);
                (15.04 + CELSIUS_OFFSET - t_abs) / 0.00649
            }
            Band::LowerStratosphere => (1.73 - (pressure_kpa / 22.65).ln()) / 0.000157,
            Band::UpperStratosphere => {
                let t_abs = 216.6 * (pressure_kpa / 2.488).powf(-1.0 / 11.388);
                (t_abs - CELSIUS_OFFSET + 131.21) / 0.00299
            }
        }
    }
}

/// Temperature (°C) and pressure (kPa) at an already clamped altitude.
fn temperature_and_pressure(altitude_m: f64) -> (f64, f64) {
    let band = Band::for_altitude(altitude_m);
    let temperature_c = band.temperature_c(altitude_m);
    (temperature_c, band.pressure_kpa(altitude_m, temperature_c))
}

fn clamp_altitude(altitude_m: f64) -> Result<f64> {
    if !altitude_m.is_finite() {
        return Err(PredictorError::NumericDomain {
            quantity: "altitude",
            value: altitude_m,
        });
    }
    Ok(altitude_m.clamp(MIN_MODEL_ALTITUDE_M, MAX_MODEL_ALTITUDE_M))
}

/// Atmospheric pressure in kPa at `altitude_m`.
pub fn pressure_from_altitude(altitude_m: f64) -> Result<f64> {
    let altitude = clamp_altitude(altitude_m)?;
    Ok(temperature_and_pressure(altitude).1)
}

/// Altitude in meters at which the model reaches `pressure_kpa`.
///
/// The band is chosen from the boundary pressures (2.488 and 22.65 kPa), so
/// the round trip with [`pressure_from_altitude`] is exact inside each band
/// and may be off by a few meters within ~20 m of the 11 km boundary where
/// the bands overlap slightly.
pub fn altitude_from_pressure(pressure_kpa: f64) -> Result<f64> {
    if !(pressure_kpa > 0.0) || !pressure_kpa.is_finite() {
        return Err(PredictorError::NumericDomain {
            quantity: "pressure",
            value: pressure_kpa,
        });
    }
    let lowest = temperature_and_pressure(MAX_MODEL_ALTITUDE_M).1;
    let highest = temperature_and_pressure(MIN_MODEL_ALTITUDE_M).1;
    let pressure = pressure_kpa.clamp(lowest, highest);

    let altitude = Band::for_pressure(pressure).altitude_m(pressure);
    Ok(altitude.clamp(MIN_MODEL_ALTITUDE_M, MAX_MODEL_ALTITUDE_M))
}

/// Air density in kg/m³ at `altitude_m` (ideal gas law on the band values).
pub fn density_from_altitude(altitude_m: f64) -> Result<f64> {
    let altitude = clamp_altitude(altitude_m)?;
    let (temperature_c, pressure) = temperature_and_pressure(altitude);
    Ok(pressure / (R_SPECIFIC_AIR * (temperature_c + CELSIUS_OFFSET)))
}

/// Polynomial approximation of [`pressure_from_altitude`] in kPa.
///
/// Within [`FAST_PRESSURE_TOLERANCE_KPA`] of the exact model on
/// `[0, 40000]` m. Inputs outside that range are clamped to it.
#[inline]
pub fn fast_pressure_from_altitude(altitude_m: f64) -> f64 {
    let s = altitude_m.clamp(0.0, FAST_PRESSURE_MAX_ALTITUDE_M) / FAST_PRESSURE_MAX_ALTITUDE_M;
    FAST_PRESSURE_COEFFS
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * s + c)
}
