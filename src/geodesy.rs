//! Linear to angular displacement on a spherical Earth.

use crate::constants::{EARTH_RADIUS_M, METERS_PER_DEGREE};
use crate::fast_math::fast_sin;

/// Ground distance covered by one degree of arc at a given location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetersPerDegree {
    /// Meters per degree of latitude
    pub latitude: f64,
    /// Meters per degree of longitude
    pub longitude: f64,
}

impl MetersPerDegree {
    /// Converts an east/north displacement in meters to (Δlongitude, Δlatitude)
    /// in degrees.
    pub fn to_degrees(&self, east_m: f64, north_m: f64) -> (f64, f64) {
        (east_m / self.longitude, north_m / self.latitude)
    }
}

/// Spherical-Earth scale factors at `latitude_deg`, `altitude_m` above the
/// mean radius.
pub fn meters_per_degree(latitude_deg: f64, altitude_m: f64) -> MetersPerDegree {
    let colatitude = (90.0 - latitude_deg).to_radians();
    let arc = (EARTH_RADIUS_M + altitude_m).to_radians();
    MetersPerDegree {
        latitude: arc,
        longitude: arc * colatitude.sin(),
    }
}

/// Cheap variant of [`meters_per_degree`].
///
/// Altitude is neglected (0.6 % low at 40 km) and the co-latitude sine uses
/// [`fast_sin`]. The co-latitude is taken on `|latitude|` so both hemispheres
/// stay on the accurate side of the approximation. Longitude-scale error:
/// at most 1.2 % for `|lat| >= 30°`, 0.4 % for `|lat| >= 45°`, 7.6 % at the
/// equator. Good enough for the few hundred meters a single step covers at
/// mid-latitudes; use the exact function elsewhere.
pub fn fast_meters_per_degree(latitude_deg: f64) -> MetersPerDegree {
    let colatitude = (90.0 - latitude_deg.abs()).to_radians();
    MetersPerDegree {
        latitude: METERS_PER_DEGREE,
        longitude: METERS_PER_DEGREE * fast_sin(colatitude),
    }
}
