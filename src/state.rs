use serde::{Deserialize, Serialize};

/// Position of the payload in space and forecast time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Longitude (deg, east positive)
    pub longitude: f64,
    /// Latitude (deg, north positive)
    pub latitude: f64,
    /// Altitude above mean sea level (m)
    pub altitude: f64,
    /// Hours elapsed since the weather model reference time
    pub time: f64,
}

impl State {
    pub fn new(longitude: f64, latitude: f64, altitude: f64, time: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
            time,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && self.altitude.is_finite()
            && self.time.is_finite()
    }
}
