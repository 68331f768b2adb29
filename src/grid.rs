//! Grid parameters and geographic to grid-index mapping.
//!
//! A dataset is a 5-D array (longitude, latitude, pressure level, forecast
//! time, variable) exported from GRIB by wgrib2. [`GridParams`] describes it
//! and [`map_to_grid`] turns a [`State`] into continuous index coordinates.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::atmosphere::pressure_from_altitude;
use crate::constants::KPA_TO_HPA;
use crate::error::{GridAxis, PredictorError, Result};
use crate::state::State;

/// ARPEGE 0.1 isobaric levels (hPa), top of the atmosphere first.
pub const ARPEGE_PRESSURE_LEVELS_HPA: [f64; 34] = [
    1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 20.0, 30.0, 50.0, 70.0, 100.0, 125.0, 150.0, 175.0, 200.0,
    225.0, 250.0, 275.0, 300.0, 350.0, 400.0, 450.0, 500.0, 550.0, 600.0, 650.0, 700.0, 750.0,
    800.0, 850.0, 900.0, 925.0, 950.0, 1000.0,
];

/// AROME isobaric levels (hPa); the model tops out at 100 hPa.
pub const AROME_PRESSURE_LEVELS_HPA: [f64; 24] = [
    100.0, 125.0, 150.0, 175.0, 200.0, 225.0, 250.0, 275.0, 300.0, 350.0, 400.0, 450.0, 500.0,
    550.0, 600.0, 650.0, 700.0, 750.0, 800.0, 850.0, 900.0, 925.0, 950.0, 1000.0,
];

/// Order of the axes inside the flat binary array, fastest varying first.
///
/// Both layouts start with longitude then latitude and end with the
/// variable; they differ in whether time or pressure level comes next.
/// Reading a file with the wrong layout yields plausible but wrong winds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLayout {
    /// lon, lat, time, level, variable
    LonLatTimeLevel,
    /// lon, lat, level, time, variable
    LonLatLevelTime,
}

/// Upstream weather model a dataset was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Arpege,
    Arome,
}

impl ModelVariant {
    /// Axis ordering wgrib2 produces for this model's files.
    pub fn layout(self) -> AxisLayout {
        match self {
            ModelVariant::Arpege => AxisLayout::LonLatTimeLevel,
            ModelVariant::Arome => AxisLayout::LonLatLevelTime,
        }
    }

    /// Preset grid of the Météo-France extract for this model.
    pub fn preset(self) -> GridParams {
        match self {
            ModelVariant::Arpege => GridParams::arpege(),
            ModelVariant::Arome => GridParams::arome(),
        }
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arpege" => Ok(ModelVariant::Arpege),
            "arome" => Ok(ModelVariant::Arome),
            other => Err(format!("unknown weather model '{other}' (expected arpege or arome)")),
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelVariant::Arpege => f.write_str("ARPEGE"),
            ModelVariant::Arome => f.write_str("AROME"),
        }
    }
}

/// Description of one binary grid dataset.
///
/// These values are a contract with the wgrib2 command that produced the
/// file (`-lola west:lng_points:lng_angle south:lat_points:lat_angle`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// Longitude of the first grid column (deg)
    pub west: f64,
    /// Latitude of the first grid row (deg)
    pub south: f64,

    pub lng_points: usize,
    pub lat_points: usize,
    pub alt_points: usize,
    pub time_points: usize,
    #[serde(default = "default_var_points")]
    pub var_points: usize,

    /// Longitude spacing (deg)
    pub lng_angle: f64,
    /// Latitude spacing (deg)
    pub lat_angle: f64,
    /// Hours between consecutive forecast times
    pub fcst_interval: f64,
    /// Isobaric levels of the altitude axis (hPa), strictly monotonic
    pub pressure_levels: Vec<f64>,

    pub model: ModelVariant,
}

fn default_var_points() -> usize {
    2
}

impl GridParams {
    /// ARPEGE 0.25° extract over 3-8°E, 43-48°N, 9 forecasts every 3 h.
    ///
    /// `wgrib2 arpege.grib2 -match ":(UGRD|VGRD):" -no_header -lola "3:20:0.25" "43:20:0.25" arpege.bin bin`
    pub fn arpege() -> Self {
        Self {
            west: 3.0,
            south: 43.0,
            lng_points: 20,
            lat_points: 20,
            alt_points: ARPEGE_PRESSURE_LEVELS_HPA.len(),
            time_points: 9,
            var_points: 2,
            lng_angle: 0.25,
            lat_angle: 0.25,
            fcst_interval: 3.0,
            pressure_levels: ARPEGE_PRESSURE_LEVELS_HPA.to_vec(),
            model: ModelVariant::Arpege,
        }
    }

    /// AROME 0.025° extract over 3-8°E, 43-48°N, 7 hourly forecasts.
    ///
    /// `wgrib2 arome.grib2 -match ":(UGRD|VGRD):" -no_header -lola "3:200:0.025" "43:200:0.025" arome.bin bin`
    pub fn arome() -> Self {
        Self {
            west: 3.0,
            south: 43.0,
            lng_points: 200,
            lat_points: 200,
            alt_points: AROME_PRESSURE_LEVELS_HPA.len(),
            time_points: 7,
            var_points: 2,
            lng_angle: 0.025,
            lat_angle: 0.025,
            fcst_interval: 1.0,
            pressure_levels: AROME_PRESSURE_LEVELS_HPA.to_vec(),
            model: ModelVariant::Arome,
        }
    }

    /// Number of f32 values a dataset with these parameters holds.
    pub fn element_count(&self) -> u64 {
        [
            self.lng_points,
            self.lat_points,
            self.alt_points,
            self.time_points,
            self.var_points,
        ]
        .iter()
        .map(|&n| n as u64)
        .product()
    }

    /// Checks the structural invariants the mapper and sampler rely on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PredictorError::InvalidGridParams(msg));

        for (name, count) in [
            ("lng_points", self.lng_points),
            ("lat_points", self.lat_points),
            ("alt_points", self.alt_points),
            ("time_points", self.time_points),
        ] {
            if count < 2 {
                return invalid(format!("{name} must be at least 2, got {count}"));
            }
        }
        if self.var_points < 2 {
            return invalid(format!(
                "var_points must hold both wind components, got {}",
                self.var_points
            ));
        }
        for (name, value) in [
            ("lng_angle", self.lng_angle),
            ("lat_angle", self.lat_angle),
            ("fcst_interval", self.fcst_interval),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        if !self.west.is_finite() || !self.south.is_finite() {
            return invalid("grid origin must be finite".to_string());
        }
        if self.pressure_levels.len() != self.alt_points {
            return invalid(format!(
                "{} pressure levels for {} altitude points",
                self.pressure_levels.len(),
                self.alt_points
            ));
        }
        if self.pressure_levels.iter().any(|p| !(*p > 0.0) || !p.is_finite()) {
            return invalid("pressure levels must be positive".to_string());
        }
        let increasing = self.pressure_levels.windows(2).all(|w| w[0] < w[1]);
        let decreasing = self.pressure_levels.windows(2).all(|w| w[0] > w[1]);
        if !increasing && !decreasing {
            return invalid("pressure levels must be strictly monotonic".to_string());
        }
        Ok(())
    }

    /// Pressure range (hPa) spanned by the level table, top then bottom.
    pub fn pressure_range(&self) -> Result<(f64, f64)> {
        match (self.pressure_levels.first(), self.pressure_levels.last()) {
            (Some(&first), Some(&last)) => Ok((first.min(last), first.max(last))),
            _ => Err(PredictorError::InvalidGridParams(
                "pressure level table is empty".to_string(),
            )),
        }
    }

    /// Whether the grid can be sampled at `pressure_hpa`.
    ///
    /// Everything from the top level down to the ground is covered: below the
    /// bottom isobaric level the bottom level's winds are held (see
    /// [`map_to_grid`]). An empty level table covers nothing.
    pub fn covers_pressure(&self, pressure_hpa: f64) -> bool {
        match self.pressure_range() {
            Ok((top, _)) => pressure_hpa >= top,
            Err(_) => false,
        }
    }

    fn axis_points(&self, axis: GridAxis) -> usize {
        match axis {
            GridAxis::Longitude => self.lng_points,
            GridAxis::Latitude => self.lat_points,
            GridAxis::Altitude => self.alt_points,
            GridAxis::Time => self.time_points,
        }
    }
}

/// Continuous grid-index coordinates of a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoordinates {
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub rt: f64,
}

/// Lower corner of the 2x2x2x2 sampling cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub t: usize,
}

/// Integer cell plus the position inside it, one fraction per axis in
/// `[0, 1]`, ordered (lon, lat, level, time).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPosition {
    pub cell: GridCell,
    pub fraction: [f64; 4],
}

impl GridCoordinates {
    /// Splits every coordinate into cell index and fraction.
    ///
    /// A coordinate must lie in `[0, points - 1]`; the last grid line maps to
    /// the last cell with fraction 1 so both neighbours stay readable.
    /// Anything else is rejected rather than clamped.
    pub fn locate(&self, grid: &GridParams) -> Result<CellPosition> {
        let (x, dx) = split_axis(self.rx, GridAxis::Longitude, grid)?;
        let (y, dy) = split_axis(self.ry, GridAxis::Latitude, grid)?;
        let (z, dz) = split_axis(self.rz, GridAxis::Altitude, grid)?;
        let (t, dt) = split_axis(self.rt, GridAxis::Time, grid)?;
        Ok(CellPosition {
            cell: GridCell { x, y, z, t },
            fraction: [dx, dy, dz, dt],
        })
    }
}

fn split_axis(coordinate: f64, axis: GridAxis, grid: &GridParams) -> Result<(usize, f64)> {
    let points = grid.axis_points(axis);
    if points < 2 {
        return Err(PredictorError::InvalidGridParams(format!(
            "{axis} axis needs at least 2 points, got {points}"
        )));
    }
    let last = (points - 1) as f64;
    if !(coordinate >= 0.0 && coordinate <= last) {
        return Err(PredictorError::OutOfRangeGridCoordinate {
            axis,
            coordinate,
            max: last,
        });
    }
    let cell = coordinate.floor().min(last - 1.0);
    Ok((cell as usize, coordinate - cell))
}

/// Fractional index of `pressure` in a strictly monotonic level table.
///
/// Binary search for the insertion point, then linear inverse interpolation
/// between the two bracketing levels. Pressures beyond either end of the
/// table are extrapolated from the two edge levels, which puts the result
/// outside `[0, len - 1]`. Tables with fewer than two levels are rejected.
pub fn pressure_level(pressure: f64, levels: &[f64]) -> Result<f64> {
    let n = levels.len();
    if n < 2 {
        return Err(PredictorError::InvalidGridParams(format!(
            "pressure level table needs at least 2 levels, got {n}"
        )));
    }
    let increasing = levels[0] < levels[n - 1];
    let insertion = if increasing {
        levels.partition_point(|&p| p < pressure)
    } else {
        levels.partition_point(|&p| p > pressure)
    };
    let upper = insertion.clamp(1, n - 1);
    let lower = upper - 1;
    Ok(lower as f64 + (pressure - levels[lower]) / (levels[upper] - levels[lower]))
}

/// Maps a state to continuous grid-index coordinates of `grid`.
///
/// Pressures higher than the bottom level (the layer between the lowest
/// isobaric surface and the ground, ~1014 hPa at sea level for 1000 hPa
/// tables) are held at the bottom level, so a descent can be followed down
/// to the ground. Pressures above the top level are left to extrapolate and
/// are rejected by [`GridCoordinates::locate`].
pub fn map_to_grid(state: &State, grid: &GridParams) -> Result<GridCoordinates> {
    let pressure_hpa = pressure_from_altitude(state.altitude)? * KPA_TO_HPA;
    let (_, bottom_hpa) = grid.pressure_range()?;
    Ok(GridCoordinates {
        rx: (state.longitude - grid.west) / grid.lng_angle,
        ry: (state.latitude - grid.south) / grid.lat_angle,
        rz: pressure_level(pressure_hpa.min(bottom_hpa), &grid.pressure_levels)?,
        rt: state.time / grid.fcst_interval,
    })
}
