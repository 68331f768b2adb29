/// Physical constants used by the atmosphere, geodesy and descent models

/// Mean Earth radius (m)
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Length of one degree of arc on the Earth's surface (m)
///
/// Value: 2π · 6371009 / 360, rounded to the metre.
pub const METERS_PER_DEGREE: f64 = 111_195.0;

/// Offset between Celsius temperatures and the absolute scale used by the
/// barometric band formulas
///
/// Note: the band formulas were fitted with 273.1, not 273.15. Keep them
/// consistent with each other rather than with the SI definition.
pub const CELSIUS_OFFSET: f64 = 273.1;

/// Specific gas constant for dry air in kJ/(kg·K)
///
/// Pressures are carried in kPa, so density = p / (R · T) comes out in kg/m³.
pub const R_SPECIFIC_AIR: f64 = 0.2869;

/// Conversion factor: kilopascal to hectopascal
pub const KPA_TO_HPA: f64 = 10.0;

/// Seconds per hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Payload descent rate at ground level (m/s)
pub const GROUND_DESCENT_RATE_MPS: f64 = 4.8;

/// Air density the ground descent rate was measured at (kg/m³)
pub const GROUND_AIR_DENSITY: f64 = 1.226614;

// Modelled atmosphere envelope

/// Lowest altitude handled by the barometric model (m)
pub const MIN_MODEL_ALTITUDE_M: f64 = 0.0;

/// Highest altitude handled by the barometric model (m)
pub const MAX_MODEL_ALTITUDE_M: f64 = 50_000.0;

/// Altitude of the troposphere / lower stratosphere band boundary (m)
pub const TROPOPAUSE_ALTITUDE_M: f64 = 11_000.0;

/// Altitude of the lower / upper stratosphere band boundary (m)
pub const UPPER_STRATOSPHERE_ALTITUDE_M: f64 = 25_000.0;

/// Band boundary pressure used to select the inverse formula (kPa)
pub const TROPOPAUSE_PRESSURE_KPA: f64 = 22.65;

/// Band boundary pressure used to select the inverse formula (kPa)
pub const UPPER_STRATOSPHERE_PRESSURE_KPA: f64 = 2.488;
