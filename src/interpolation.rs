//! N-dimensional multilinear and cubic Hermite interpolation.
//!
//! Samples are laid out with axis 0 varying fastest. Each pass collapses one
//! axis: pairs (linear) or quadruples (cubic) of adjacent values are reduced
//! with the coordinate of that axis until a single value is left. Scratch
//! space is a fixed stack buffer sized for [`MAX_DIMENSIONS`].

use crate::error::{PredictorError, Result};

/// Highest dimensionality supported by [`nlerp`] and [`ncerp`].
pub const MAX_DIMENSIONS: usize = 4;

const LINEAR_SCRATCH: usize = 1 << (MAX_DIMENSIONS - 1);
const CUBIC_SCRATCH: usize = 1 << (2 * (MAX_DIMENSIONS - 1));

/// Linear interpolation between `a` (x = 0) and `b` (x = 1).
#[inline(always)]
pub fn lerp(a: f64, b: f64, x: f64) -> f64 {
    a * (1.0 - x) + b * x
}

/// Catmull-Rom cubic through `p1` (x = 0) and `p2` (x = 1), shaped by the
/// outer neighbours `p0` and `p3`.
#[inline(always)]
pub fn cerp(p0: f64, p1: f64, p2: f64, p3: f64, x: f64) -> f64 {
    p1 + 0.5
        * x
        * (p2 - p0 + x * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + x * (3.0 * (p1 - p2) + p3 - p0)))
}

fn check_arity(n: usize, group: usize, samples: &[f64], coords: &[f64]) -> Result<()> {
    if n == 0 || n > MAX_DIMENSIONS {
        return Err(PredictorError::UnsupportedDimensions {
            dimensions: n,
            max: MAX_DIMENSIONS,
        });
    }
    let expected = group.pow(n as u32);
    if samples.len() != expected {
        return Err(PredictorError::InterpolationArityMismatch {
            dimensions: n,
            expected,
            actual: samples.len(),
        });
    }
    if coords.len() != n {
        return Err(PredictorError::InterpolationArityMismatch {
            dimensions: n,
            expected: n,
            actual: coords.len(),
        });
    }
    Ok(())
}

/// Multilinear interpolation of `2^n` samples at `coords` (one per axis).
///
/// Coordinates are usually in `[0, 1]`; values outside extrapolate linearly.
pub fn nlerp(n: usize, samples: &[f64], coords: &[f64]) -> Result<f64> {
    check_arity(n, 2, samples, coords)?;

    let mut scratch = [0.0; LINEAR_SCRATCH];
    let mut points = 1 << (n - 1);
    for j in 0..points {
        scratch[j] = lerp(samples[2 * j], samples[2 * j + 1], coords[0]);
    }
    for &x in &coords[1..] {
        points >>= 1;
        for j in 0..points {
            scratch[j] = lerp(scratch[2 * j], scratch[2 * j + 1], x);
        }
    }
    Ok(scratch[0])
}

/// Cubic Hermite interpolation of `4^n` samples at `coords`.
///
/// Along every axis the four samples are the neighbours at offsets -1, 0, 1
/// and 2; the coordinate runs between the middle two.
pub fn ncerp(n: usize, samples: &[f64], coords: &[f64]) -> Result<f64> {
    check_arity(n, 4, samples, coords)?;

    let mut scratch = [0.0; CUBIC_SCRATCH];
    let mut points = 1 << (2 * (n - 1));
    for j in 0..points {
        let p = &samples[4 * j..4 * j + 4];
        scratch[j] = cerp(p[0], p[1], p[2], p[3], coords[0]);
    }
    for &x in &coords[1..] {
        points >>= 2;
        for j in 0..points {
            let p = &scratch[4 * j..4 * j + 4];
            let reduced = cerp(p[0], p[1], p[2], p[3], x);
            scratch[j] = reduced;
        }
    }
    Ok(scratch[0])
}
