//! Cheap approximations traded for accuracy in the per-step hot path.
//!
//! Each primitive here has a documented error bound; callers that need the
//! exact value should use the std equivalent instead.

/// Magic constant of the classic single-precision inverse square root.
const INV_SQRT_MAGIC: u32 = 0x5f37_59df;

/// Reinterprets the bits of `x`, applies the magic-constant estimate and one
/// Newton-Raphson refinement.
///
/// Relative error stays below 0.18 % for every positive normal input.
/// Non-positive input yields garbage; callers guarantee `x > 0`.
#[inline]
pub fn fast_inv_sqrt(x: f32) -> f32 {
    let estimate = f32::from_bits(INV_SQRT_MAGIC.wrapping_sub(x.to_bits() >> 1));
    estimate * (1.5 - 0.5 * x * estimate * estimate)
}

/// Third-order Taylor approximation of `sin(x)`.
///
/// Only meaningful on `[0, π/2]`: the relative error is 7.5 % at π/2,
/// 1.2 % at π/3 and 0.35 % at π/4, and it falls off quickly below that.
#[inline]
pub fn fast_sin(x: f64) -> f64 {
    x - x * x * x / 6.0
}
