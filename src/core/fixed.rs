//! Q16.16 Fixed-Point Arithmetic
//!
//! This module provides deterministic fixed-point math for the movement simulation.
//! All per-step operations use integer arithmetic only - no floats in the step.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Designer parameters arrive as `f64` and are converted once with
//! [`fixed_from_f64`] when a controller is built. Nothing inside a step
//! converts back.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Maximum positive value
pub const FIXED_MAX: Fixed = i32::MAX;

/// Minimum negative value
pub const FIXED_MIN: Fixed = i32::MIN;

/// Distances at or below this count as surface contact (~0.0005 units).
pub const CONTACT_EPSILON: Fixed = 32;

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Convert a compile-time float to fixed-point (truncating).
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in the step loop.
///
/// # Example
/// ```
/// use ledgerun::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert a designer parameter to fixed-point, rounding to nearest.
///
/// Out-of-range and NaN inputs saturate (NaN becomes 0).
#[inline]
pub fn fixed_from_f64(f: f64) -> Fixed {
    (f * FIXED_ONE as f64).round() as Fixed
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in simulation logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Convert fixed-point to f64 (tests, logging, reporting).
#[inline]
pub fn to_f64(f: Fixed) -> f64 {
    f as f64 / FIXED_ONE as f64
}

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then shifts back
/// (arithmetic shift, rounds toward negative infinity).
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root of a fixed-point number.
///
/// Exact floor of the true root (bitwise integer square root on the
/// widened value), so it is identical on every platform.
/// Returns 0 for non-positive inputs.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }
    isqrt_u64((x as u64) << FIXED_SCALE) as Fixed
}

/// Length of the vector `(x, y)` without intermediate overflow.
///
/// The squares are summed in 64 bits, whose root is already in Q16.16.
#[inline]
pub fn fixed_hypot(x: Fixed, y: Fixed) -> Fixed {
    let sq = (x as i64) * (x as i64) + (y as i64) * (y as i64);
    isqrt_u64(sq as u64).min(i32::MAX as u64) as Fixed
}

/// Floor integer square root.
fn isqrt_u64(n: u64) -> u64 {
    let mut rem = n;
    let mut root = 0u64;
    let mut bit = 1u64 << 62;

    while bit > rem {
        bit >>= 2;
    }

    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }

    root
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Sign of a fixed-point number as -1, 0 or 1.
#[inline]
pub fn fixed_sign(x: Fixed) -> i32 {
    x.signum()
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

/// Move `current` toward `target` by at most `max_delta` (never overshoots).
#[inline]
pub fn move_towards(current: Fixed, target: Fixed, max_delta: Fixed) -> Fixed {
    let diff = target.wrapping_sub(current);
    if fixed_abs(diff) <= max_delta {
        target
    } else if diff > 0 {
        current.wrapping_add(max_delta)
    } else {
        current.wrapping_sub(max_delta)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(FIXED_SCALE, 16);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_HALF);
        assert_eq!(to_fixed(2.0), FIXED_ONE * 2);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
    }

    #[test]
    fn test_fixed_from_f64_rounds() {
        // 1/60 = 1092.266... -> 1092
        assert_eq!(fixed_from_f64(1.0 / 60.0), 1092);
        // 0.1 = 6553.6 -> 6554 (truncation would give 6553)
        assert_eq!(fixed_from_f64(0.1), 6554);
        assert_eq!(fixed_from_f64(-0.1), -6554);
        assert_eq!(fixed_from_f64(f64::NAN), 0);
    }

    #[test]
    fn test_fixed_mul() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), to_fixed(0.25));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));
    }

    #[test]
    fn test_fixed_div() {
        assert_eq!(fixed_div(to_fixed(6.0), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(fixed_div(FIXED_ONE, to_fixed(4.0)), to_fixed(0.25));
        // Divide by zero returns 0
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
        // Dividing by one is exact
        assert_eq!(fixed_div(123_457, FIXED_ONE), 123_457);
    }

    #[test]
    fn test_fixed_sqrt() {
        assert_eq!(fixed_sqrt(to_fixed(4.0)), to_fixed(2.0));
        assert_eq!(fixed_sqrt(FIXED_ONE), FIXED_ONE);
        assert_eq!(fixed_sqrt(to_fixed(25.0)), to_fixed(5.0));
        assert_eq!(fixed_sqrt(to_fixed(10_000.0)), to_fixed(100.0));
        assert_eq!(fixed_sqrt(0), 0);
        assert_eq!(fixed_sqrt(-FIXED_ONE), 0);

        // sqrt(2) ~ 1.41421
        let root2 = fixed_sqrt(to_fixed(2.0));
        assert!((to_f64(root2) - 2f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_hypot() {
        assert_eq!(fixed_hypot(to_fixed(3.0), to_fixed(4.0)), to_fixed(5.0));
        assert_eq!(fixed_hypot(to_fixed(-300.0), to_fixed(400.0)), to_fixed(500.0));
        assert_eq!(fixed_hypot(0, 0), 0);
    }

    #[test]
    fn test_move_towards() {
        assert_eq!(move_towards(0, to_fixed(10.0), to_fixed(3.0)), to_fixed(3.0));
        assert_eq!(move_towards(to_fixed(9.0), to_fixed(10.0), to_fixed(3.0)), to_fixed(10.0));
        assert_eq!(move_towards(to_fixed(5.0), 0, to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(move_towards(to_fixed(-1.0), 0, to_fixed(2.0)), 0);
    }

    #[test]
    fn test_fixed_determinism() {
        for _ in 0..1000 {
            let a = 12345678;
            let b = 87654321;
            assert_eq!(fixed_mul(a, b), fixed_mul(a, b));
            assert_eq!(fixed_div(a, b), fixed_div(a, b));
            assert_eq!(fixed_sqrt(a), fixed_sqrt(a));
        }
    }
}
