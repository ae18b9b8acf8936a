//! Fixed-point helpers for 16-bit PCM processing.
//!
//! Gains are expressed in Q14 (`Q14_ONE` = 1.0). All helpers are bit-exact:
//! downstream gain and energy comparisons depend on the exact rounding done here.

/// 1.0 in Q14.
pub const Q14_ONE: i32 = 1 << Q14_SHIFT;
/// 0.5 in Q14, added before the 14-bit shift for round-half-up.
pub const Q14_HALF: i32 = 1 << (Q14_SHIFT - 1);
pub const Q14_SHIFT: u32 = 14;

/// Number of left shifts needed to normalize `value` into the 32-bit range.
///
/// Returns 0 for 0. Negative values are normalized as their one's complement.
pub fn norm_w32(value: i32) -> i32 {
    if value == 0 {
        return 0;
    }
    let magnitude = if value < 0 { !value } else { value };
    magnitude.leading_zeros() as i32 - 1
}

/// Largest absolute value in `samples`, capped at `i16::MAX`.
pub fn max_abs_value_w16(samples: &[i16]) -> i16 {
    let max = samples
        .iter()
        .map(|&s| i32::from(s).abs())
        .max()
        .unwrap_or(0);
    max.min(i32::from(i16::MAX)) as i16
}

/// Sum of `(a[i] * b[i]) >> scaling` over the first `length` samples.
///
/// Accumulates in 64 bits and saturates to the 32-bit range.
pub fn dot_product_with_scale(a: &[i16], b: &[i16], length: usize, scaling: u32) -> i32 {
    debug_assert!(a.len() >= length && b.len() >= length);
    let sum: i64 = a
        .iter()
        .zip(b)
        .take(length)
        .map(|(&x, &y)| i64::from((i32::from(x) * i32::from(y)) >> scaling))
        .sum();
    sum.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// 32-by-16 bit division, truncating. Division by zero yields `i32::MAX`.
pub fn div_w32_w16(numerator: i32, denominator: i16) -> i32 {
    if denominator == 0 {
        return i32::MAX;
    }
    numerator / i32::from(denominator)
}

/// Integer square root, rounded down. Negative input yields 0.
pub fn sqrt_floor(value: i32) -> i32 {
    if value <= 0 {
        return 0;
    }
    (value as u32).isqrt() as i32
}

/// Shifts left for positive `shift`, arithmetic right for negative `shift`.
pub fn shift_w32(value: i32, shift: i32) -> i32 {
    if shift >= 0 {
        value.wrapping_shl(shift as u32)
    } else {
        value >> (-shift).min(31)
    }
}

/// Scales `sample` by a Q14 gain with round-half-up, saturating to 16 bits.
pub fn apply_q14_gain(sample: i16, gain_q14: i16) -> i16 {
    let scaled = (i32::from(sample) * i32::from(gain_q14) + Q14_HALF) >> Q14_SHIFT;
    scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Blends `incoming` over `outgoing` with weight `weight_q14` on `incoming`.
pub fn cross_fade_q14(incoming: i16, outgoing: i16, weight_q14: i16) -> i16 {
    let weight = i32::from(weight_q14);
    let mixed = (weight * i32::from(incoming)
        + (Q14_ONE - weight) * i32::from(outgoing)
        + Q14_HALF)
        >> Q14_SHIFT;
    mixed.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_w32() {
        assert_eq!(norm_w32(0), 0);
        assert_eq!(norm_w32(1), 30);
        assert_eq!(norm_w32(2), 29);
        assert_eq!(norm_w32(6), 28);
        assert_eq!(norm_w32(-1), 31);
        assert_eq!(norm_w32(i32::MAX), 0);
        assert_eq!(norm_w32(i32::MIN), 0);
        assert_eq!(norm_w32(1 << 14), 16);
    }

    #[test]
    fn test_max_abs_value_caps_at_i16_max() {
        assert_eq!(max_abs_value_w16(&[]), 0);
        assert_eq!(max_abs_value_w16(&[3, -7, 5]), 7);
        assert_eq!(max_abs_value_w16(&[i16::MIN, 0]), i16::MAX);
    }

    #[test]
    fn test_dot_product_with_scale() {
        let a = [1000i16; 4];
        assert_eq!(dot_product_with_scale(&a, &a, 4, 0), 4_000_000);
        assert_eq!(dot_product_with_scale(&a, &a, 4, 2), 1_000_000);
        assert_eq!(dot_product_with_scale(&a, &a, 2, 0), 2_000_000);

        // Each product is shifted before summing, so odd products lose their low bit.
        assert_eq!(dot_product_with_scale(&[3, 3], &[1, 1], 2, 1), 2);
        assert_eq!(dot_product_with_scale(&[-3, -3], &[1, 1], 2, 1), -4);

        let loud = [i16::MAX; 8];
        assert_eq!(dot_product_with_scale(&loud, &loud, 8, 0), i32::MAX);
    }

    #[test]
    fn test_div_and_sqrt() {
        assert_eq!(div_w32_w16(100, 7), 14);
        assert_eq!(div_w32_w16(-100, 7), -14);
        assert_eq!(div_w32_w16(100, 0), i32::MAX);

        assert_eq!(sqrt_floor(0), 0);
        assert_eq!(sqrt_floor(-4), 0);
        assert_eq!(sqrt_floor(15), 3);
        assert_eq!(sqrt_floor(16), 4);
        assert_eq!(sqrt_floor(1 << 28), 1 << 14);
    }

    #[test]
    fn test_shift_w32() {
        assert_eq!(shift_w32(3, 2), 12);
        assert_eq!(shift_w32(12, -2), 3);
        assert_eq!(shift_w32(-12, -2), -3);
        assert_eq!(shift_w32(5, 0), 5);
    }

    #[test]
    fn test_apply_q14_gain_rounds_half_up() {
        assert_eq!(apply_q14_gain(1000, Q14_ONE as i16), 1000);
        assert_eq!(apply_q14_gain(1000, 8192), 500);
        assert_eq!(apply_q14_gain(1, 8192), 1);
        assert_eq!(apply_q14_gain(-1, 8192), 0);
        assert_eq!(apply_q14_gain(i16::MIN, Q14_ONE as i16), i16::MIN);
        assert_eq!(apply_q14_gain(1234, 0), 0);
    }

    #[test]
    fn test_cross_fade_endpoints() {
        assert_eq!(cross_fade_q14(1000, -1000, 0), -1000);
        assert_eq!(cross_fade_q14(1000, -1000, Q14_ONE as i16), 1000);
        assert_eq!(cross_fade_q14(1000, 0, 8192), 500);
    }
}
