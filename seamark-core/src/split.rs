/*!
# Double-Float Coordinate Encoding

Shaders run in single precision, but projected world coordinates (web
mercator meters, magnitudes around 2e7) need more than the ~7 decimal digits
an `f32` carries. Splitting a coordinate into a high and a low word lets the
vertex stage compute `position - eye_high - eye_low` and recover
near-double precision relative to the camera.

Used for the camera/eye position only, never for generic attribute data.
*/

use crate::error::{CoreError, CoreResult};

/// Decimal digits kept in each word. Tuned for projected-meter magnitudes
/// (~1e7); coordinate ranges far outside that may want a different cut.
pub const SIGNIFICANT_DIGITS: usize = 6;

/// High + low single-precision words whose sum approximates the original
/// double-precision value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitFloat {
    pub high: f32,
    pub low: f32,
}

/// Split a finite `f64` into high and low `f32` words.
///
/// The magnitude is written in scientific notation, the first
/// [`SIGNIFICANT_DIGITS`] significant digits become the high word at the
/// original exponent, the next [`SIGNIFICANT_DIGITS`] become the low word at
/// an exponent shifted down by [`SIGNIFICANT_DIGITS`], and the sign is
/// reapplied to both. Non-finite input is a domain error.
pub fn split(value: f64) -> CoreResult<SplitFloat> {
    if !value.is_finite() {
        return Err(CoreError::non_finite(value));
    }
    if value == 0.0 {
        return Ok(SplitFloat { high: 0.0, low: 0.0 });
    }

    let sign = if value < 0.0 { -1.0f64 } else { 1.0f64 };
    let sci = format!("{:.*e}", 2 * SIGNIFICANT_DIGITS - 1, value.abs());
    // Finite nonzero floats always format as `<mantissa>e<exponent>`.
    let (mantissa, exp_str) = sci
        .split_once('e')
        .ok_or_else(|| CoreError::non_finite(value))?;
    let exponent: i32 = exp_str
        .parse()
        .map_err(|_| CoreError::non_finite(value))?;

    let digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
    let high = sign * compose(&digits[..SIGNIFICANT_DIGITS], exponent);
    let low = sign
        * compose(
            &digits[SIGNIFICANT_DIGITS..2 * SIGNIFICANT_DIGITS],
            exponent - SIGNIFICANT_DIGITS as i32,
        );

    Ok(SplitFloat {
        high: high as f32,
        low: low as f32,
    })
}

/// Reassemble `d.ddddd * 10^exponent` from raw significant digits.
fn compose(digits: &[u8], exponent: i32) -> f64 {
    let mut s = String::with_capacity(digits.len() + 8);
    s.push(digits[0] as char);
    s.push('.');
    for &d in &digits[1..] {
        s.push(d as char);
    }
    s.push('e');
    s.push_str(&exponent.to_string());
    s.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_zero() {
        assert_eq!(split(0.0).unwrap(), SplitFloat { high: 0.0, low: 0.0 });
    }

    #[test]
    fn test_split_earth_radius_is_exact() {
        // 6378137 m, the WGS84 semi-major axis
        let s = split(6378137.0).unwrap();
        assert_eq!(s.high, 6378130.0);
        assert_eq!(s.low, 7.0);
        assert_eq!(s.high as f64 + s.low as f64, 6378137.0);
    }

    #[test]
    fn test_split_beats_naive_f32_at_mercator_edge() {
        // Maximum web-mercator X; f32 alone is off by ~0.34 m here.
        let v = 20037508.342789244;
        let s = split(v).unwrap();
        let split_err = (s.high as f64 + s.low as f64 - v).abs();
        let naive_err = (v as f32 as f64 - v).abs();
        assert!(naive_err > 0.0);
        assert!(
            split_err < naive_err,
            "split error {split_err} not below naive f32 error {naive_err}"
        );
        // High word alone stays within f32 rounding of the 6-digit truncation.
        assert_eq!(s.high, 20037500.0);
    }

    #[test]
    fn test_split_reapplies_sign() {
        let pos = split(20037508.342789244).unwrap();
        let neg = split(-20037508.342789244).unwrap();
        assert_eq!(neg.high, -pos.high);
        assert_eq!(neg.low, -pos.low);
    }

    #[test]
    fn test_split_small_magnitudes() {
        let s = split(0.5).unwrap();
        assert_eq!(s.high, 0.5);
        assert_eq!(s.low, 0.0);

        let s = split(1.0e-9).unwrap();
        assert_eq!(s.high, 1.0e-9);
        assert_eq!(s.low, 0.0);
    }

    #[test]
    fn test_split_is_stable() {
        let v = 12345.6789012345;
        assert_eq!(split(v).unwrap(), split(v).unwrap());
    }

    #[test]
    fn test_split_rejects_non_finite() {
        assert!(split(f64::NAN).is_err());
        assert!(split(f64::INFINITY).is_err());
        assert!(split(f64::NEG_INFINITY).is_err());
    }
}
