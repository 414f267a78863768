//! Float guards and snapshot rounding.

use crate::PfError;

pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, PfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PfError::NonFinite { what, value: v })
    }
}

/// Round to a fixed number of decimals for snapshot comparison.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    if !v.is_finite() {
        return v;
    }
    let scale = 10f64.powi(decimals);
    let r = (v * scale).round() / scale;
    // normalise -0.0 so snapshots compare equal
    if r == 0.0 { 0.0 } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(f64::NAN, "test").unwrap_err();
        assert!(err.to_string().contains("Non-finite"));
        assert_eq!(ensure_finite(2.5, "test").unwrap(), 2.5);
    }

    #[test]
    fn round_to_nine_places() {
        assert_eq!(round_to(1.234_567_890_4, 9), 1.234_567_89);
        assert_eq!(round_to(-1e-12, 9), 0.0);
        assert!(round_to(-1e-12, 9).is_sign_positive());
        assert!(round_to(f64::INFINITY, 9).is_infinite());
    }
}
