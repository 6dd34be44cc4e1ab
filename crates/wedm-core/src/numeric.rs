use crate::CoreError;

pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Require a finite, strictly positive value.
pub fn ensure_positive(v: f64, what: &'static str) -> Result<f64, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

/// Require a finite value that is not negative.
pub fn ensure_non_negative(v: f64, what: &'static str) -> Result<f64, CoreError> {
    let v = ensure_finite(v, what)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

/// Fixed-precision quantizer for floating point cache keys.
///
/// Values are mapped to the nearest multiple of `resolution` and returned as an
/// integer bin index, so that repeated lookups of physically identical values
/// hit the same slot regardless of rounding noise in the last bits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    inv_resolution: f64,
}

impl Quantizer {
    pub fn new(resolution: f64) -> Result<Self, CoreError> {
        let resolution = ensure_positive(resolution, "quantizer resolution must be positive")?;
        Ok(Self {
            inv_resolution: 1.0 / resolution,
        })
    }

    /// Bin index of `v` (round half away from zero).
    #[inline]
    pub fn bin(&self, v: f64) -> i64 {
        (v * self.inv_resolution).round() as i64
    }

    /// Representative value of a bin (exact for decimal resolutions like 0.1).
    #[inline]
    pub fn value(&self, bin: i64) -> f64 {
        bin as f64 / self.inv_resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(f64::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(0.0, "zero").is_err());
        assert!(ensure_positive(-1.0, "negative").is_err());
        assert_eq!(ensure_positive(2.5, "ok").unwrap(), 2.5);
        assert!(ensure_non_negative(0.0, "zero").is_ok());
    }

    #[test]
    fn quantizer_snaps_to_grid() {
        let q = Quantizer::new(0.1).unwrap();
        assert_eq!(q.bin(15.04), 150);
        assert_eq!(q.bin(15.06), 151);
        assert_eq!(q.bin(0.1 + 0.2), 3);
        assert_eq!(q.value(q.bin(7.349)), 7.3);
        assert!(Quantizer::new(0.0).is_err());
    }
}
