//! Flat yield curve.

use super::YieldCurve;
use crate::market_data::error::CurveError;
use num_traits::Float;

/// Yield curve with a single constant continuously compounded rate.
///
/// Useful for tests and flat-term-structure scenarios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve<T: Float> {
    rate: T,
}

impl<T: Float> FlatCurve<T> {
    /// Constructs a flat curve with the given constant rate.
    #[inline]
    pub fn new(rate: T) -> Self {
        Self { rate }
    }

    /// The constant rate.
    #[inline]
    pub fn rate(&self) -> T {
        self.rate
    }
}

impl<T: Float> YieldCurve<T> for FlatCurve<T> {
    fn discount_factor(&self, t: T) -> Result<T, CurveError> {
        if t < T::zero() {
            return Err(CurveError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok((-self.rate * t).exp())
    }

    fn zero_rate(&self, t: T) -> Result<T, CurveError> {
        if t <= T::zero() {
            return Err(CurveError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn discount_factor_at_zero_is_one() {
        let curve = FlatCurve::new(0.03_f64);
        assert_relative_eq!(curve.discount_factor(0.0).unwrap(), 1.0);
    }

    #[test]
    fn discount_factor_matches_exp() {
        let curve = FlatCurve::new(0.05_f64);
        assert_relative_eq!(
            curve.discount_factor(2.0).unwrap(),
            (-0.1_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_rate_is_constant() {
        let curve = FlatCurve::new(0.05_f64);
        assert_relative_eq!(curve.zero_rate(1.0).unwrap(), 0.05);
        assert_relative_eq!(curve.zero_rate(10.0).unwrap(), 0.05);
    }

    #[test]
    fn negative_maturity_rejected() {
        let curve = FlatCurve::new(0.05_f64);
        assert!(curve.discount_factor(-1.0).is_err());
    }
}
