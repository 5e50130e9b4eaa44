//! Interpolated yield curve built from (tenor, zero rate) pillars.

use super::YieldCurve;
use crate::market_data::error::CurveError;
use num_traits::Float;

/// Yield curve interpolated log-linearly in discount factors.
///
/// Built from (tenor, continuously compounded zero rate) pairs, the
/// tabular shape the market-data provider supplies. Log-linear
/// interpolation in discount factors is linear interpolation of
/// `r(t) * t`, which keeps forward rates piecewise constant between
/// pillars. Queries beyond the last pillar extrapolate flat in the
/// zero rate.
///
/// # Examples
///
/// ```
/// use scengen_core::market_data::curves::{InterpolatedCurve, YieldCurve};
///
/// let curve = InterpolatedCurve::new(
///     vec![(1.0, 0.02), (2.0, 0.025), (5.0, 0.03)],
/// ).unwrap();
/// assert!((curve.zero_rate(2.0_f64).unwrap() - 0.025).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve<T: Float> {
    tenors: Vec<T>,
    // r(t) * t at each pillar; linear interpolation of this quantity
    // is log-linear in discount factors.
    log_dfs: Vec<T>,
}

impl<T: Float> InterpolatedCurve<T> {
    /// Builds a curve from (tenor, zero rate) pillars.
    ///
    /// # Errors
    ///
    /// - [`CurveError::InsufficientData`] with fewer than 2 pillars
    /// - [`CurveError::InvalidPillars`] if tenors are not strictly
    ///   increasing, not positive, or any value is non-finite
    pub fn new(pillars: Vec<(T, T)>) -> Result<Self, CurveError> {
        if pillars.len() < 2 {
            return Err(CurveError::InsufficientData {
                got: pillars.len(),
                need: 2,
            });
        }
        let mut tenors = Vec::with_capacity(pillars.len());
        let mut log_dfs = Vec::with_capacity(pillars.len());
        let mut prev = T::zero();
        for &(t, r) in &pillars {
            if !t.is_finite() || !r.is_finite() {
                return Err(CurveError::InvalidPillars(
                    "non-finite pillar".to_string(),
                ));
            }
            if t <= prev {
                return Err(CurveError::InvalidPillars(
                    "tenors must be positive and strictly increasing".to_string(),
                ));
            }
            prev = t;
            tenors.push(t);
            log_dfs.push(r * t);
        }
        Ok(Self { tenors, log_dfs })
    }

    /// Number of pillars.
    #[inline]
    pub fn len(&self) -> usize {
        self.tenors.len()
    }

    /// Always false by construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tenors.is_empty()
    }

    /// Interpolated `r(t) * t`.
    fn log_df(&self, t: T) -> T {
        let n = self.tenors.len();
        if t <= self.tenors[0] {
            // Anchor the short end at D(0) = 1.
            return self.log_dfs[0] * (t / self.tenors[0]);
        }
        if t >= self.tenors[n - 1] {
            // Flat zero-rate extrapolation.
            let r_last = self.log_dfs[n - 1] / self.tenors[n - 1];
            return r_last * t;
        }
        let mut i = 0;
        while self.tenors[i + 1] < t {
            i += 1;
        }
        let w = (t - self.tenors[i]) / (self.tenors[i + 1] - self.tenors[i]);
        self.log_dfs[i] + w * (self.log_dfs[i + 1] - self.log_dfs[i])
    }
}

impl<T: Float> YieldCurve<T> for InterpolatedCurve<T> {
    fn discount_factor(&self, t: T) -> Result<T, CurveError> {
        if t < T::zero() {
            return Err(CurveError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        if t == T::zero() {
            return Ok(T::one());
        }
        Ok((-self.log_df(t)).exp())
    }
}
