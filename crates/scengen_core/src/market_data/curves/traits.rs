//! Yield curve trait definition.

use crate::market_data::error::CurveError;
use num_traits::Float;

/// Generic yield curve for discount factor and rate calculations.
///
/// Implementations are generic over `T: Float` so the same curve
/// code serves `f64` and `f32` callers.
///
/// # Invariants
///
/// - `D(0) = 1`
/// - `D(t) > 0` for all `t >= 0`
/// - rates are continuously compounded: `D(t) = exp(-r(t) * t)`
///
/// # Example
///
/// ```
/// use scengen_core::market_data::curves::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.05_f64);
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - 0.951229).abs() < 1e-5);
/// assert!((curve.forward_rate(1.0, 2.0).unwrap() - 0.05).abs() < 1e-10);
/// ```
pub trait YieldCurve<T: Float> {
    /// Discount factor `D(t)` for maturity `t` in years.
    ///
    /// # Errors
    ///
    /// [`CurveError::InvalidMaturity`] if `t < 0`.
    fn discount_factor(&self, t: T) -> Result<T, CurveError>;

    /// Continuously compounded zero rate `r(t) = -ln(D(t)) / t`.
    ///
    /// # Errors
    ///
    /// [`CurveError::InvalidMaturity`] if `t <= 0`.
    fn zero_rate(&self, t: T) -> Result<T, CurveError> {
        if t <= T::zero() {
            return Err(CurveError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        let df = self.discount_factor(t)?;
        Ok(-df.ln() / t)
    }

    /// Forward rate between `t1` and `t2`:
    /// `f(t1, t2) = -ln(D(t2) / D(t1)) / (t2 - t1)`.
    ///
    /// # Errors
    ///
    /// [`CurveError::InvalidMaturity`] if `t2 <= t1`.
    fn forward_rate(&self, t1: T, t2: T) -> Result<T, CurveError> {
        let dt = t2 - t1;
        if dt <= T::zero() {
            return Err(CurveError::InvalidMaturity {
                t: dt.to_f64().unwrap_or(0.0),
            });
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok(-(df2 / df1).ln() / dt)
    }
}
