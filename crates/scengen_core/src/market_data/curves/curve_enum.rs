//! Static-dispatch curve enumeration.

use super::{FlatCurve, InterpolatedCurve, YieldCurve};
use crate::market_data::error::CurveError;

/// Static dispatch wrapper over the concrete curve implementations.
///
/// Model and context structs hold curves by value through this enum,
/// avoiding trait objects in the hot valuation path.
///
/// # Example
///
/// ```
/// use scengen_core::market_data::curves::{Curve, FlatCurve, YieldCurve};
///
/// let curve = Curve::Flat(FlatCurve::new(0.02));
/// assert!((curve.zero_rate(3.0).unwrap() - 0.02).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Constant-rate curve.
    Flat(FlatCurve<f64>),
    /// Pillar-interpolated curve.
    Interpolated(InterpolatedCurve<f64>),
}

impl Curve {
    /// Convenience constructor for a flat curve.
    #[inline]
    pub fn flat(rate: f64) -> Self {
        Curve::Flat(FlatCurve::new(rate))
    }

    /// Convenience constructor for an interpolated curve.
    pub fn from_pillars(pillars: Vec<(f64, f64)>) -> Result<Self, CurveError> {
        Ok(Curve::Interpolated(InterpolatedCurve::new(pillars)?))
    }

    /// Instantaneous forward rate `f(0, t)` by central finite
    /// difference of `ln D`, with a one-sided stencil at `t = 0`.
    pub fn instantaneous_forward(&self, t: f64) -> Result<f64, CurveError> {
        const H: f64 = 1e-5;
        if t < H {
            return self.forward_rate(t, t + H);
        }
        self.forward_rate(t - H, t + H)
    }
}

impl YieldCurve<f64> for Curve {
    fn discount_factor(&self, t: f64) -> Result<f64, CurveError> {
        match self {
            Curve::Flat(c) => c.discount_factor(t),
            Curve::Interpolated(c) => c.discount_factor(t),
        }
    }

    fn zero_rate(&self, t: f64) -> Result<f64, CurveError> {
        match self {
            Curve::Flat(c) => c.zero_rate(t),
            Curve::Interpolated(c) => c.zero_rate(t),
        }
    }
}
