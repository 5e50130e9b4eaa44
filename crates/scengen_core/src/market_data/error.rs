//! Curve lookup error types.

use thiserror::Error;

/// Yield-curve operation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Negative time to maturity.
    #[error("invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value.
        t: f64,
    },

    /// Not enough pillars to build an interpolated curve.
    #[error("insufficient curve data: got {got}, need {need}")]
    InsufficientData {
        /// Number of pillars provided.
        got: usize,
        /// Minimum required.
        need: usize,
    },

    /// Pillars are not strictly increasing or not finite.
    #[error("invalid curve pillars: {0}")]
    InvalidPillars(String),
}
