//! American Monte Carlo regression: bases and least-squares fits.

mod basis;
mod regression;

pub use basis::RegressionBasis;
pub use regression::{fit_regression, RegressionFn};
