//! Numerical helpers: correlation validation, Cholesky factors and
//! the inverse normal CDF.

pub mod linalg;
pub mod normal;

pub use linalg::{cholesky_factor, correlation_from_rows, validate_correlation};
pub use normal::inverse_normal_cdf;
