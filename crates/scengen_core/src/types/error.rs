//! Error taxonomy for the scenario engine.
//!
//! Three unrecoverable error kinds propagate out of the engine:
//!
//! - [`ConfigurationError`] - invalid or missing model/context
//!   parameters, detected at build time wherever possible
//! - [`NumericalError`] - non-finite results, singular regression
//!   bases, or invalid variances detected during fit/simulate
//! - [`DimensionError`] - array-length and grid/path inconsistencies
//!   across cube operations
//!
//! The engine performs no retries and no silent degradation; all
//! three kinds abort the computation and surface to the caller.

use thiserror::Error;

/// Invalid or missing configuration, detected once at build time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A required parameter key was absent.
    #[error("missing parameter: {key}")]
    MissingParameter {
        /// Name of the absent parameter.
        key: String,
    },

    /// A parameter value is outside its valid domain.
    #[error("parameter out of domain: {key} = {value} ({constraint})")]
    OutOfDomain {
        /// Name of the offending parameter.
        key: String,
        /// The rejected value.
        value: f64,
        /// Human-readable domain constraint, e.g. "must be >= 0".
        constraint: String,
    },

    /// Correlation matrix failed validation (shape, symmetry, range
    /// or positive semi-definiteness).
    #[error("invalid correlation matrix: {0}")]
    InvalidCorrelation(String),

    /// Simulation time grid is degenerate or non-monotonic.
    #[error("invalid time grid: {0}")]
    InvalidTimeGrid(String),

    /// A symbolic curve/index key could not be resolved.
    #[error("unresolvable market key: {0}")]
    UnresolvableKey(String),

    /// Leg or instrument definition is internally inconsistent.
    #[error("invalid instrument definition: {0}")]
    InvalidInstrument(String),

    /// Unknown ISO currency code.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Numerical failure during simulation or regression fitting.
///
/// These abort the run; the engine never substitutes a fallback
/// value for a non-finite intermediate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericalError {
    /// A non-finite value appeared where a finite one is required.
    #[error("non-finite value in {context}")]
    NonFinite {
        /// Description of where the value appeared.
        context: String,
    },

    /// Regression design matrix is singular or rank-deficient.
    #[error("singular regression basis ({rows} observations, {cols} basis functions)")]
    SingularBasis {
        /// Number of observations.
        rows: usize,
        /// Number of basis functions.
        cols: usize,
    },

    /// A variance or covariance came out negative.
    #[error("negative variance: {value}")]
    NegativeVariance {
        /// The offending value.
        value: f64,
    },

    /// Cholesky factorisation failed on a matrix expected to be PSD.
    #[error("matrix not positive semi-definite: {0}")]
    NotPositiveSemiDefinite(String),
}

/// Array-length or grid/path-count mismatch across cube operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    /// Two parallel arrays disagree in length.
    #[error("length mismatch in {what}: got {got}, expected {expected}")]
    LengthMismatch {
        /// What is being compared.
        what: String,
        /// Observed length.
        got: usize,
        /// Required length.
        expected: usize,
    },

    /// An index is outside its valid range.
    #[error("index out of range in {what}: {index} >= {len}")]
    IndexOutOfRange {
        /// What is being indexed.
        what: String,
        /// The offending index.
        index: usize,
        /// Length of the indexed dimension.
        len: usize,
    },
}

/// Umbrella error for engine entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Configuration failure (build time).
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Numerical failure (fit/simulate time).
    #[error(transparent)]
    Numerical(#[from] NumericalError),

    /// Dimension mismatch.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// Curve lookup failure.
    #[error(transparent)]
    Curve(#[from] crate::market_data::CurveError),
}
