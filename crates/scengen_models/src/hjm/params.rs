//! Gaussian HJM model parameters and validation.
//!
//! Parameters arrive from the configuration layer as named, typed
//! fields and are validated exactly once, when the model is built.
//! Every malformed input is a [`ConfigurationError`] raised before
//! any simulation work starts.

use scengen_core::market_data::curves::Curve;
use scengen_core::types::error::ConfigurationError;

/// One HJM factor: mean reversion plus a piecewise-constant
/// volatility term structure.
///
/// The volatility is `vols[k]` on `[vol_times[k-1], vol_times[k])`
/// (with `vol_times[-1] = 0`) and flat beyond the last breakpoint.
///
/// # Examples
///
/// ```
/// use scengen_models::HjmFactor;
///
/// let factor = HjmFactor::new(0.03, vec![1.0, 5.0], vec![0.008, 0.010, 0.012]).unwrap();
/// assert_eq!(factor.vol(0.5), 0.008);
/// assert_eq!(factor.vol(2.0), 0.010);
/// assert_eq!(factor.vol(10.0), 0.012);
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HjmFactor {
    mean_reversion: f64,
    vol_times: Vec<f64>,
    vols: Vec<f64>,
}

impl HjmFactor {
    /// Creates a factor with validation.
    ///
    /// # Arguments
    ///
    /// * `mean_reversion` - mean reversion speed, must be `>= 0` and finite
    /// * `vol_times` - breakpoints of the volatility term structure,
    ///   strictly increasing and positive; may be empty for a flat vol
    /// * `vols` - one volatility per segment, `vol_times.len() + 1`
    ///   entries, all finite and `> 0`
    pub fn new(
        mean_reversion: f64,
        vol_times: Vec<f64>,
        vols: Vec<f64>,
    ) -> Result<Self, ConfigurationError> {
        if !mean_reversion.is_finite() || mean_reversion < 0.0 {
            return Err(ConfigurationError::OutOfDomain {
                key: "mean_reversion".to_string(),
                value: mean_reversion,
                constraint: "must be finite and >= 0".to_string(),
            });
        }
        if vols.len() != vol_times.len() + 1 {
            return Err(ConfigurationError::InvalidInstrument(format!(
                "volatility term structure needs {} values for {} breakpoints, got {}",
                vol_times.len() + 1,
                vol_times.len(),
                vols.len()
            )));
        }
        let mut prev = 0.0;
        for &t in &vol_times {
            if !t.is_finite() || t <= prev {
                return Err(ConfigurationError::OutOfDomain {
                    key: "vol_times".to_string(),
                    value: t,
                    constraint: "must be positive and strictly increasing".to_string(),
                });
            }
            prev = t;
        }
        for &v in &vols {
            if !v.is_finite() || v <= 0.0 {
                return Err(ConfigurationError::OutOfDomain {
                    key: "volatility".to_string(),
                    value: v,
                    constraint: "must be finite and > 0".to_string(),
                });
            }
        }
        Ok(Self {
            mean_reversion,
            vol_times,
            vols,
        })
    }

    /// Factor with a single constant volatility.
    pub fn constant(mean_reversion: f64, vol: f64) -> Result<Self, ConfigurationError> {
        Self::new(mean_reversion, Vec::new(), vec![vol])
    }

    /// Mean reversion speed.
    #[inline]
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Volatility applying at time `t`.
    pub fn vol(&self, t: f64) -> f64 {
        let mut idx = 0;
        for &bt in &self.vol_times {
            if t < bt {
                break;
            }
            idx += 1;
        }
        self.vols[idx]
    }
}

/// Complete Gaussian HJM model specification.
///
/// Immutable once validated: factor dynamics, benchmark tenors used
/// by regression observables, the factor correlation matrix, and
/// the initial term structure.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GaussianHjmParams {
    /// Factor specifications.
    pub factors: Vec<HjmFactor>,
    /// Benchmark rate tenors in years (metadata for observables).
    pub benchmark_tenors: Vec<f64>,
    /// Factor correlation matrix, row-major.
    pub correlation: Vec<Vec<f64>>,
    /// Initial yield curve (serialisation skips it; rebuilt by the
    /// configuration layer).
    #[serde(skip, default = "default_curve")]
    pub initial_curve: Curve,
}

fn default_curve() -> Curve {
    Curve::flat(0.0)
}

impl GaussianHjmParams {
    /// Validates the full specification.
    ///
    /// Called by `GaussianHjmModel::new`; exposed so the
    /// configuration layer can fail fast before wiring anything else.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.factors.is_empty() {
            return Err(ConfigurationError::MissingParameter {
                key: "factors".to_string(),
            });
        }
        if self.correlation.len() != self.factors.len() {
            return Err(ConfigurationError::InvalidCorrelation(format!(
                "correlation is {}x? but model has {} factors",
                self.correlation.len(),
                self.factors.len()
            )));
        }
        for &tenor in &self.benchmark_tenors {
            if !tenor.is_finite() || tenor <= 0.0 {
                return Err(ConfigurationError::OutOfDomain {
                    key: "benchmark_tenors".to_string(),
                    value: tenor,
                    constraint: "must be finite and > 0".to_string(),
                });
            }
        }
        let matrix = scengen_core::math::correlation_from_rows(&self.correlation)?;
        scengen_core::math::validate_correlation(&matrix)
    }
}
