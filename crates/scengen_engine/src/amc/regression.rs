//! Least-squares continuation-value fitting.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use scengen_core::types::error::{DimensionError, EngineError, NumericalError};

use super::basis::RegressionBasis;

/// Relative singular-value cutoff for the least-squares solve.
const SVD_EPS: f64 = 1e-10;

/// A fitted continuation-value function.
///
/// Produced once by [`fit_regression`] and read-only thereafter;
/// evaluation never fails and never mutates.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RegressionFn {
    basis: RegressionBasis,
    n_vars: usize,
    coefficients: Vec<f64>,
}

impl RegressionFn {
    /// Number of regression variables the fit expects.
    #[inline]
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Estimated continuation value at the given regression
    /// variables.
    ///
    /// # Panics
    ///
    /// Panics if `vars.len() != self.n_vars()`; callers produce the
    /// variables from the same regressor specification used to fit.
    pub fn evaluate(&self, vars: &[f64]) -> f64 {
        assert_eq!(vars.len(), self.n_vars, "regression variable count");
        let mut phi = vec![0.0; self.coefficients.len()];
        self.basis.evaluate_into(vars, &mut phi);
        phi.iter()
            .zip(&self.coefficients)
            .map(|(p, c)| p * c)
            .sum()
    }
}

/// Fits a least-squares regression of `ys` on the basis functions of
/// `xs` (one row of regression variables per observation).
///
/// The solve goes through an SVD with a relative singular-value
/// cutoff; a rank-deficient design matrix aborts the fit rather than
/// silently returning an under-determined projection.
///
/// # Errors
///
/// - [`DimensionError`] for empty or inconsistently-shaped input
/// - [`NumericalError::NonFinite`] if any observation is non-finite
/// - [`NumericalError::SingularBasis`] if there are fewer
///   observations than basis functions or the design matrix is
///   rank-deficient
pub fn fit_regression(
    xs: &[Vec<f64>],
    ys: &[f64],
    basis: &RegressionBasis,
) -> Result<RegressionFn, EngineError> {
    basis.validate()?;
    if xs.is_empty() {
        return Err(DimensionError::LengthMismatch {
            what: "regression observations".to_string(),
            got: 0,
            expected: 1,
        }
        .into());
    }
    if xs.len() != ys.len() {
        return Err(DimensionError::LengthMismatch {
            what: "regression targets".to_string(),
            got: ys.len(),
            expected: xs.len(),
        }
        .into());
    }
    let n_vars = xs[0].len();
    if n_vars == 0 || xs.iter().any(|row| row.len() != n_vars) {
        return Err(DimensionError::LengthMismatch {
            what: "regression variables".to_string(),
            got: xs.iter().map(|r| r.len()).find(|&l| l != n_vars).unwrap_or(0),
            expected: n_vars.max(1),
        }
        .into());
    }
    if xs.iter().flatten().any(|v| !v.is_finite()) || ys.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::NonFinite {
            context: "regression observations".to_string(),
        }
        .into());
    }

    let n_obs = xs.len();
    let n_funcs = basis.n_functions(n_vars);
    if n_obs < n_funcs {
        return Err(NumericalError::SingularBasis {
            rows: n_obs,
            cols: n_funcs,
        }
        .into());
    }

    let mut design = DMatrix::zeros(n_obs, n_funcs);
    let mut phi = vec![0.0; n_funcs];
    for (i, row) in xs.iter().enumerate() {
        basis.evaluate_into(row, &mut phi);
        for (j, &value) in phi.iter().enumerate() {
            design[(i, j)] = value;
        }
    }
    let targets = DVector::from_column_slice(ys);

    let svd = design.svd(true, true);
    let max_sv = svd.singular_values.max();
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&sv| sv > SVD_EPS * max_sv)
        .count();
    if rank < n_funcs {
        return Err(NumericalError::SingularBasis {
            rows: n_obs,
            cols: n_funcs,
        }
        .into());
    }
    let solution = svd
        .solve(&targets, SVD_EPS * max_sv)
        .map_err(|_| NumericalError::SingularBasis {
            rows: n_obs,
            cols: n_funcs,
        })?;
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(NumericalError::NonFinite {
            context: "regression coefficients".to_string(),
        }
        .into());
    }

    debug!(n_obs, n_funcs, "fitted continuation-value regression");
    Ok(RegressionFn {
        basis: basis.clone(),
        n_vars,
        coefficients: solution.iter().copied().collect(),
    })
}
