//! Correlation matrix validation and Cholesky factorisation.
//!
//! Correlation validity is checked once, at model-construction time,
//! so that malformed inputs are rejected before any path generation
//! begins. The Cholesky factor is computed once per simulation and
//! reused for every step.

use nalgebra::DMatrix;

use crate::types::error::{ConfigurationError, NumericalError};

/// Symmetry and unit-diagonal tolerance.
const SYM_EPS: f64 = 1e-10;

/// Smallest admissible eigenvalue for the PSD check.
const PSD_EPS: f64 = -1e-10;

/// Converts a row-major nested correlation table into a `DMatrix`.
///
/// # Errors
///
/// [`ConfigurationError::InvalidCorrelation`] if rows are ragged or
/// the matrix is not square.
pub fn correlation_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ConfigurationError> {
    let n = rows.len();
    if n == 0 {
        return Err(ConfigurationError::InvalidCorrelation(
            "empty matrix".to_string(),
        ));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n {
            return Err(ConfigurationError::InvalidCorrelation(format!(
                "row {} has length {}, expected {}",
                i,
                row.len(),
                n
            )));
        }
    }
    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

/// Validates a correlation matrix: symmetric, unit diagonal, entries
/// in `[-1, 1]`, and positive semi-definite.
///
/// # Errors
///
/// [`ConfigurationError::InvalidCorrelation`] describing the first
/// violated property.
pub fn validate_correlation(matrix: &DMatrix<f64>) -> Result<(), ConfigurationError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(ConfigurationError::InvalidCorrelation(format!(
            "not square: {}x{}",
            n,
            matrix.ncols()
        )));
    }
    for i in 0..n {
        if (matrix[(i, i)] - 1.0).abs() > SYM_EPS {
            return Err(ConfigurationError::InvalidCorrelation(format!(
                "diagonal entry ({i},{i}) = {}, expected 1",
                matrix[(i, i)]
            )));
        }
        for j in 0..n {
            let v = matrix[(i, j)];
            if !v.is_finite() {
                return Err(ConfigurationError::InvalidCorrelation(format!(
                    "non-finite entry at ({i},{j})"
                )));
            }
            if !(-1.0 - SYM_EPS..=1.0 + SYM_EPS).contains(&v) {
                return Err(ConfigurationError::InvalidCorrelation(format!(
                    "entry ({i},{j}) = {v} outside [-1, 1]"
                )));
            }
            if (v - matrix[(j, i)]).abs() > SYM_EPS {
                return Err(ConfigurationError::InvalidCorrelation(format!(
                    "asymmetric at ({i},{j})"
                )));
            }
        }
    }

    let min_eig = matrix
        .clone()
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .fold(f64::INFINITY, |acc, &e| acc.min(e));
    if min_eig < PSD_EPS {
        return Err(ConfigurationError::InvalidCorrelation(format!(
            "not positive semi-definite (min eigenvalue {min_eig:.3e})"
        )));
    }
    Ok(())
}

/// Lower-triangular Cholesky factor `L` with `L * L^T = matrix`.
///
/// A semi-definite matrix (a valid correlation matrix with perfectly
/// correlated factors has a zero eigenvalue) is handled by a single
/// tiny diagonal regularisation before failing.
///
/// # Errors
///
/// [`NumericalError::NotPositiveSemiDefinite`] when factorisation
/// fails even after regularisation.
pub fn cholesky_factor(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, NumericalError> {
    if let Some(chol) = nalgebra::Cholesky::new(matrix.clone()) {
        return Ok(chol.l());
    }
    let n = matrix.nrows();
    let bumped = matrix + DMatrix::<f64>::identity(n, n) * 1e-12;
    nalgebra::Cholesky::new(bumped)
        .map(|c| c.l())
        .ok_or_else(|| {
            NumericalError::NotPositiveSemiDefinite(format!(
                "Cholesky failed for {n}x{n} matrix"
            ))
        })
}
