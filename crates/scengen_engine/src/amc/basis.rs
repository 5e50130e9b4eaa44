//! Regression basis functions for continuation-value estimation.

use scengen_core::types::error::ConfigurationError;

/// Choice of basis for continuation-value regressions.
///
/// `Polynomial` spans all monomials of the regression variables up
/// to the given total degree. `PiecewisePolynomial` partitions the
/// first regression variable at the declared breakpoints and fits a
/// separate full polynomial on each segment, which captures the
/// kinked shape of exercise boundaries better than one global
/// polynomial of the same degree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RegressionBasis {
    /// Monomials of total degree `<= degree` over all variables.
    Polynomial {
        /// Maximum total degree.
        degree: usize,
    },
    /// Per-segment polynomials over the first variable's partition.
    PiecewisePolynomial {
        /// Maximum total degree within each segment.
        degree: usize,
        /// Strictly increasing interior breakpoints of the first
        /// regression variable.
        breakpoints: Vec<f64>,
    },
}

impl RegressionBasis {
    /// Validates the basis configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidInstrument`] for non-increasing
    /// or non-finite breakpoints.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let RegressionBasis::PiecewisePolynomial { breakpoints, .. } = self {
            if breakpoints.iter().any(|b| !b.is_finite()) {
                return Err(ConfigurationError::InvalidInstrument(
                    "regression breakpoints must be finite".to_string(),
                ));
            }
            if breakpoints.windows(2).any(|w| w[1] <= w[0]) {
                return Err(ConfigurationError::InvalidInstrument(
                    "regression breakpoints must be strictly increasing".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Number of basis functions for `n_vars` regression variables.
    pub fn n_functions(&self, n_vars: usize) -> usize {
        match self {
            RegressionBasis::Polynomial { degree } => n_monomials(n_vars, *degree),
            RegressionBasis::PiecewisePolynomial {
                degree,
                breakpoints,
            } => (breakpoints.len() + 1) * n_monomials(n_vars, *degree),
        }
    }

    /// Evaluates every basis function at `vars` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != self.n_functions(vars.len())`; callers
    /// size the buffer from the same basis.
    pub fn evaluate_into(&self, vars: &[f64], out: &mut [f64]) {
        match self {
            RegressionBasis::Polynomial { degree } => {
                let written = monomials_into(vars, *degree, out);
                debug_assert_eq!(written, out.len());
            }
            RegressionBasis::PiecewisePolynomial {
                degree,
                breakpoints,
            } => {
                let per_segment = n_monomials(vars.len(), *degree);
                let segment = breakpoints.partition_point(|&b| vars[0] >= b);
                out.fill(0.0);
                let lo = segment * per_segment;
                monomials_into(vars, *degree, &mut out[lo..lo + per_segment]);
            }
        }
    }
}

/// Number of monomials of `n_vars` variables with total degree at
/// most `degree`: C(n_vars + degree, degree).
fn n_monomials(n_vars: usize, degree: usize) -> usize {
    binomial(n_vars + degree, degree.min(n_vars))
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

/// Writes all monomials of total degree `<= degree` at `vars` into
/// `out`, in a fixed deterministic order. Returns the count written.
fn monomials_into(vars: &[f64], degree: usize, out: &mut [f64]) -> usize {
    let mut idx = 0;
    let mut exponents = vec![0usize; vars.len()];
    loop {
        let total: usize = exponents.iter().sum();
        if total <= degree {
            let mut value = 1.0;
            for (v, &e) in vars.iter().zip(&exponents) {
                value *= v.powi(e as i32);
            }
            out[idx] = value;
            idx += 1;
        }
        // Odometer over exponent tuples bounded by the total degree.
        let mut pos = 0;
        loop {
            if pos == exponents.len() {
                return idx;
            }
            exponents[pos] += 1;
            if exponents.iter().sum::<usize>() <= degree {
                break;
            }
            exponents[pos] = 0;
            pos += 1;
        }
    }
}
