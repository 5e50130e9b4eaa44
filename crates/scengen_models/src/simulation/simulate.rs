//! Monte Carlo path simulation of the HJM factor state.
//!
//! The simulator discretises the model over a validated time grid
//! using the model's exact Gaussian transition moments. Output is a
//! [`Simulation`]: a three-dimensional array of state values indexed
//! by (state variable, path, time), generated once and read-only
//! thereafter.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

use scengen_core::types::error::{
    ConfigurationError, DimensionError, EngineError, NumericalError,
};
use scengen_core::types::TimeGrid;

use crate::hjm::GaussianHjmModel;

use super::increments::IncrementSource;

/// Immutable simulated state cube.
///
/// Stores one row per state variable: the factor states `x_i`
/// followed by the integrated short rate `s(t) = \int_0^t r(u) du`,
/// which downstream code uses for the bank-account numeraire
/// `N(t) = exp(s(t))`. The deterministic auxiliary covariance
/// `y(t)` is carried per grid time for bond reconstitution.
#[derive(Debug, Clone)]
pub struct Simulation {
    grid: TimeGrid,
    n_paths: usize,
    n_factors: usize,
    // Flattened [state][path][time].
    values: Vec<f64>,
    y: Vec<DMatrix<f64>>,
    state_alias: Vec<String>,
}

impl Simulation {
    /// Number of simulated paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of stochastic factors.
    #[inline]
    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    /// Number of state variables (factors + integrated rate).
    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_factors + 1
    }

    /// The simulation time grid.
    #[inline]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Ordered state variable names.
    #[inline]
    pub fn state_alias(&self) -> &[String] {
        &self.state_alias
    }

    /// Raw state value for (state variable, path, time index).
    #[inline]
    pub fn state(&self, state: usize, path: usize, time_idx: usize) -> f64 {
        let n_times = self.grid.len();
        self.values[(state * self.n_paths + path) * n_times + time_idx]
    }

    /// Copies the factor state vector at (path, time index) into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() < n_factors()`.
    pub fn fill_factors(&self, path: usize, time_idx: usize, out: &mut [f64]) {
        for s in 0..self.n_factors {
            out[s] = self.state(s, path, time_idx);
        }
    }

    /// Factor state vector at (path, time index).
    pub fn factors(&self, path: usize, time_idx: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.n_factors];
        self.fill_factors(path, time_idx, &mut out);
        out
    }

    /// Integrated short rate `s(t)` at (path, time index).
    #[inline]
    pub fn integrated_rate(&self, path: usize, time_idx: usize) -> f64 {
        self.state(self.n_factors, path, time_idx)
    }

    /// Bank-account numeraire `N(t) = exp(s(t))` along a path.
    #[inline]
    pub fn numeraire(&self, path: usize, time_idx: usize) -> f64 {
        self.integrated_rate(path, time_idx).exp()
    }

    /// Auxiliary covariance `y` at a grid time.
    #[inline]
    pub fn y(&self, time_idx: usize) -> &DMatrix<f64> {
        &self.y[time_idx]
    }
}

/// Simulates the model state over the grid.
///
/// Stepping uses the exact conditional mean and covariance of the
/// Gaussian factor state, so path distributions are unbiased on
/// arbitrarily coarse grids. The integrated short rate is
/// accumulated trapezoidally from the grid-point short rates.
///
/// Reproducibility: output is a pure function of (model, grid,
/// `n_paths`, increment source), independent of worker scheduling.
///
/// # Errors
///
/// - [`DimensionError`] if the source dimension does not match the
///   model factor count, or the source cannot serve `n_paths`
/// - [`ConfigurationError`] for a zero path count
/// - [`NumericalError`] if an increment or state is non-finite, or a
///   step covariance fails to factorise
pub fn simulate<S: IncrementSource>(
    model: &GaussianHjmModel,
    grid: &TimeGrid,
    n_paths: usize,
    source: &S,
) -> Result<Simulation, EngineError> {
    let n = model.n_factors();
    if source.dimension() != n {
        return Err(DimensionError::LengthMismatch {
            what: "increment source dimension".to_string(),
            got: source.dimension(),
            expected: n,
        }
        .into());
    }
    if n_paths == 0 {
        return Err(ConfigurationError::OutOfDomain {
            key: "n_paths".to_string(),
            value: 0.0,
            constraint: "must be > 0".to_string(),
        }
        .into());
    }
    if let Some(max_paths) = source.paths_hint() {
        if n_paths > max_paths {
            return Err(DimensionError::LengthMismatch {
                what: "increment source paths".to_string(),
                got: n_paths,
                expected: max_paths,
            }
            .into());
        }
    }

    let times = grid.times();
    let n_times = times.len();
    debug!(n_paths, n_steps = n_times - 1, n_factors = n, "simulating HJM state");

    // Deterministic per-step data, shared read-only across workers.
    let y = model.y_grid(times);
    let mut transitions = Vec::with_capacity(n_times - 1);
    for k in 1..n_times {
        transitions.push(model.transition(times[k - 1], times[k], &y[k - 1])?);
    }
    let mut forwards = Vec::with_capacity(n_times);
    for &t in times {
        forwards.push(model.instantaneous_forward(t)?);
    }

    let n_states = n + 1;
    let path_results: Result<Vec<Vec<f64>>, EngineError> = (0..n_paths)
        .into_par_iter()
        .map(|path| {
            // Per-path buffer, [time][state].
            let mut buf = vec![0.0; n_times * n_states];
            let mut x = vec![0.0; n];
            let mut z = vec![0.0; n];
            let mut s = 0.0;
            let mut r_prev = forwards[0];

            for k in 1..n_times {
                source.increments(path, k - 1, &mut z);
                if z.iter().any(|v| !v.is_finite()) {
                    return Err(NumericalError::NonFinite {
                        context: format!("increments at path {path}, step {}", k - 1),
                    }
                    .into());
                }
                let tr = &transitions[k - 1];
                // x <- decay .* x + drift + L z (L lower triangular).
                for i in (0..n).rev() {
                    let mut shock = 0.0;
                    for j in 0..=i {
                        shock += tr.chol[(i, j)] * z[j];
                    }
                    x[i] = tr.decay[i] * x[i] + tr.drift[i] + shock;
                }
                let r = forwards[k] + x.iter().sum::<f64>();
                s += 0.5 * (r_prev + r) * grid.dt(k);
                r_prev = r;

                let row = k * n_states;
                buf[row..row + n].copy_from_slice(&x);
                buf[row + n] = s;
            }
            Ok(buf)
        })
        .collect();
    let path_results = path_results?;

    // Reassemble into the (state, path, time) layout.
    let mut values = vec![0.0; n_states * n_paths * n_times];
    for (path, buf) in path_results.iter().enumerate() {
        for k in 0..n_times {
            for state in 0..n_states {
                values[(state * n_paths + path) * n_times + k] = buf[k * n_states + state];
            }
        }
    }

    info!(n_paths, horizon = grid.horizon(), "simulation complete");
    Ok(Simulation {
        grid: grid.clone(),
        n_paths,
        n_factors: n,
        values,
        y,
        state_alias: model.state_alias(),
    })
}
