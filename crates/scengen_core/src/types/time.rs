//! Simulation time grid.
//!
//! All engine times are year fractions from the valuation date.
//! The grid is validated once at construction; every simulation,
//! cube and collateral operation indexes into the same grid, so a
//! degenerate grid is rejected before any stochastic work begins.

use super::error::ConfigurationError;

/// Tolerance for matching a continuous time to a grid point.
const GRID_EPS: f64 = 1e-9;

/// A strictly increasing simulation time grid starting at zero.
///
/// # Examples
///
/// ```
/// use scengen_core::types::TimeGrid;
///
/// let grid = TimeGrid::new(vec![0.0, 0.5, 1.0, 2.0]).unwrap();
/// assert_eq!(grid.len(), 4);
/// assert_eq!(grid.dt(1), 0.5);
/// assert_eq!(grid.index_of(1.0), Some(2));
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Builds a grid from raw times.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidTimeGrid`] if the grid has
    /// fewer than two points, does not start at 0, is not strictly
    /// increasing, or contains non-finite values.
    pub fn new(times: Vec<f64>) -> Result<Self, ConfigurationError> {
        if times.len() < 2 {
            return Err(ConfigurationError::InvalidTimeGrid(format!(
                "need at least 2 points, got {}",
                times.len()
            )));
        }
        if times[0].abs() > GRID_EPS {
            return Err(ConfigurationError::InvalidTimeGrid(format!(
                "grid must start at 0, got {}",
                times[0]
            )));
        }
        for window in times.windows(2) {
            if !window[0].is_finite() || !window[1].is_finite() {
                return Err(ConfigurationError::InvalidTimeGrid(
                    "non-finite time point".to_string(),
                ));
            }
            if window[1] <= window[0] {
                return Err(ConfigurationError::InvalidTimeGrid(format!(
                    "not strictly increasing at {} -> {}",
                    window[0], window[1]
                )));
            }
        }
        Ok(Self { times })
    }

    /// Builds a uniform grid of `n_steps` steps covering `[0, horizon]`.
    pub fn uniform(horizon: f64, n_steps: usize) -> Result<Self, ConfigurationError> {
        if n_steps == 0 || !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigurationError::InvalidTimeGrid(format!(
                "uniform grid needs positive horizon and steps, got horizon {horizon}, steps {n_steps}"
            )));
        }
        let dt = horizon / n_steps as f64;
        let times = (0..=n_steps).map(|i| i as f64 * dt).collect();
        Self::new(times)
    }

    /// Number of grid points (steps + 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false by construction; provided for clippy symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of simulation steps.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// All grid times.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time at index `i`.
    #[inline]
    pub fn time(&self, i: usize) -> f64 {
        self.times[i]
    }

    /// Final grid time.
    #[inline]
    pub fn horizon(&self) -> f64 {
        *self.times.last().expect("grid is never empty")
    }

    /// Step width entering index `i`, i.e. `t[i] - t[i-1]`.
    ///
    /// # Panics
    ///
    /// Panics if `i == 0` or `i >= len()`.
    #[inline]
    pub fn dt(&self, i: usize) -> f64 {
        self.times[i] - self.times[i - 1]
    }

    /// Index of a grid point matching `t` exactly (within tolerance).
    pub fn index_of(&self, t: f64) -> Option<usize> {
        // Grids are short; a scan keeps the tolerance handling simple.
        self.times.iter().position(|&x| (x - t).abs() <= GRID_EPS)
    }

    /// Largest index whose time is `<= t`.
    ///
    /// Returns `None` when `t` precedes the grid start.
    pub fn index_at_or_before(&self, t: f64) -> Option<usize> {
        if t < self.times[0] - GRID_EPS {
            return None;
        }
        let mut idx = 0;
        for (i, &x) in self.times.iter().enumerate() {
            if x <= t + GRID_EPS {
                idx = i;
            } else {
                break;
            }
        }
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn valid_grid() {
        let grid = TimeGrid::new(vec![0.0, 0.25, 0.5, 1.0]).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.n_steps(), 3);
        assert_relative_eq!(grid.horizon(), 1.0);
        assert_relative_eq!(grid.dt(3), 0.5);
    }

    #[test]
    fn rejects_short_grid() {
        assert!(TimeGrid::new(vec![0.0]).is_err());
        assert!(TimeGrid::new(vec![]).is_err());
    }

    #[test]
    fn rejects_nonzero_start() {
        assert!(TimeGrid::new(vec![0.5, 1.0]).is_err());
    }

    #[test]
    fn rejects_non_monotonic() {
        assert!(TimeGrid::new(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::new(vec![0.0, 1.0, 0.5]).is_err());
    }

    #[test]
    fn rejects_non_finite() {
        assert!(TimeGrid::new(vec![0.0, f64::NAN]).is_err());
        assert!(TimeGrid::new(vec![0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn uniform_grid() {
        let grid = TimeGrid::uniform(2.0, 8).unwrap();
        assert_eq!(grid.len(), 9);
        assert_relative_eq!(grid.time(4), 1.0);
        assert!(TimeGrid::uniform(0.0, 8).is_err());
        assert!(TimeGrid::uniform(1.0, 0).is_err());
    }

    #[test]
    fn index_lookups() {
        let grid = TimeGrid::new(vec![0.0, 0.5, 1.0, 2.0]).unwrap();
        assert_eq!(grid.index_of(0.5), Some(1));
        assert_eq!(grid.index_of(0.75), None);
        assert_eq!(grid.index_at_or_before(0.75), Some(1));
        assert_eq!(grid.index_at_or_before(2.5), Some(3));
        assert_eq!(grid.index_at_or_before(-0.1), None);
    }
}
