//! Pluggable increment sources for the path simulator.
//!
//! An increment source delivers the uncorrelated standard-normal
//! draws for a given (path, step) pair as a pure function of its
//! seed, so simulation output is reproducible regardless of the
//! order in which parallel workers request increments. Factor
//! correlation is applied afterwards by the simulator via the
//! per-step Cholesky transform.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use scengen_core::math::inverse_normal_cdf;
use scengen_core::types::error::ConfigurationError;

use super::sobol::{splitmix64, SobolSequence};

/// Source of unit-variance, cross-sectionally independent normal
/// increments, addressed by (path, step).
pub trait IncrementSource: Sync {
    /// Number of increments per (path, step), i.e. the factor count.
    fn dimension(&self) -> usize;

    /// Maximum number of paths this source can serve, if bounded.
    fn paths_hint(&self) -> Option<usize> {
        None
    }

    /// Fills `out` (length [`IncrementSource::dimension`]) with the
    /// draws for `(path, step)`.
    fn increments(&self, path: usize, step: usize, out: &mut [f64]);
}

/// Pseudo-random increments from a seeded [`StdRng`].
///
/// Each (path, step) pair gets its own deterministic stream derived
/// from the base seed, making draws independent of evaluation order.
///
/// # Examples
///
/// ```
/// use scengen_models::{IncrementSource, PseudoRandomSource};
///
/// let source = PseudoRandomSource::new(2, 42);
/// let mut a = [0.0; 2];
/// let mut b = [0.0; 2];
/// source.increments(3, 7, &mut a);
/// source.increments(3, 7, &mut b);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct PseudoRandomSource {
    dimension: usize,
    seed: u64,
}

impl PseudoRandomSource {
    /// Creates a source for `dimension` factors from a base seed.
    #[inline]
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self { dimension, seed }
    }

    /// The base seed.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl IncrementSource for PseudoRandomSource {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn increments(&self, path: usize, step: usize, out: &mut [f64]) {
        let stream = splitmix64(self.seed ^ splitmix64((path as u64) << 32 | step as u64));
        let mut rng = StdRng::seed_from_u64(stream);
        for slot in out.iter_mut().take(self.dimension) {
            *slot = StandardNormal.sample(&mut rng);
        }
    }
}

/// Low-discrepancy increments: one Sobol point per path spanning all
/// steps, mapped through the inverse normal CDF.
///
/// The whole point set is materialised at construction so lookups
/// are pure reads during the parallel simulation phase.
#[derive(Debug, Clone)]
pub struct SobolSource {
    dimension: usize,
    n_steps: usize,
    n_paths: usize,
    normals: Vec<f64>,
}

impl SobolSource {
    /// Generates the point set for `n_paths` paths of `n_steps` steps
    /// with `dimension` factors.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] if any count is zero or the total
    /// dimensionality exceeds the generator's limit.
    pub fn new(
        dimension: usize,
        n_steps: usize,
        n_paths: usize,
        seed: u64,
    ) -> Result<Self, ConfigurationError> {
        if dimension == 0 || n_steps == 0 || n_paths == 0 {
            return Err(ConfigurationError::OutOfDomain {
                key: "sobol_source".to_string(),
                value: 0.0,
                constraint: "dimension, n_steps and n_paths must all be > 0".to_string(),
            });
        }
        let total_dim = dimension
            .checked_mul(n_steps)
            .filter(|&d| d <= super::sobol::MAX_DIMENSIONS)
            .ok_or_else(|| ConfigurationError::OutOfDomain {
                key: "sobol_dimension".to_string(),
                value: (dimension * n_steps) as f64,
                constraint: format!("must be <= {}", super::sobol::MAX_DIMENSIONS),
            })?;

        let mut seq = SobolSequence::new(total_dim, seed);
        let mut point = vec![0.0; total_dim];
        let mut normals = Vec::with_capacity(n_paths * total_dim);
        for _ in 0..n_paths {
            // 2^64 points cannot be exhausted for any feasible n_paths.
            seq.next_into(&mut point);
            normals.extend(point.iter().map(|&u| inverse_normal_cdf(u)));
        }
        Ok(Self {
            dimension,
            n_steps,
            n_paths,
            normals,
        })
    }
}

impl IncrementSource for SobolSource {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn paths_hint(&self) -> Option<usize> {
        Some(self.n_paths)
    }

    fn increments(&self, path: usize, step: usize, out: &mut [f64]) {
        debug_assert!(path < self.n_paths && step < self.n_steps);
        let total_dim = self.dimension * self.n_steps;
        let offset = path * total_dim + step * self.dimension;
        out[..self.dimension].copy_from_slice(&self.normals[offset..offset + self.dimension]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_random_is_deterministic_per_cell() {
        let source = PseudoRandomSource::new(3, 99);
        let mut a = [0.0; 3];
        let mut b = [0.0; 3];
        source.increments(0, 0, &mut a);
        source.increments(0, 0, &mut b);
        assert_eq!(a, b);
        source.increments(0, 1, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn pseudo_random_cells_are_distinct_across_paths() {
        let source = PseudoRandomSource::new(1, 7);
        let mut a = [0.0];
        let mut b = [0.0];
        source.increments(1, 5, &mut a);
        source.increments(5, 1, &mut b);
        assert_ne!(a[0], b[0]);
    }

    #[test]
    fn pseudo_random_moments() {
        let source = PseudoRandomSource::new(1, 2024);
        let n = 20_000;
        let mut buf = [0.0];
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for p in 0..n {
            source.increments(p, 0, &mut buf);
            sum += buf[0];
            sum_sq += buf[0] * buf[0];
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!(mean.abs() < 0.03, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.05, "var = {var}");
    }

    #[test]
    fn sobol_source_rejects_degenerate_shapes() {
        assert!(SobolSource::new(0, 10, 10, 1).is_err());
        assert!(SobolSource::new(2, 0, 10, 1).is_err());
        assert!(SobolSource::new(2, 10, 0, 1).is_err());
    }

    #[test]
    fn sobol_source_serves_finite_normals() {
        let source = SobolSource::new(2, 4, 64, 5).unwrap();
        let mut buf = [0.0; 2];
        for p in 0..64 {
            for s in 0..4 {
                source.increments(p, s, &mut buf);
                assert!(buf.iter().all(|v| v.is_finite()));
            }
        }
        assert_eq!(source.paths_hint(), Some(64));
    }

    #[test]
    fn sobol_source_first_dimension_balanced() {
        let n = 1_024;
        let source = SobolSource::new(1, 1, n, 3).unwrap();
        let mut buf = [0.0];
        let mut sum = 0.0;
        for p in 0..n {
            source.increments(p, 0, &mut buf);
            sum += buf[0];
        }
        // Low-discrepancy mean converges much faster than 1/sqrt(n).
        assert!((sum / n as f64).abs() < 0.01);
    }
}
