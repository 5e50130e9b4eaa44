//! Exposure reductions over scenario cubes.
//!
//! Pure functions from `[path][time]` value planes to exposure
//! profiles; the input cube is never mutated:
//!
//! - Expected Exposure (EE)
//! - Expected Negative Exposure (ENE)
//! - Expected Positive Exposure (EPE, time-averaged)
//! - Potential Future Exposure (PFE) and peak PFE

use rayon::prelude::*;

use scengen_core::types::error::{ConfigurationError, EngineError};
use scengen_engine::ScenarioCube;

/// Exposure calculation utilities.
pub struct ExposureCalculator;

impl ExposureCalculator {
    /// Expected Exposure at each time point.
    ///
    /// EE(t) = E[max(V(t), 0)]
    ///
    /// # Arguments
    ///
    /// * `values` - Simulated values `[path_idx][time_idx]`
    ///
    /// # Examples
    ///
    /// ```
    /// use scengen_exposure::ExposureCalculator;
    ///
    /// let values = vec![
    ///     vec![10.0, 20.0],
    ///     vec![-5.0, 10.0],
    /// ];
    /// let ee = ExposureCalculator::expected_exposure(&values);
    /// assert_eq!(ee, vec![5.0, 15.0]);
    /// ```
    pub fn expected_exposure(values: &[Vec<f64>]) -> Vec<f64> {
        reduce_over_paths(values, |v| v.max(0.0))
    }

    /// Expected Negative Exposure at each time point.
    ///
    /// ENE(t) = E[max(-V(t), 0)]
    pub fn expected_negative_exposure(values: &[Vec<f64>]) -> Vec<f64> {
        reduce_over_paths(values, |v| (-v).max(0.0))
    }

    /// Time-weighted Expected Positive Exposure.
    ///
    /// EPE = (1/T) * integral of EE(t) dt, by trapezoid over the
    /// grid.
    pub fn expected_positive_exposure(ee: &[f64], times: &[f64]) -> f64 {
        if times.len() < 2 || ee.len() != times.len() {
            return ee.first().copied().unwrap_or(0.0);
        }
        let mut integral = 0.0;
        for i in 0..times.len() - 1 {
            integral += 0.5 * (ee[i] + ee[i + 1]) * (times[i + 1] - times[i]);
        }
        let total = times[times.len() - 1] - times[0];
        if total > 0.0 {
            integral / total
        } else {
            ee[0]
        }
    }

    /// Potential Future Exposure at each time point: the empirical
    /// `confidence` quantile of the positive exposure across paths.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::OutOfDomain`] for a confidence outside
    /// the open interval (0, 1).
    pub fn potential_future_exposure(
        values: &[Vec<f64>],
        confidence: f64,
    ) -> Result<Vec<f64>, ConfigurationError> {
        if !confidence.is_finite() || confidence <= 0.0 || confidence >= 1.0 {
            return Err(ConfigurationError::OutOfDomain {
                key: "confidence".to_string(),
                value: confidence,
                constraint: "must lie in (0, 1)".to_string(),
            });
        }
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let n_paths = values.len();
        let n_times = values[0].len();
        let quantile_idx =
            (((n_paths as f64 - 1.0) * confidence).round() as usize).min(n_paths - 1);

        Ok((0..n_times)
            .into_par_iter()
            .map(|t| {
                let mut exposures: Vec<f64> =
                    values.iter().map(|path| path[t].max(0.0)).collect();
                exposures
                    .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                exposures[quantile_idx]
            })
            .collect())
    }

    /// Maximum of a PFE profile.
    #[inline]
    pub fn peak_pfe(pfe: &[f64]) -> f64 {
        pfe.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Expected Exposure of one cube leg.
    ///
    /// # Errors
    ///
    /// [`scengen_core::types::error::DimensionError`] for an unknown
    /// leg index.
    pub fn cube_expected_exposure(
        cube: &ScenarioCube,
        leg: usize,
    ) -> Result<Vec<f64>, EngineError> {
        Ok(Self::expected_exposure(&cube.leg_paths(leg)?))
    }

    /// Expected Negative Exposure of one cube leg.
    pub fn cube_expected_negative_exposure(
        cube: &ScenarioCube,
        leg: usize,
    ) -> Result<Vec<f64>, EngineError> {
        Ok(Self::expected_negative_exposure(&cube.leg_paths(leg)?))
    }

    /// Potential Future Exposure of one cube leg.
    pub fn cube_potential_future_exposure(
        cube: &ScenarioCube,
        leg: usize,
        confidence: f64,
    ) -> Result<Vec<f64>, EngineError> {
        Ok(Self::potential_future_exposure(
            &cube.leg_paths(leg)?,
            confidence,
        )?)
    }
}

fn reduce_over_paths(values: &[Vec<f64>], transform: impl Fn(f64) -> f64 + Sync) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n_times = values[0].len();
    let n_paths = values.len();
    (0..n_times)
        .into_par_iter()
        .map(|t| {
            let sum: f64 = values.iter().map(|path| transform(path[t])).sum();
            sum / n_paths as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scengen_core::types::TimeGrid;

    #[test]
    fn expected_exposure_floors_at_zero() {
        let values = vec![
            vec![10.0, 20.0, 15.0],
            vec![5.0, -10.0, 25.0],
            vec![-5.0, 15.0, 10.0],
        ];
        let ee = ExposureCalculator::expected_exposure(&values);
        assert_relative_eq!(ee[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(ee[1], 35.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(ee[2], 50.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn expected_negative_exposure_mirrors_sign() {
        let values = vec![vec![10.0, -20.0], vec![-5.0, -10.0], vec![15.0, 5.0]];
        let ene = ExposureCalculator::expected_negative_exposure(&values);
        assert_relative_eq!(ene[0], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(ene[1], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_profiles() {
        let values: Vec<Vec<f64>> = vec![];
        assert!(ExposureCalculator::expected_exposure(&values).is_empty());
        assert!(ExposureCalculator::potential_future_exposure(&values, 0.95)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn epe_is_trapezoidal_average() {
        let ee = vec![0.0, 10.0, 20.0, 15.0, 5.0];
        let times = vec![0.0, 0.25, 0.5, 0.75, 1.0];
        let epe = ExposureCalculator::expected_positive_exposure(&ee, &times);
        assert_relative_eq!(epe, 11.875, epsilon = 1e-12);
    }

    #[test]
    fn pfe_is_empirical_quantile() {
        let values = vec![vec![10.0], vec![5.0], vec![15.0], vec![20.0], vec![25.0]];
        let pfe = ExposureCalculator::potential_future_exposure(&values, 0.80).unwrap();
        assert_relative_eq!(pfe[0], 20.0, epsilon = 1e-12);
    }

    #[test]
    fn pfe_rejects_bad_confidence() {
        let values = vec![vec![1.0]];
        assert!(ExposureCalculator::potential_future_exposure(&values, 0.0).is_err());
        assert!(ExposureCalculator::potential_future_exposure(&values, 1.0).is_err());
        assert!(ExposureCalculator::potential_future_exposure(&values, f64::NAN).is_err());
    }

    #[test]
    fn pfe_floors_negative_values() {
        let values = vec![vec![-10.0], vec![-5.0], vec![-1.0]];
        let pfe = ExposureCalculator::potential_future_exposure(&values, 0.95).unwrap();
        assert_eq!(pfe[0], 0.0);
    }

    #[test]
    fn peak_pfe_is_profile_maximum() {
        assert_eq!(ExposureCalculator::peak_pfe(&[10.0, 25.0, 15.0]), 25.0);
        assert_eq!(ExposureCalculator::peak_pfe(&[]), 0.0);
    }

    #[test]
    fn cube_reductions_match_slice_reductions() {
        let grid = TimeGrid::new(vec![0.0, 1.0]).unwrap();
        let cube = ScenarioCube::new(
            grid,
            2,
            vec!["net".to_string()],
            vec![10.0, -20.0, -5.0, 30.0],
        )
        .unwrap();
        let ee = ExposureCalculator::cube_expected_exposure(&cube, 0).unwrap();
        assert_relative_eq!(ee[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(ee[1], 15.0, epsilon = 1e-12);
        assert!(ExposureCalculator::cube_expected_exposure(&cube, 1).is_err());
    }
}
