//! Collateral balance simulation under CSA terms.
//!
//! Consumes a scenario cube, simulates the margin account per path
//! and returns a new cube with the balance appended as an extra leg.
//! The balance process is driven by the netted exposure of the
//! constituent legs: calls and returns are computed against a
//! threshold, floored by the minimum transfer amount, and settle
//! only after the margin period of risk has elapsed, so exposure
//! during the lag window remains uncollateralized.

use rayon::prelude::*;
use tracing::debug;

use scengen_core::types::error::{ConfigurationError, DimensionError, EngineError};
use scengen_core::types::TimeGrid;
use scengen_engine::ScenarioCube;

/// Cube alias of the appended collateral-balance leg.
pub const COLLATERAL_ALIAS: &str = "collateral";

/// Credit support annex parameters, all in years or currency units
/// of the cube.
///
/// # Examples
///
/// ```
/// use scengen_exposure::CsaTerms;
///
/// let csa = CsaTerms::new(1_000.0, 250.0, 0.0, 2.0 / 52.0).unwrap();
/// assert!(CsaTerms::new(-1.0, 0.0, 0.0, 0.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CsaTerms {
    /// Exposure level below which no collateral is required.
    pub threshold: f64,
    /// Smallest transfer that is actually moved.
    pub minimum_transfer_amount: f64,
    /// Amount posted on top of any thresholded requirement.
    pub independent_amount: f64,
    /// Operational settlement lag, in years.
    pub margin_period_of_risk: f64,
}

impl CsaTerms {
    /// Creates validated CSA terms.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::OutOfDomain`] for any negative or
    /// non-finite parameter.
    pub fn new(
        threshold: f64,
        minimum_transfer_amount: f64,
        independent_amount: f64,
        margin_period_of_risk: f64,
    ) -> Result<Self, ConfigurationError> {
        for (key, value) in [
            ("threshold", threshold),
            ("minimum_transfer_amount", minimum_transfer_amount),
            ("independent_amount", independent_amount),
            ("margin_period_of_risk", margin_period_of_risk),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::OutOfDomain {
                    key: key.to_string(),
                    value,
                    constraint: "must be finite and >= 0".to_string(),
                });
            }
        }
        Ok(Self {
            threshold,
            minimum_transfer_amount,
            independent_amount,
            margin_period_of_risk,
        })
    }

    /// The margin period of risk expressed in whole grid steps,
    /// rounded up against the grid's average step width.
    pub fn mpor_steps(&self, grid: &TimeGrid) -> usize {
        if self.margin_period_of_risk == 0.0 || grid.n_steps() == 0 {
            return 0;
        }
        let avg_dt = grid.horizon() / grid.n_steps() as f64;
        (self.margin_period_of_risk / avg_dt).ceil() as usize
    }

    fn required_balance(&self, exposure: f64) -> f64 {
        if exposure > self.threshold {
            exposure - self.threshold + self.independent_amount
        } else if exposure < -self.threshold {
            exposure + self.threshold - self.independent_amount
        } else {
            0.0
        }
    }
}

/// Simulates the collateral balance over a scenario cube and appends
/// it as one extra leg under [`COLLATERAL_ALIAS`].
///
/// At each grid time the netting-set exposure is the sum of the
/// constituent leg values, scaled by the per-leg `fx` factors when
/// given. The required balance is the exposure's excess over the
/// threshold plus the independent amount; the call closing the gap
/// to the current (and in-flight) balance is transferred only if its
/// magnitude reaches the minimum transfer amount, and settles after
/// the margin period of risk. Between settlements the balance is
/// exactly constant, and no transfer ever overshoots the thresholded
/// requirement it was called against.
///
/// # Errors
///
/// [`DimensionError::LengthMismatch`] if `fx` does not carry one
/// factor per cube leg.
pub fn collateralize(
    cube: &ScenarioCube,
    fx: Option<&[f64]>,
    initial_balance: f64,
    csa: &CsaTerms,
) -> Result<ScenarioCube, EngineError> {
    if let Some(factors) = fx {
        if factors.len() != cube.n_legs() {
            return Err(DimensionError::LengthMismatch {
                what: "collateral fx factors".to_string(),
                got: factors.len(),
                expected: cube.n_legs(),
            }
            .into());
        }
    }
    let n_times = cube.grid().len();
    let n_legs = cube.n_legs();
    let lag = csa.mpor_steps(cube.grid());
    debug!(lag, n_paths = cube.n_paths(), "simulating collateral balances");

    let rows: Vec<Vec<f64>> = (0..cube.n_paths())
        .into_par_iter()
        .map(|p| {
            let mut balances = vec![0.0; n_times];
            let mut balance = initial_balance;
            // Calls already made but not yet settled: (settle index,
            // amount).
            let mut in_flight: Vec<(usize, f64)> = Vec::new();

            for t in 0..n_times {
                in_flight.retain(|&(settle, amount)| {
                    if settle <= t {
                        balance += amount;
                        false
                    } else {
                        true
                    }
                });

                let exposure: f64 = (0..n_legs)
                    .map(|l| cube.value(p, t, l) * fx.map_or(1.0, |f| f[l]))
                    .sum();
                let pending: f64 = in_flight.iter().map(|&(_, a)| a).sum();
                let call = csa.required_balance(exposure) - (balance + pending);
                if call.abs() >= csa.minimum_transfer_amount && call != 0.0 {
                    if lag == 0 {
                        balance += call;
                    } else {
                        in_flight.push((t + lag, call));
                    }
                }
                balances[t] = balance;
            }
            balances
        })
        .collect();

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    cube.with_appended_leg(COLLATERAL_ALIAS, &flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Single-leg cube with one deterministic exposure path.
    fn cube_from_path(exposures: &[f64]) -> ScenarioCube {
        let times: Vec<f64> = (0..exposures.len()).map(|i| i as f64 * 0.25).collect();
        let grid = TimeGrid::new(times).unwrap();
        ScenarioCube::new(grid, 1, vec!["net".to_string()], exposures.to_vec()).unwrap()
    }

    fn balance_leg(cube: &ScenarioCube) -> Vec<f64> {
        let leg = cube.leg_index(COLLATERAL_ALIAS).unwrap();
        (0..cube.grid().len()).map(|t| cube.value(0, t, leg)).collect()
    }

    #[test]
    fn terms_validation() {
        assert!(CsaTerms::new(0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(CsaTerms::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
        assert!(CsaTerms::new(0.0, -1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn mpor_step_rounding() {
        let grid = TimeGrid::uniform(1.0, 4).unwrap();
        assert_eq!(CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap().mpor_steps(&grid), 0);
        assert_eq!(CsaTerms::new(0.0, 0.0, 0.0, 0.25).unwrap().mpor_steps(&grid), 1);
        assert_eq!(CsaTerms::new(0.0, 0.0, 0.0, 0.3).unwrap().mpor_steps(&grid), 2);
    }

    #[test]
    fn frictionless_balance_tracks_exposure() {
        let cube = cube_from_path(&[0.0, 100.0, 250.0, 80.0, -40.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        assert_eq!(balance_leg(&collateralized), vec![0.0, 100.0, 250.0, 80.0, -40.0]);
    }

    #[test]
    fn threshold_leaves_exposure_uncollateralized() {
        let cube = cube_from_path(&[0.0, 100.0, 250.0]);
        let csa = CsaTerms::new(150.0, 0.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        assert_eq!(balance_leg(&collateralized), vec![0.0, 0.0, 100.0]);
    }

    #[test]
    fn independent_amount_adds_to_calls() {
        let cube = cube_from_path(&[0.0, 100.0]);
        let csa = CsaTerms::new(0.0, 0.0, 25.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        assert_relative_eq!(balance_leg(&collateralized)[1], 125.0);
    }

    #[test]
    fn transfers_below_mta_are_suppressed() {
        let cube = cube_from_path(&[0.0, 30.0, 45.0, 120.0]);
        let csa = CsaTerms::new(0.0, 50.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        // 30 and the 45-30 top-ups are below MTA; 120 clears it.
        assert_eq!(balance_leg(&collateralized), vec![0.0, 0.0, 0.0, 120.0]);
    }

    #[test]
    fn nonzero_balance_changes_are_at_least_mta() {
        let cube = cube_from_path(&[0.0, 60.0, 75.0, 190.0, 20.0, 20.0]);
        let csa = CsaTerms::new(0.0, 50.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        let balances = balance_leg(&collateralized);
        for w in balances.windows(2) {
            let change = (w[1] - w[0]).abs();
            assert!(change == 0.0 || change >= 50.0, "change {change}");
        }
    }

    #[test]
    fn mpor_delays_settlement() {
        let cube = cube_from_path(&[0.0, 100.0, 100.0, 100.0, 100.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.5).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        // Call made at t=1 settles two steps later.
        assert_eq!(balance_leg(&collateralized), vec![0.0, 0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn in_flight_calls_never_overshoot() {
        // Exposure spikes then falls back before the first call
        // settles; the second call must correct, not double-post.
        let cube = cube_from_path(&[0.0, 200.0, 50.0, 50.0, 50.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.25).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        let balances = balance_leg(&collateralized);
        // t=1: call +200 (settles t=2). t=2: required 50, in-flight
        // 200, call -150 (settles t=3).
        assert_eq!(balances, vec![0.0, 0.0, 200.0, 50.0, 50.0]);
    }

    #[test]
    fn balance_constant_between_transfers() {
        let cube = cube_from_path(&[0.0, 100.0, 100.0, 100.0, 100.0, 100.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        let balances = balance_leg(&collateralized);
        for w in balances[1..].windows(2) {
            assert_eq!(w[0], w[1]);
        }
    }

    #[test]
    fn fx_factors_scale_the_exposure() {
        let cube = cube_from_path(&[0.0, 100.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, Some(&[0.5]), 0.0, &csa).unwrap();
        assert_relative_eq!(balance_leg(&collateralized)[1], 50.0);
    }

    #[test]
    fn fx_factor_count_checked() {
        let cube = cube_from_path(&[0.0, 100.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap();
        assert!(matches!(
            collateralize(&cube, Some(&[1.0, 1.0]), 0.0, &csa),
            Err(EngineError::Dimension(_))
        ));
    }

    #[test]
    fn initial_balance_carries_through() {
        let cube = cube_from_path(&[0.0, 0.0, 0.0]);
        // MTA larger than the return call keeps the opening balance.
        let csa = CsaTerms::new(0.0, 100.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 40.0, &csa).unwrap();
        assert_eq!(balance_leg(&collateralized), vec![40.0, 40.0, 40.0]);
    }

    #[test]
    fn original_legs_survive_unchanged() {
        let cube = cube_from_path(&[1.0, 2.0, 3.0]);
        let csa = CsaTerms::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let collateralized = collateralize(&cube, None, 0.0, &csa).unwrap();
        assert_eq!(collateralized.n_legs(), 2);
        for t in 0..3 {
            assert_eq!(collateralized.value(0, t, 0), cube.value(0, t, 0));
        }
    }
}
