//! Single cash-flow variants and their accrual periods.

use scengen_core::types::error::{ConfigurationError, EngineError};
use scengen_models::Simulation;

use crate::context::{CurveKey, MarketContext};

/// Window below which a projection period is treated as degenerate
/// and the short rate substitutes for the period forward.
const PERIOD_EPS: f64 = 1e-12;

/// Accrual window and payment time of a single cash flow.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Period {
    /// Accrual start, in years from the valuation date.
    pub accrual_start: f64,
    /// Accrual end; must be strictly after the start.
    pub accrual_end: f64,
    /// Payment time; must not precede the accrual end.
    pub payment_time: f64,
}

impl Period {
    /// Creates a validated period.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidInstrument`] for a non-positive
    /// accrual window or a payment before accrual end.
    pub fn new(
        accrual_start: f64,
        accrual_end: f64,
        payment_time: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(accrual_start.is_finite() && accrual_end.is_finite() && payment_time.is_finite()) {
            return Err(ConfigurationError::InvalidInstrument(
                "period times must be finite".to_string(),
            ));
        }
        if accrual_end <= accrual_start {
            return Err(ConfigurationError::InvalidInstrument(format!(
                "accrual end {accrual_end} must be after start {accrual_start}"
            )));
        }
        if payment_time < accrual_end {
            return Err(ConfigurationError::InvalidInstrument(format!(
                "payment time {payment_time} precedes accrual end {accrual_end}"
            )));
        }
        Ok(Self {
            accrual_start,
            accrual_end,
            payment_time,
        })
    }

    /// Accrual year fraction (act/act on the model time axis).
    #[inline]
    pub fn year_fraction(&self) -> f64 {
        self.accrual_end - self.accrual_start
    }
}

/// Floating-rate compounding convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Compounding {
    /// Simple accrual: `(rate + spread) * yf`.
    Simple,
    /// Continuous compounding of the period growth with an additive
    /// continuously-compounded spread.
    Compounded,
}

/// A single deterministic or rate-linked payment, per unit notional.
///
/// Closed variant set: valuation is a single dispatch over the tag.
/// Optionlets clip the floating amount at the strike; notional
/// variants pay a fixed fraction of the leg notional (e.g. `1.0`
/// for a final redemption, `-1.0` for an initial exchange).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CashFlow {
    /// Fixed-rate coupon.
    Fixed {
        /// Annualised fixed rate.
        rate: f64,
    },
    /// Floating coupon fixed off the resolved index curve.
    Floating {
        /// Projection curve key.
        key: CurveKey,
        /// Accrual convention.
        compounding: Compounding,
        /// Additive spread over the index.
        spread: f64,
    },
    /// Caplet: pays `max(rate - strike, 0) * yf`.
    Caplet {
        /// Projection curve key.
        key: CurveKey,
        /// Cap strike.
        strike: f64,
    },
    /// Floorlet: pays `max(strike - rate, 0) * yf`.
    Floorlet {
        /// Projection curve key.
        key: CurveKey,
        /// Floor strike.
        strike: f64,
    },
    /// Bullet notional flow.
    Notional {
        /// Fraction of the leg notional exchanged.
        fraction: f64,
    },
}

impl CashFlow {
    /// Projected flow amount per unit notional, observed at the grid
    /// time of `time_idx` along `path`.
    ///
    /// Floating fixings are projected from the curve state at the
    /// observation time over the period's remaining accrual window;
    /// a period whose window has fully elapsed projects off the
    /// short rate.
    pub fn amount(
        &self,
        period: &Period,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        let yf = period.year_fraction();
        match self {
            CashFlow::Fixed { rate } => Ok(rate * yf),
            CashFlow::Floating {
                key,
                compounding,
                spread,
            } => {
                let rate = projected_rate(key, period, sim, context, path, time_idx)?;
                match compounding {
                    Compounding::Simple => Ok((rate + spread) * yf),
                    Compounding::Compounded => {
                        Ok((1.0 + rate * yf) * (spread * yf).exp() - 1.0)
                    }
                }
            }
            CashFlow::Caplet { key, strike } => {
                let rate = projected_rate(key, period, sim, context, path, time_idx)?;
                Ok(((rate - strike) * yf).max(0.0))
            }
            CashFlow::Floorlet { key, strike } => {
                let rate = projected_rate(key, period, sim, context, path, time_idx)?;
                Ok(((strike - rate) * yf).max(0.0))
            }
            CashFlow::Notional { fraction } => Ok(*fraction),
        }
    }
}

/// Simple rate for the period, projected at the observation time.
///
/// The projection window is the part of the accrual period at or
/// after the observation time (a forward-looking fixing cannot look
/// into the already-elapsed past state).
fn projected_rate(
    key: &CurveKey,
    period: &Period,
    sim: &Simulation,
    context: &MarketContext,
    path: usize,
    time_idx: usize,
) -> Result<f64, EngineError> {
    let t = sim.grid().time(time_idx);
    let start = period.accrual_start.max(t);
    let end = period.accrual_end.max(start);
    if end - start < PERIOD_EPS {
        return context.short_rate(sim, path, time_idx);
    }
    context.forward_rate(key, sim, path, time_idx, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scengen_core::market_data::curves::Curve;
    use scengen_core::types::{Currency, TimeGrid};
    use scengen_models::{
        simulate, GaussianHjmModel, GaussianHjmParams, HjmFactor, PseudoRandomSource,
    };

    fn setup(rate: f64) -> (Simulation, MarketContext) {
        let model = GaussianHjmModel::new(GaussianHjmParams {
            factors: vec![HjmFactor::constant(0.05, 0.01).unwrap()],
            benchmark_tenors: vec![1.0],
            correlation: vec![vec![1.0]],
            initial_curve: Curve::flat(rate),
        })
        .unwrap();
        let grid = TimeGrid::uniform(2.0, 4).unwrap();
        let sim = simulate(&model, &grid, 4, &PseudoRandomSource::new(1, 9)).unwrap();
        let context = MarketContext::new(model, Currency::EUR);
        (sim, context)
    }

    #[test]
    fn period_validation() {
        assert!(Period::new(0.0, 1.0, 1.0).is_ok());
        assert!(Period::new(1.0, 1.0, 1.0).is_err());
        assert!(Period::new(0.0, 1.0, 0.5).is_err());
        assert!(Period::new(0.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn fixed_coupon_is_rate_times_year_fraction() {
        let (sim, context) = setup(0.02);
        let period = Period::new(0.0, 1.0, 1.0).unwrap();
        let flow = CashFlow::Fixed { rate: 0.02 };
        let amount = flow.amount(&period, &sim, &context, 0, 0).unwrap();
        assert_relative_eq!(amount, 0.02, epsilon = 1e-14);
    }

    #[test]
    fn floating_coupon_matches_curve_forward_at_origin() {
        let (sim, context) = setup(0.02);
        let period = Period::new(1.0, 2.0, 2.0).unwrap();
        let flow = CashFlow::Floating {
            key: CurveKey::discount(Currency::EUR),
            compounding: Compounding::Simple,
            spread: 0.0,
        };
        let amount = flow.amount(&period, &sim, &context, 0, 0).unwrap();
        assert_relative_eq!(amount, (0.02_f64).exp() - 1.0, epsilon = 1e-10);
    }

    #[test]
    fn floating_spread_adds_on_top() {
        let (sim, context) = setup(0.02);
        let period = Period::new(1.0, 2.0, 2.0).unwrap();
        let no_spread = CashFlow::Floating {
            key: CurveKey::discount(Currency::EUR),
            compounding: Compounding::Simple,
            spread: 0.0,
        };
        let with_spread = CashFlow::Floating {
            key: CurveKey::discount(Currency::EUR),
            compounding: Compounding::Simple,
            spread: 0.005,
        };
        let a = no_spread.amount(&period, &sim, &context, 0, 0).unwrap();
        let b = with_spread.amount(&period, &sim, &context, 0, 0).unwrap();
        assert_relative_eq!(b - a, 0.005, epsilon = 1e-12);
    }

    #[test]
    fn caplet_and_floorlet_clip_at_strike() {
        let (sim, context) = setup(0.02);
        let period = Period::new(1.0, 2.0, 2.0).unwrap();
        let forward = (0.02_f64).exp() - 1.0;

        let deep_itm_cap = CashFlow::Caplet {
            key: CurveKey::discount(Currency::EUR),
            strike: 0.0,
        };
        let otm_cap = CashFlow::Caplet {
            key: CurveKey::discount(Currency::EUR),
            strike: 0.10,
        };
        assert_relative_eq!(
            deep_itm_cap.amount(&period, &sim, &context, 0, 0).unwrap(),
            forward,
            epsilon = 1e-10
        );
        assert_eq!(otm_cap.amount(&period, &sim, &context, 0, 0).unwrap(), 0.0);

        let itm_floor = CashFlow::Floorlet {
            key: CurveKey::discount(Currency::EUR),
            strike: 0.10,
        };
        assert_relative_eq!(
            itm_floor.amount(&period, &sim, &context, 0, 0).unwrap(),
            0.10 - forward,
            epsilon = 1e-10
        );
    }

    #[test]
    fn notional_flow_is_path_independent() {
        let (sim, context) = setup(0.02);
        let period = Period::new(0.0, 2.0, 2.0).unwrap();
        let flow = CashFlow::Notional { fraction: 1.0 };
        for p in 0..sim.n_paths() {
            assert_eq!(flow.amount(&period, &sim, &context, p, 3).unwrap(), 1.0);
        }
    }

    #[test]
    fn elapsed_period_projects_off_short_rate() {
        let (sim, context) = setup(0.02);
        // Accrual fully in the past at the last grid time.
        let period = Period::new(0.0, 0.5, 2.5).unwrap();
        let flow = CashFlow::Floating {
            key: CurveKey::discount(Currency::EUR),
            compounding: Compounding::Simple,
            spread: 0.0,
        };
        let t_idx = sim.grid().len() - 1;
        let amount = flow.amount(&period, &sim, &context, 0, t_idx).unwrap();
        let r = context.short_rate(&sim, 0, t_idx).unwrap();
        assert_relative_eq!(amount, r * 0.5, epsilon = 1e-12);
    }
}
