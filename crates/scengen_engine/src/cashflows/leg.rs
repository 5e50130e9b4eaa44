//! Legs: ordered cash flows with notionals, discounting and FX.

use scengen_core::types::error::{ConfigurationError, DimensionError, EngineError};
use scengen_core::types::{Currency, CurrencyPair};
use scengen_models::Simulation;

use crate::context::{CurveKey, MarketContext};

use super::flow::{CashFlow, Period};

/// Payer/receiver convention of a leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Sign {
    /// Leg is paid: values enter with factor -1.
    Payer,
    /// Leg is received: values enter with factor +1.
    Receiver,
}

impl Sign {
    /// Multiplicative factor of the convention.
    #[inline]
    pub fn factor(&self) -> f64 {
        match self {
            Sign::Payer => -1.0,
            Sign::Receiver => 1.0,
        }
    }
}

/// An ordered sequence of cash flows with per-flow notionals, a
/// discount-curve key, an optional FX conversion and a sign.
///
/// Invariants enforced at construction: the notional array length
/// equals the cash-flow count, and accrual periods are
/// non-overlapping and monotonically increasing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Leg {
    periods: Vec<Period>,
    flows: Vec<CashFlow>,
    notionals: Vec<f64>,
    discount_key: CurveKey,
    fx_key: Option<CurrencyPair>,
    sign: Sign,
}

impl Leg {
    /// Creates a validated leg.
    ///
    /// # Errors
    ///
    /// - [`DimensionError::LengthMismatch`] if the notional or period
    ///   arrays disagree with the flow count
    /// - [`ConfigurationError::InvalidInstrument`] for overlapping or
    ///   non-increasing accrual periods
    pub fn new(
        periods: Vec<Period>,
        flows: Vec<CashFlow>,
        notionals: Vec<f64>,
        discount_key: CurveKey,
        fx_key: Option<CurrencyPair>,
        sign: Sign,
    ) -> Result<Self, EngineError> {
        if periods.len() != flows.len() {
            return Err(DimensionError::LengthMismatch {
                what: "leg periods".to_string(),
                got: periods.len(),
                expected: flows.len(),
            }
            .into());
        }
        if notionals.len() != flows.len() {
            return Err(DimensionError::LengthMismatch {
                what: "leg notionals".to_string(),
                got: notionals.len(),
                expected: flows.len(),
            }
            .into());
        }
        if flows.is_empty() {
            return Err(ConfigurationError::InvalidInstrument(
                "leg has no cash flows".to_string(),
            )
            .into());
        }
        for pair in periods.windows(2) {
            if pair[1].accrual_start < pair[0].accrual_end {
                return Err(ConfigurationError::InvalidInstrument(format!(
                    "accrual periods overlap: [{}, {}] then [{}, {}]",
                    pair[0].accrual_start,
                    pair[0].accrual_end,
                    pair[1].accrual_start,
                    pair[1].accrual_end
                ))
                .into());
            }
        }
        Ok(Self {
            periods,
            flows,
            notionals,
            discount_key,
            fx_key,
            sign,
        })
    }

    /// A uniform fixed-rate leg: `n_periods` coupons of `period`
    /// years each, paid at period end, constant notional.
    pub fn fixed(
        notional: f64,
        rate: f64,
        period: f64,
        n_periods: usize,
        discount_key: CurveKey,
        sign: Sign,
    ) -> Result<Self, EngineError> {
        let mut periods = Vec::with_capacity(n_periods);
        for i in 0..n_periods {
            let start = i as f64 * period;
            periods.push(Period::new(start, start + period, start + period)?);
        }
        let flows = vec![CashFlow::Fixed { rate }; n_periods];
        let notionals = vec![notional; n_periods];
        Self::new(periods, flows, notionals, discount_key, None, sign)
    }

    /// A uniform floating leg fixed off `projection_key`.
    pub fn floating(
        notional: f64,
        spread: f64,
        period: f64,
        n_periods: usize,
        projection_key: CurveKey,
        discount_key: CurveKey,
        sign: Sign,
    ) -> Result<Self, EngineError> {
        let mut periods = Vec::with_capacity(n_periods);
        for i in 0..n_periods {
            let start = i as f64 * period;
            periods.push(Period::new(start, start + period, start + period)?);
        }
        let flows = vec![
            CashFlow::Floating {
                key: projection_key,
                compounding: super::flow::Compounding::Simple,
                spread,
            };
            n_periods
        ];
        let notionals = vec![notional; n_periods];
        Self::new(periods, flows, notionals, discount_key, None, sign)
    }

    /// The leg's native valuation currency: the FX quote currency
    /// when a conversion is attached, otherwise the discount
    /// currency.
    #[inline]
    pub fn currency(&self) -> Currency {
        match self.fx_key {
            Some(pair) => pair.quote,
            None => self.discount_key.currency,
        }
    }

    /// Accrual periods.
    #[inline]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Payment time of the last cash flow.
    pub fn maturity(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| p.payment_time)
            .fold(0.0, f64::max)
    }

    /// Mark-to-market value at (path, grid time): the sum of the
    /// remaining flows' discounted, sign-adjusted, FX-converted
    /// values. Flows with payment time at or before the observation
    /// time are settled and excluded.
    pub fn value(
        &self,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        self.value_scaled(sim, context, path, time_idx, None)
    }

    fn value_scaled(
        &self,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
        notional_scales: Option<&[f64]>,
    ) -> Result<f64, EngineError> {
        let t = sim.grid().time(time_idx);
        let mut total = 0.0;
        for (i, (period, flow)) in self.periods.iter().zip(&self.flows).enumerate() {
            if period.payment_time <= t {
                continue;
            }
            let amount = flow.amount(period, sim, context, path, time_idx)?;
            let df = context.zero_bond(&self.discount_key, sim, path, time_idx, period.payment_time)?;
            let scale = notional_scales.map_or(1.0, |s| s[i]);
            total += self.notionals[i] * scale * amount * df;
        }
        let fx = match self.fx_key {
            Some(pair) => context.fx(pair, sim, path, time_idx)?,
            None => 1.0,
        };
        Ok(self.sign.factor() * fx * total)
    }
}

/// Mark-to-market cross-currency leg: a wrapped leg whose per-period
/// notionals are rescaled by the FX fixing observed at each period's
/// reset time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MtmLeg {
    leg: Leg,
    reset_pair: CurrencyPair,
    reset_times: Vec<f64>,
}

impl MtmLeg {
    /// Wraps a leg with an FX reset schedule, one reset per flow.
    ///
    /// # Errors
    ///
    /// [`DimensionError::LengthMismatch`] if the reset schedule does
    /// not have one entry per cash flow.
    pub fn new(
        leg: Leg,
        reset_pair: CurrencyPair,
        reset_times: Vec<f64>,
    ) -> Result<Self, EngineError> {
        if reset_times.len() != leg.flows.len() {
            return Err(DimensionError::LengthMismatch {
                what: "mtm reset schedule".to_string(),
                got: reset_times.len(),
                expected: leg.flows.len(),
            }
            .into());
        }
        Ok(Self {
            leg,
            reset_pair,
            reset_times,
        })
    }

    /// The wrapped leg.
    #[inline]
    pub fn leg(&self) -> &Leg {
        &self.leg
    }

    /// Value with the per-period FX-reset notional rescaling applied.
    pub fn value(
        &self,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        let mut scales = Vec::with_capacity(self.reset_times.len());
        for &reset in &self.reset_times {
            scales.push(context.forward_fx(self.reset_pair, reset)?);
        }
        self.leg
            .value_scaled(sim, context, path, time_idx, Some(&scales))
    }
}
