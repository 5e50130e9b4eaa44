//! Market context: symbolic curve keys bound to model state.
//!
//! Trade definitions reference curves symbolically as
//! (currency, optional index name). The context resolves these keys
//! through a two-level binding table - currency first, then index
//! name, with a fallback to the currency-level default discount
//! curve when no index name is given - and answers rate and
//! discount-factor queries at any simulated (path, time) point.
//!
//! Every non-domestic or index curve is priced as a deterministic
//! spread over the common simulated factor state: the stochastic
//! part of `P(t, T)` comes from the model, the curve only supplies
//! the initial term structure it reconstitutes against. FX forwards
//! are deterministic (covered interest parity off the currency
//! default curves); the binding table leaves room for a stochastic
//! FX state later.

use std::collections::HashMap;

use scengen_core::market_data::curves::{Curve, YieldCurve};
use scengen_core::types::error::{ConfigurationError, EngineError};
use scengen_core::types::{Currency, CurrencyPair};
use scengen_models::{GaussianHjmModel, Simulation};

/// Symbolic curve key: a currency plus an optional index name.
///
/// A key without an index name resolves to the currency's default
/// discount curve; a named key resolves to that index's projection
/// curve and never falls back silently.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CurveKey {
    /// Currency level of the binding table.
    pub currency: Currency,
    /// Index name, e.g. `"EURIBOR6M"`; `None` selects the default
    /// discount curve.
    pub index: Option<String>,
}

impl CurveKey {
    /// Key for a currency's default discount curve.
    #[inline]
    pub fn discount(currency: Currency) -> Self {
        Self {
            currency,
            index: None,
        }
    }

    /// Key for a named index curve under a currency.
    #[inline]
    pub fn index(currency: Currency, name: impl Into<String>) -> Self {
        Self {
            currency,
            index: Some(name.into()),
        }
    }
}

#[derive(Clone, Debug)]
struct CurrencySection {
    default: Curve,
    indices: HashMap<String, Curve>,
}

/// Read-only binding of symbolic keys to model state and curves.
///
/// Built once from a model and a set of term structures; all
/// binding failures surface at build time as [`ConfigurationError`].
///
/// # Examples
///
/// ```
/// use scengen_core::market_data::curves::Curve;
/// use scengen_core::types::Currency;
/// use scengen_engine::{CurveKey, MarketContext};
/// use scengen_models::{GaussianHjmModel, GaussianHjmParams, HjmFactor};
///
/// let model = GaussianHjmModel::new(GaussianHjmParams {
///     factors: vec![HjmFactor::constant(0.03, 0.008).unwrap()],
///     benchmark_tenors: vec![1.0],
///     correlation: vec![vec![1.0]],
///     initial_curve: Curve::flat(0.02),
/// })
/// .unwrap();
///
/// let context = MarketContext::new(model, Currency::EUR)
///     .with_index_curve(Currency::EUR, "EURIBOR6M", Curve::flat(0.025))
///     .unwrap();
/// assert!(context.resolve(&CurveKey::discount(Currency::EUR)).is_ok());
/// assert!(context.resolve(&CurveKey::discount(Currency::USD)).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct MarketContext {
    model: GaussianHjmModel,
    domestic: Currency,
    curves: HashMap<Currency, CurrencySection>,
    // Spot quoted as units of `quote` per unit of `base`.
    fx_spots: HashMap<CurrencyPair, f64>,
}

impl MarketContext {
    /// Creates a context with the model's initial curve bound as the
    /// domestic currency's default discount curve.
    pub fn new(model: GaussianHjmModel, domestic: Currency) -> Self {
        let mut curves = HashMap::new();
        curves.insert(
            domestic,
            CurrencySection {
                default: model.initial_curve().clone(),
                indices: HashMap::new(),
            },
        );
        Self {
            model,
            domestic,
            curves,
            fx_spots: HashMap::new(),
        }
    }

    /// Registers a foreign currency with its default discount curve
    /// and spot rate against the domestic currency.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::OutOfDomain`] for a non-positive or
    /// non-finite spot.
    pub fn with_currency(
        mut self,
        currency: Currency,
        curve: Curve,
        spot_vs_domestic: f64,
    ) -> Result<Self, ConfigurationError> {
        if !spot_vs_domestic.is_finite() || spot_vs_domestic <= 0.0 {
            return Err(ConfigurationError::OutOfDomain {
                key: format!("fx_spot[{}/{}]", currency, self.domestic),
                value: spot_vs_domestic,
                constraint: "must be finite and > 0".to_string(),
            });
        }
        self.curves.insert(
            currency,
            CurrencySection {
                default: curve,
                indices: HashMap::new(),
            },
        );
        self.fx_spots
            .insert(CurrencyPair::new(currency, self.domestic), spot_vs_domestic);
        Ok(self)
    }

    /// Binds a named index curve under an already-registered
    /// currency.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnresolvableKey`] if the currency has
    /// not been registered first.
    pub fn with_index_curve(
        mut self,
        currency: Currency,
        name: impl Into<String>,
        curve: Curve,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let section = self
            .curves
            .get_mut(&currency)
            .ok_or_else(|| ConfigurationError::UnresolvableKey(format!("{currency}")))?;
        section.indices.insert(name, curve);
        Ok(self)
    }

    /// The bound model.
    #[inline]
    pub fn model(&self) -> &GaussianHjmModel {
        &self.model
    }

    /// The domestic (numeraire) currency.
    #[inline]
    pub fn domestic(&self) -> Currency {
        self.domestic
    }

    /// Resolves a key through the binding table.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnresolvableKey`] for an unregistered
    /// currency or unknown index name.
    pub fn resolve(&self, key: &CurveKey) -> Result<&Curve, ConfigurationError> {
        let section = self
            .curves
            .get(&key.currency)
            .ok_or_else(|| ConfigurationError::UnresolvableKey(format!("{}", key.currency)))?;
        match &key.index {
            None => Ok(&section.default),
            Some(name) => section.indices.get(name).ok_or_else(|| {
                ConfigurationError::UnresolvableKey(format!("{}:{}", key.currency, name))
            }),
        }
    }

    /// Zero-coupon bond `P(t, maturity)` on the resolved curve at the
    /// simulated state of (path, grid time).
    pub fn zero_bond(
        &self,
        key: &CurveKey,
        sim: &Simulation,
        path: usize,
        time_idx: usize,
        maturity: f64,
    ) -> Result<f64, EngineError> {
        let curve = self.resolve(key)?;
        let t = sim.grid().time(time_idx);
        let factors = sim.factors(path, time_idx);
        self.model
            .zero_bond(t, maturity, &factors, sim.y(time_idx), curve)
    }

    /// Path-wise discount factor from time 0 to the grid time, on
    /// the resolved curve.
    ///
    /// The stochastic part is the bank-account deflator
    /// `exp(-s(t))`; a non-model curve contributes its deterministic
    /// spread over the model's initial term structure.
    pub fn discount_factor(
        &self,
        key: &CurveKey,
        sim: &Simulation,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        let curve = self.resolve(key)?;
        let t = sim.grid().time(time_idx);
        let deflator = (-sim.integrated_rate(path, time_idx)).exp();
        let spread = curve.discount_factor(t)? / self.model.initial_curve().discount_factor(t)?;
        Ok(deflator * spread)
    }

    /// Simply-compounded forward rate over `[start, end]` observed at
    /// the grid time on the resolved curve.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::OutOfDomain`] if `end <= start`.
    pub fn forward_rate(
        &self,
        key: &CurveKey,
        sim: &Simulation,
        path: usize,
        time_idx: usize,
        start: f64,
        end: f64,
    ) -> Result<f64, EngineError> {
        if end <= start {
            return Err(ConfigurationError::OutOfDomain {
                key: "forward_rate.end".to_string(),
                value: end,
                constraint: format!("must be > start {start}"),
            }
            .into());
        }
        let p_start = self.zero_bond(key, sim, path, time_idx, start)?;
        let p_end = self.zero_bond(key, sim, path, time_idx, end)?;
        Ok((p_start / p_end - 1.0) / (end - start))
    }

    /// Short rate at the simulated (path, grid time) state.
    pub fn short_rate(
        &self,
        sim: &Simulation,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        let t = sim.grid().time(time_idx);
        let factors = sim.factors(path, time_idx);
        self.model.short_rate(t, &factors)
    }

    /// Bank-account numeraire `N(t)` along a path.
    #[inline]
    pub fn numeraire(&self, sim: &Simulation, path: usize, time_idx: usize) -> f64 {
        sim.numeraire(path, time_idx)
    }

    /// FX rate for `pair` at the simulated (path, grid time) point.
    ///
    /// Currently a deterministic forward; the path argument is part
    /// of the contract so a stochastic FX state can slot in without
    /// touching call sites.
    pub fn fx(
        &self,
        pair: CurrencyPair,
        sim: &Simulation,
        _path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        self.forward_fx(pair, sim.grid().time(time_idx))
    }

    /// Deterministic forward FX rate at time `t` via covered interest
    /// parity: `F(t) = S * D_base(t) / D_quote(t)` off the currency
    /// default curves.
    pub fn forward_fx(&self, pair: CurrencyPair, t: f64) -> Result<f64, EngineError> {
        if pair.is_identity() {
            return Ok(1.0);
        }
        let spot = self.spot(pair)?;
        let d_base = self
            .resolve(&CurveKey::discount(pair.base))?
            .discount_factor(t)?;
        let d_quote = self
            .resolve(&CurveKey::discount(pair.quote))?
            .discount_factor(t)?;
        Ok(spot * d_base / d_quote)
    }

    /// Spot rate for a pair, derived from the registered
    /// versus-domestic quotes (direct, inverted or crossed).
    pub fn spot(&self, pair: CurrencyPair) -> Result<f64, ConfigurationError> {
        if pair.is_identity() {
            return Ok(1.0);
        }
        if let Some(&s) = self.fx_spots.get(&pair) {
            return Ok(s);
        }
        if let Some(&s) = self.fx_spots.get(&pair.inverse()) {
            return Ok(1.0 / s);
        }
        let base_dom = self
            .fx_spots
            .get(&CurrencyPair::new(pair.base, self.domestic))
            .copied()
            .or(if pair.base == self.domestic {
                Some(1.0)
            } else {
                None
            });
        let quote_dom = self
            .fx_spots
            .get(&CurrencyPair::new(pair.quote, self.domestic))
            .copied()
            .or(if pair.quote == self.domestic {
                Some(1.0)
            } else {
                None
            });
        match (base_dom, quote_dom) {
            (Some(b), Some(q)) => Ok(b / q),
            _ => Err(ConfigurationError::UnresolvableKey(format!(
                "fx pair {pair}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scengen_core::types::TimeGrid;
    use scengen_models::{simulate, GaussianHjmParams, HjmFactor, PseudoRandomSource};

    fn model(rate: f64) -> GaussianHjmModel {
        GaussianHjmModel::new(GaussianHjmParams {
            factors: vec![HjmFactor::constant(0.05, 0.01).unwrap()],
            benchmark_tenors: vec![1.0],
            correlation: vec![vec![1.0]],
            initial_curve: Curve::flat(rate),
        })
        .unwrap()
    }

    fn small_simulation(m: &GaussianHjmModel) -> Simulation {
        let grid = TimeGrid::uniform(2.0, 4).unwrap();
        simulate(m, &grid, 8, &PseudoRandomSource::new(1, 3)).unwrap()
    }

    fn eur_usd_context(domestic_rate: f64, foreign_rate: f64, spot: f64) -> MarketContext {
        MarketContext::new(model(domestic_rate), Currency::EUR)
            .with_currency(Currency::USD, Curve::flat(foreign_rate), spot)
            .unwrap()
    }

    #[test]
    fn default_key_falls_back_to_currency_curve() {
        let context = MarketContext::new(model(0.02), Currency::EUR);
        assert!(context.resolve(&CurveKey::discount(Currency::EUR)).is_ok());
    }

    #[test]
    fn named_index_never_falls_back() {
        let context = MarketContext::new(model(0.02), Currency::EUR);
        let err = context.resolve(&CurveKey::index(Currency::EUR, "EURIBOR6M"));
        assert!(matches!(err, Err(ConfigurationError::UnresolvableKey(_))));
    }

    #[test]
    fn index_curve_resolves_distinctly_from_default() {
        let context = MarketContext::new(model(0.02), Currency::EUR)
            .with_index_curve(Currency::EUR, "EURIBOR6M", Curve::flat(0.025))
            .unwrap();
        let default = context.resolve(&CurveKey::discount(Currency::EUR)).unwrap();
        let index = context
            .resolve(&CurveKey::index(Currency::EUR, "EURIBOR6M"))
            .unwrap();
        assert_relative_eq!(default.discount_factor(1.0).unwrap(), (-0.02_f64).exp());
        assert_relative_eq!(index.discount_factor(1.0).unwrap(), (-0.025_f64).exp());
    }

    #[test]
    fn index_curve_requires_registered_currency() {
        let result = MarketContext::new(model(0.02), Currency::EUR).with_index_curve(
            Currency::USD,
            "SOFR",
            Curve::flat(0.03),
        );
        assert!(result.is_err());
    }

    #[test]
    fn zero_bond_at_time_zero_matches_curve() {
        let m = model(0.02);
        let sim = small_simulation(&m);
        let context = MarketContext::new(m, Currency::EUR);
        let p = context
            .zero_bond(&CurveKey::discount(Currency::EUR), &sim, 0, 0, 1.5)
            .unwrap();
        assert_relative_eq!(p, (-0.02_f64 * 1.5).exp(), epsilon = 1e-10);
    }

    #[test]
    fn forward_rate_recovers_flat_curve_at_origin() {
        let m = model(0.02);
        let sim = small_simulation(&m);
        let context = MarketContext::new(m, Currency::EUR);
        let f = context
            .forward_rate(&CurveKey::discount(Currency::EUR), &sim, 0, 0, 1.0, 2.0)
            .unwrap();
        // Simple forward of a flat continuous 2% curve.
        assert_relative_eq!(f, (0.02_f64).exp() - 1.0, epsilon = 1e-10);
    }

    #[test]
    fn forward_rate_rejects_inverted_window() {
        let m = model(0.02);
        let sim = small_simulation(&m);
        let context = MarketContext::new(m, Currency::EUR);
        assert!(context
            .forward_rate(&CurveKey::discount(Currency::EUR), &sim, 0, 0, 2.0, 1.0)
            .is_err());
    }

    #[test]
    fn forward_fx_satisfies_interest_parity() {
        let context = eur_usd_context(0.02, 0.05, 1.10);
        let pair = CurrencyPair::new(Currency::USD, Currency::EUR);
        let f = context.forward_fx(pair, 1.0).unwrap();
        assert_relative_eq!(
            f,
            1.10 * (-0.05_f64).exp() / (-0.02_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn spot_inverts_and_crosses() {
        let context = eur_usd_context(0.02, 0.05, 1.10)
            .with_currency(Currency::GBP, Curve::flat(0.04), 0.85)
            .unwrap();
        let usd_eur = context
            .spot(CurrencyPair::new(Currency::USD, Currency::EUR))
            .unwrap();
        let eur_usd = context
            .spot(CurrencyPair::new(Currency::EUR, Currency::USD))
            .unwrap();
        assert_relative_eq!(usd_eur * eur_usd, 1.0, epsilon = 1e-12);
        let usd_gbp = context
            .spot(CurrencyPair::new(Currency::USD, Currency::GBP))
            .unwrap();
        assert_relative_eq!(usd_gbp, 1.10 / 0.85, epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_spot() {
        let result =
            MarketContext::new(model(0.02), Currency::EUR).with_currency(
                Currency::USD,
                Curve::flat(0.05),
                -1.0,
            );
        assert!(result.is_err());
    }

    #[test]
    fn discount_factor_spread_over_model_curve() {
        let m = model(0.02);
        let sim = small_simulation(&m);
        let context = MarketContext::new(m, Currency::EUR)
            .with_index_curve(Currency::EUR, "OIS", Curve::flat(0.015))
            .unwrap();
        let t_idx = 2;
        let t = sim.grid().time(t_idx);
        let model_df = context
            .discount_factor(&CurveKey::discount(Currency::EUR), &sim, 0, t_idx)
            .unwrap();
        let ois_df = context
            .discount_factor(&CurveKey::index(Currency::EUR, "OIS"), &sim, 0, t_idx)
            .unwrap();
        let expected_spread = (-0.015_f64 * t).exp() / (-0.02_f64 * t).exp();
        assert_relative_eq!(ois_df / model_df, expected_spread, epsilon = 1e-12);
    }
}
