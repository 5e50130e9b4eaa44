//! # Scengen Engine (L3: Valuation)
//!
//! Turns simulated model states into path-wise valuations:
//!
//! - `context/` - symbolic curve-key resolution against the model
//!   state and deterministic forward FX
//! - `cashflows/` - closed cash-flow variants, legs and
//!   mark-to-market cross-currency legs
//! - `amc/` - regression bases and least-squares continuation-value
//!   fitting for American Monte Carlo
//! - `bermudan/` - two-phase Bermudan instruments (unfit, then
//!   sealed after backward-induction calibration)
//! - `scenario/` - the scenario engine producing immutable
//!   [`ScenarioCube`]s over (path, time, leg)
//!
//! All valuation functions take the path index, time index and
//! context explicitly; there is no implicit "current path" state.

#![warn(missing_docs)]

pub mod amc;
pub mod bermudan;
pub mod cashflows;
pub mod context;
pub mod scenario;

pub use amc::{fit_regression, RegressionBasis, RegressionFn};
pub use bermudan::{BermudanInstrument, Exercise, FittedBermudan, Position, RegressorSpec};
pub use cashflows::{CashFlow, Compounding, Leg, MtmLeg, Period, Sign};
pub use context::{CurveKey, MarketContext};
pub use scenario::{scenarios, ScenarioCube, ScenarioLeg, NETTING_ALIAS};
