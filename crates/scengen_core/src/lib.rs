//! # Scengen Core (L1: Foundation)
//!
//! Shared building blocks for the scenario-generation workspace:
//!
//! - `types/` - currencies, the simulation time grid, and the error
//!   taxonomy used across all layers
//! - `market_data/` - yield-curve trait and concrete curves
//! - `math/` - correlation validation, Cholesky factors, and the
//!   inverse normal CDF used for quasi-random increments
//!
//! Everything in this crate is deterministic and allocation-light;
//! the stochastic machinery lives in `scengen_models` and above.

#![warn(missing_docs)]

pub mod market_data;
pub mod math;
pub mod types;

pub use market_data::curves::{Curve, FlatCurve, InterpolatedCurve, YieldCurve};
pub use types::error::{ConfigurationError, DimensionError, EngineError, NumericalError};
pub use types::time::TimeGrid;
pub use types::{Currency, CurrencyPair};
