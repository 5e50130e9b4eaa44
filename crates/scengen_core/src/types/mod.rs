//! Core types shared across the workspace.

pub mod currency;
pub mod error;
pub mod time;

pub use currency::{Currency, CurrencyPair};
pub use error::{ConfigurationError, DimensionError, EngineError, NumericalError};
pub use time::TimeGrid;
