//! Market data: yield curves consumed as immutable term structures.
//!
//! The engine's external market-data interface is deliberately thin:
//! curves are built from (tenor, rate) pairs or a flat rate and are
//! read-only thereafter.

pub mod curves;
pub mod error;

pub use curves::{Curve, FlatCurve, InterpolatedCurve, YieldCurve};
pub use error::CurveError;
