//! Yield curve trait and implementations.

mod curve_enum;
mod flat;
mod interpolated;
mod traits;

pub use curve_enum::Curve;
pub use flat::FlatCurve;
pub use interpolated::InterpolatedCurve;
pub use traits::YieldCurve;
