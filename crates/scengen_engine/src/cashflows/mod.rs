//! Cash flows, legs and mark-to-market cross-currency legs.

mod flow;
mod leg;

pub use flow::{CashFlow, Compounding, Period};
pub use leg::{Leg, MtmLeg, Sign};
