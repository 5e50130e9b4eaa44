//! # Scengen Exposure (L4: Risk Analytics)
//!
//! Consumers of scenario cubes:
//!
//! - `collateral/` - margin-balance simulation under CSA terms
//!   (threshold, minimum transfer amount, independent amount and
//!   margin period of risk)
//! - `exposure/` - pure reductions of cubes to exposure profiles
//!   (EE, ENE, EPE, PFE, peak PFE)
//!
//! Nothing here mutates an input cube; collateralization returns a
//! new cube with the balance appended as an extra leg.

#![warn(missing_docs)]

pub mod collateral;
pub mod exposure;

pub use collateral::{collateralize, CsaTerms};
pub use exposure::ExposureCalculator;
