//! Multi-factor Gaussian HJM term-structure model.

mod model;
mod params;

pub use model::{GaussianHjmModel, StepTransition};
pub use params::{GaussianHjmParams, HjmFactor};
