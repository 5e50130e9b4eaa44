//! # Scengen Models (L2: Factor Model + Path Simulator)
//!
//! The stochastic heart of the workspace:
//!
//! - `hjm/` - multi-factor Gaussian HJM term-structure model with
//!   exact transition moments and zero-bond reconstitution
//! - `simulation/` - increment sources (pseudo-random and Sobol)
//!   and the path simulator producing the immutable [`Simulation`]
//!   state cube
//!
//! Simulation output is deterministic for a fixed (model, grid,
//! path count, increment-source seed) tuple, which downstream AMC
//! regression reuse depends on.

#![warn(missing_docs)]

pub mod hjm;
pub mod simulation;

pub use hjm::{GaussianHjmModel, GaussianHjmParams, HjmFactor};
pub use simulation::{
    simulate, IncrementSource, PseudoRandomSource, Simulation, SobolSource,
};
