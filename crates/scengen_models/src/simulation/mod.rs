//! Path simulation: increment sources and the state cube.

mod increments;
mod simulate;
mod sobol;

pub use increments::{IncrementSource, PseudoRandomSource};
pub use simulate::{simulate, Simulation};
pub use sobol::SobolSequence;

pub use increments::SobolSource;
