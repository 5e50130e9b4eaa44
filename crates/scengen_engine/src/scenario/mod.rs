//! Scenario generation: the cube and the engine filling it.

mod cube;
mod engine;

pub use cube::{ScenarioCube, NETTING_ALIAS};
pub use engine::{scenarios, ScenarioLeg};
