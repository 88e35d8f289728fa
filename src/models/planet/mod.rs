pub mod params;
pub mod simulator;

pub use params::{PhysicalParams, PlanetParams};
pub use simulator::{MarchState, PlanetHeatSimulator, StepRecord};
