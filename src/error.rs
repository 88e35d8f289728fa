use crate::config::ConfigError;
use crate::numerics::solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("time step {step} failed: {source}")]
    StepFailed { step: usize, source: SolverError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimulationResult<T> = Result<T, SimulationError>;
