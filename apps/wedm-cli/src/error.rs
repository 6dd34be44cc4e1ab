use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Physics(#[from] wedm_physics::PhysicsError),

    #[error(transparent)]
    Sim(#[from] wedm_sim::SimError),

    #[error(transparent)]
    Results(#[from] wedm_results::ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
