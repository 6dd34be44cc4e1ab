//! Error types for configuration and orchestration.

use thiserror::Error;
use wedm_physics::PhysicsError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Invalid command: {what}")]
    InvalidCommand { what: &'static str },

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<wedm_core::CoreError> for SimError {
    fn from(e: wedm_core::CoreError) -> Self {
        SimError::Physics(PhysicsError::from(e))
    }
}
