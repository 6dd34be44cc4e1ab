//! Error types for physics model construction.
//!
//! Update paths are infallible; everything here is raised while building the
//! models or loading injected tables.

use thiserror::Error;
use wedm_core::CoreError;

pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Unknown control mode '{value}' (expected 'position' or 'velocity')")]
    UnknownControlMode { value: String },

    #[error("Invalid current mode '{value}'")]
    InvalidCurrentMode { value: String },

    #[error("Invalid spark state code {code} (expected 0, 1, -1 or -2)")]
    InvalidSparkCode { code: i8 },

    #[error("Process table error: {what}")]
    Table { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PhysicsError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        PhysicsError::InvalidConfig { what: what.into() }
    }
}
