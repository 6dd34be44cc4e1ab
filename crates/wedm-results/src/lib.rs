//! wedm-results: trace recording and on-disk run storage.

pub mod episode;
pub mod hash;
pub mod recorder;
pub mod store;
pub mod types;

pub use episode::{RecordedRun, record_episode};
pub use hash::compute_run_id;
pub use recorder::TraceRecorder;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sim(#[from] wedm_sim::SimError),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Unknown signal: {name}")]
    UnknownSignal { name: String },

    #[error("Invalid log frequency '{value}' (expected every_step, control_step or an interval in us)")]
    InvalidLogFrequency { value: String },
}
