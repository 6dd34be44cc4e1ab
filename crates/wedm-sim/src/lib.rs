//! Step orchestrator for the wire-EDM kernel.
//!
//! Provides:
//! - `SimConfig`: serde configuration for the process and every model
//! - `Command`: generator and servo settings applied on control steps
//! - `WireEdmSim`: the 1 µs / control-step state machine
//! - `StepOutcome` / `Snapshot`: per-step results for external consumers

pub mod command;
pub mod config;
pub mod error;
pub mod observation;
pub mod sim;

pub use command::Command;
pub use config::{ProcessConfig, SimConfig};
pub use error::{SimError, SimResult};
pub use observation::{Snapshot, StepOutcome};
pub use sim::WireEdmSim;
