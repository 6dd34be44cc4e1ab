//! Physics sub-models for the wire-EDM kernel.
//!
//! Every model reads and mutates one shared [`SimRecord`] once per microsecond.
//! Each field of the record has exactly one writer (see the field docs in
//! [`record`]); reads across module boundaries are free.
//!
//! Update order is fixed by the orchestrator in `wedm-sim`:
//!
//! ```text
//! Ignition -> MaterialRemoval -> Dielectric -> WireThermal -> Mechanics
//! ```
//!
//! Randomness comes from one [`SimRng`] threaded through every `update` call,
//! so a seed fully determines a trajectory.

pub mod dielectric;
pub mod error;
pub mod geometry;
pub mod ignition;
pub mod material;
pub mod mechanics;
pub mod record;
pub mod rng;
pub mod tables;
pub mod traits;
pub mod wire;

pub use dielectric::{DielectricConfig, DielectricModule};
pub use error::{PhysicsError, PhysicsResult};
pub use geometry::ProcessGeometry;
pub use ignition::{IgnitionConfig, IgnitionModule, ShortCircuitStatus, lambda_closed_form};
pub use material::{MaterialConfig, MaterialRemovalModule};
pub use mechanics::{ControlMode, MechanicsConfig, MechanicsModule};
pub use record::{SimRecord, SparkState, SparkStatus};
pub use rng::{SimRng, seeded_rng};
pub use tables::{CraterStats, CurrentMode, Lookup, ProcessTables};
pub use traits::ProcessModule;
pub use wire::{WireConfig, WireThermalModule};
