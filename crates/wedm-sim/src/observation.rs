//! Per-step results handed to external consumers.

use serde::{Deserialize, Serialize};
use wedm_physics::{CurrentMode, SparkState};

/// Read-only view of the record taken on control steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time_us: u64,
    pub time_since_voltage_change_us: u64,
    pub time_since_spark_ignition_us: u64,
    pub time_since_spark_end_us: u64,

    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub target_voltage: Option<f64>,
    pub current_mode: Option<CurrentMode>,
    pub on_time_us: Option<f64>,
    pub off_time_us: Option<f64>,
    pub servo_delta: f64,

    pub spark_state: SparkState,
    pub spark_location_mm: Option<f64>,
    pub spark_duration_us: u32,

    pub workpiece_position_um: f64,
    pub wire_position_um: f64,
    pub gap_um: f64,
    pub wire_velocity_um_per_s: f64,

    pub wire_mean_temperature_k: f64,
    pub wire_max_temperature_k: f64,

    pub debris_volume_um3: f64,
    pub debris_density: f64,
    pub flow_condition: f64,

    pub is_short_circuit: bool,
    /// Sparks started since reset
    pub spark_count: u64,
    /// Short-circuit pulses started since reset
    pub short_count: u64,
}

/// Result of one base step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub wire_broken: bool,
    pub target_reached: bool,
    pub wire_colliding: bool,
    pub spark_state: SparkState,
    pub time_us: u64,
    pub is_control_step: bool,
    pub terminated: bool,
    /// Present on control steps only
    pub snapshot: Option<Snapshot>,
}

impl StepOutcome {
    /// Integer tag of the spark state (idle=0, spark=1, short=-1, rest=-2).
    pub fn spark_state_code(&self) -> i8 {
        self.spark_state.code()
    }
}
