//! The shared simulation record.
//!
//! One mutable aggregate holds every piece of physical and bookkeeping state.
//! It is owned by the orchestrator and lent `&mut` to each model for the
//! duration of its `update` call. Field ownership (single writer) is noted on
//! every group below; any module may read any field.

use crate::error::PhysicsError;
use crate::tables::CurrentMode;
use serde::{Deserialize, Serialize};

/// Tag of the ignition state machine. Serialized as its integer code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum SparkState {
    #[default]
    Idle,
    Spark,
    Short,
    Rest,
}

impl SparkState {
    /// Integer code used by external consumers: idle=0, spark=1, short=-1, rest=-2.
    pub fn code(self) -> i8 {
        match self {
            SparkState::Idle => 0,
            SparkState::Spark => 1,
            SparkState::Short => -1,
            SparkState::Rest => -2,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(SparkState::Idle),
            1 => Some(SparkState::Spark),
            -1 => Some(SparkState::Short),
            -2 => Some(SparkState::Rest),
            _ => None,
        }
    }

    /// Legal transitions: 0→1, 0→-1, 1→-2, -1→-2, -2→0 (and staying put).
    pub fn can_transition_to(self, next: SparkState) -> bool {
        use SparkState::*;
        self == next
            || matches!(
                (self, next),
                (Idle, Spark) | (Idle, Short) | (Spark, Rest) | (Short, Rest) | (Rest, Idle)
            )
    }

    /// Spark or short: a pulse is being delivered.
    pub fn is_pulse(self) -> bool {
        matches!(self, SparkState::Spark | SparkState::Short)
    }
}

impl From<SparkState> for i8 {
    fn from(state: SparkState) -> Self {
        state.code()
    }
}

impl TryFrom<i8> for SparkState {
    type Error = PhysicsError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        SparkState::from_code(code).ok_or(PhysicsError::InvalidSparkCode { code })
    }
}

/// (state tag, spark axial location, duration in state).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparkStatus {
    pub state: SparkState,
    /// Axial location along the workpiece height (mm), only for sparks
    pub location_mm: Option<f64>,
    /// Microseconds spent in the current pulse cycle
    pub duration_us: u32,
}

impl SparkStatus {
    pub const IDLE: SparkStatus = SparkStatus {
        state: SparkState::Idle,
        location_mm: None,
        duration_us: 0,
    };

    /// A pulse that was started during this very step.
    pub fn is_fresh_pulse(&self) -> bool {
        self.state.is_pulse() && self.duration_us == 0
    }
}

/// Global process state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    // Time bookkeeping (µs). Writer: orchestrator.
    pub time_us: u64,
    pub time_since_servo_us: u64,
    pub time_since_voltage_change_us: u64,
    pub time_since_spark_ignition_us: u64,
    pub time_since_spark_end_us: u64,

    // Electrical. Writer: ignition. `None` until the first ignition update.
    pub voltage: Option<f64>,
    pub current: Option<f64>,

    // Commanded generator / servo targets. Writer: orchestrator.
    pub target_voltage: Option<f64>,
    pub current_mode: Option<CurrentMode>,
    pub on_time_us: Option<f64>,
    pub off_time_us: Option<f64>,
    pub servo_delta: f64,
    pub target_position_um: f64,

    // Kinematics (µm, µm/s). Writers: material removal (workpiece),
    // mechanics (wire position / velocity), orchestrator at reset (unwind).
    pub workpiece_position_um: f64,
    pub wire_position_um: f64,
    pub wire_velocity_um_per_s: f64,
    pub wire_unwind_velocity_um_per_us: f64,

    // Thermal field (K). Writer: wire thermal. Length fixed for the episode.
    pub wire_temperature_k: Vec<f64>,
    pub wire_mean_temperature_k: Option<f64>,
    pub time_in_critical_temp_us: u64,

    // Spark state machine. Writer: ignition.
    pub spark_status: SparkStatus,

    // Crater sampled this step (µm³, zero when no fresh pulse). Writer: material removal.
    pub last_crater_volume_um3: f64,

    // Dielectric. Writer: dielectric.
    pub debris_volume_um3: f64,
    pub debris_density: f64,
    pub cavity_volume_um3: f64,
    pub flow_condition: f64,
    pub dielectric_temperature_k: f64,

    // Process flags. Short circuit: ignition. Wire broken: wire thermal.
    // Colliding / target reached: orchestrator. Terminal flags are never cleared.
    pub is_short_circuit: bool,
    pub is_wire_broken: bool,
    pub is_wire_colliding: bool,
    pub is_target_reached: bool,
}

impl SimRecord {
    /// Distance from the wire to the workpiece face (µm). Negative on overrun.
    #[inline]
    pub fn gap_um(&self) -> f64 {
        self.workpiece_position_um - self.wire_position_um
    }

    pub fn is_terminal(&self) -> bool {
        self.is_wire_broken || self.is_wire_colliding || self.is_target_reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for s in [
            SparkState::Idle,
            SparkState::Spark,
            SparkState::Short,
            SparkState::Rest,
        ] {
            assert_eq!(SparkState::from_code(s.code()), Some(s));
        }
        assert_eq!(SparkState::from_code(3), None);
    }

    #[test]
    fn spark_state_serializes_as_code() {
        assert_eq!(serde_json::to_string(&SparkState::Short).unwrap(), "-1");
        let back: SparkState = serde_json::from_str("-2").unwrap();
        assert_eq!(back, SparkState::Rest);
        assert!(serde_json::from_str::<SparkState>("2").is_err());
        assert!(serde_json::from_str::<SparkState>("\"idle\"").is_err());
    }

    #[test]
    fn transition_graph() {
        use SparkState::*;
        assert!(Idle.can_transition_to(Spark));
        assert!(Idle.can_transition_to(Short));
        assert!(Spark.can_transition_to(Rest));
        assert!(Short.can_transition_to(Rest));
        assert!(Rest.can_transition_to(Idle));

        assert!(!Spark.can_transition_to(Idle));
        assert!(!Rest.can_transition_to(Spark));
        assert!(!Short.can_transition_to(Spark));
        assert!(!Idle.can_transition_to(Rest));
    }

    #[test]
    fn fresh_pulse_detection() {
        let mut s = SparkStatus {
            state: SparkState::Spark,
            location_mm: Some(1.0),
            duration_us: 0,
        };
        assert!(s.is_fresh_pulse());
        s.duration_us = 1;
        assert!(!s.is_fresh_pulse());
        assert!(!SparkStatus::IDLE.is_fresh_pulse());
    }

    #[test]
    fn gap_is_signed() {
        let rec = SimRecord {
            workpiece_position_um: 100.0,
            wire_position_um: 130.0,
            ..Default::default()
        };
        assert_eq!(rec.gap_um(), -30.0);
    }
}
