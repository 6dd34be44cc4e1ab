//! Result data types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ResultsError;

pub type RunId = String;

/// Scalar signals that can be traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Voltage,
    Current,
    SparkState,
    WorkpiecePosition,
    WirePosition,
    Gap,
    WireVelocity,
    WireMeanTemperature,
    WireMaxTemperature,
    DebrisVolume,
    DebrisDensity,
    FlowCondition,
    IsShortCircuit,
    ServoDelta,
}

impl Signal {
    pub const ALL: [Signal; 14] = [
        Signal::Voltage,
        Signal::Current,
        Signal::SparkState,
        Signal::WorkpiecePosition,
        Signal::WirePosition,
        Signal::Gap,
        Signal::WireVelocity,
        Signal::WireMeanTemperature,
        Signal::WireMaxTemperature,
        Signal::DebrisVolume,
        Signal::DebrisDensity,
        Signal::FlowCondition,
        Signal::IsShortCircuit,
        Signal::ServoDelta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::Voltage => "voltage",
            Signal::Current => "current",
            Signal::SparkState => "spark_state",
            Signal::WorkpiecePosition => "workpiece_position",
            Signal::WirePosition => "wire_position",
            Signal::Gap => "gap",
            Signal::WireVelocity => "wire_velocity",
            Signal::WireMeanTemperature => "wire_mean_temperature",
            Signal::WireMaxTemperature => "wire_max_temperature",
            Signal::DebrisVolume => "debris_volume",
            Signal::DebrisDensity => "debris_density",
            Signal::FlowCondition => "flow_condition",
            Signal::IsShortCircuit => "is_short_circuit",
            Signal::ServoDelta => "servo_delta",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::ALL
            .into_iter()
            .find(|sig| sig.name() == s.trim())
            .ok_or_else(|| ResultsError::UnknownSignal {
                name: s.to_string(),
            })
    }
}

/// When the recorder samples the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFrequency {
    EveryStep,
    #[default]
    ControlStep,
    /// Every n-th microsecond of simulated time
    Interval(u64),
}

impl FromStr for LogFrequency {
    type Err = ResultsError;

    /// `every_step`, `control_step` or a positive integer interval in µs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "every_step" => Ok(LogFrequency::EveryStep),
            "control_step" => Ok(LogFrequency::ControlStep),
            other => match other.parse::<u64>() {
                Ok(n) if n > 0 => Ok(LogFrequency::Interval(n)),
                _ => Err(ResultsError::InvalidLogFrequency {
                    value: other.to_string(),
                }),
            },
        }
    }
}

/// What the recorder captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpec {
    pub signals: Vec<Signal>,
    /// Also store the full wire temperature field per row
    #[serde(default)]
    pub temperature_field: bool,
    #[serde(default)]
    pub frequency: LogFrequency,
}

impl Default for TraceSpec {
    fn default() -> Self {
        Self {
            signals: Signal::ALL.to_vec(),
            temperature_field: false,
            frequency: LogFrequency::ControlStep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub time_us: u64,
    pub is_control_step: bool,
    pub values: BTreeMap<Signal, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_field: Option<Vec<f64>>,
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    TargetReached,
    WireBroken,
    WireCollision,
    StepLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub label: String,
    pub timestamp: String,
    pub seed: u64,
    pub max_steps: u64,
    pub steps_run: u64,
    pub outcome: RunOutcome,
    pub spark_count: u64,
    pub short_count: u64,
    pub trace: TraceSpec,
    /// Simulated time over wall time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_factor: Option<f64>,
}
