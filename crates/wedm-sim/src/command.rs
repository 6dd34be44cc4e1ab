//! Control command applied on control-step boundaries.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use wedm_physics::CurrentMode;

/// Servo and generator settings for one control interval.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    /// Position increment (µm) or velocity target (µm/s), per control mode
    pub servo_delta: f64,
    /// Open-circuit voltage (V)
    pub target_voltage: f64,
    pub current_mode: CurrentMode,
    /// Pulse ON time (µs); 0 selects the ignition default
    pub on_time_us: f64,
    /// Pulse OFF time (µs)
    pub off_time_us: f64,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            servo_delta: 0.0,
            target_voltage: 80.0,
            current_mode: CurrentMode::DEFAULT,
            on_time_us: 3.0,
            off_time_us: 80.0,
        }
    }
}

impl Command {
    pub fn with_servo_delta(self, servo_delta: f64) -> Self {
        Self {
            servo_delta,
            ..self
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.servo_delta.is_finite() {
            return Err(SimError::InvalidCommand {
                what: "servo_delta must be finite",
            });
        }
        if !self.target_voltage.is_finite() || self.target_voltage < 0.0 {
            return Err(SimError::InvalidCommand {
                what: "target_voltage must be finite and non-negative",
            });
        }
        if !self.on_time_us.is_finite() || self.on_time_us < 0.0 {
            return Err(SimError::InvalidCommand {
                what: "on_time_us must be finite and non-negative",
            });
        }
        if !self.off_time_us.is_finite() || self.off_time_us < 0.0 {
            return Err(SimError::InvalidCommand {
                what: "off_time_us must be finite and non-negative",
            });
        }
        Ok(())
    }
}
