//! Saturating second-order servo axis for the wire.

use crate::error::{PhysicsError, PhysicsResult};
use crate::record::SimRecord;
use crate::rng::SimRng;
use crate::traits::ProcessModule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wedm_core::ensure_positive;
use wedm_core::units::constants::BASE_STEP_US;
use wedm_core::units::{to_s, us};

/// How the commanded servo delta is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Delta is a relative position target (µm)
    #[default]
    Position,
    /// Delta is a velocity target (µm/s)
    Velocity,
}

impl FromStr for ControlMode {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "position" => Ok(ControlMode::Position),
            "velocity" => Ok(ControlMode::Velocity),
            _ => Err(PhysicsError::UnknownControlMode {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Position => f.write_str("position"),
            ControlMode::Velocity => f.write_str("velocity"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicsConfig {
    pub mode: ControlMode,
    /// Natural frequency (rad/s)
    pub omega_n: f64,
    /// Damping ratio (position mode only)
    pub zeta: f64,
    /// µm/s²
    pub max_accel: f64,
    /// µm/s³
    pub max_jerk: f64,
    /// µm/s
    pub max_speed: f64,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Position,
            omega_n: 200.0,
            zeta: 0.55,
            max_accel: 3.0e5,
            max_jerk: 1.0e8,
            max_speed: 3.0e4,
        }
    }
}

impl MechanicsConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_positive(self.omega_n, "omega_n must be positive")?;
        ensure_positive(self.zeta, "zeta must be positive")?;
        ensure_positive(self.max_accel, "max_accel must be positive")?;
        ensure_positive(self.max_jerk, "max_jerk must be positive")?;
        ensure_positive(self.max_speed, "max_speed must be positive")?;
        Ok(())
    }
}

/// Moves the wire toward the commanded target:
///
/// ```text
/// position: a = −2ζωₙ·v − ωₙ²·(x − (x + δ)) = −2ζωₙ·v + ωₙ²·δ
/// velocity: a = −ωₙ·(v − δ)
/// ```
///
/// then clamps |a| ≤ a_max, |a − a_prev| ≤ j_max·dt, |v| ≤ v_max and
/// integrates velocity before position.
pub struct MechanicsModule {
    config: MechanicsConfig,
    dt_s: f64,
    damping: f64,
    stiffness: f64,
    max_accel_step: f64,
    prev_accel: f64,
}

impl MechanicsModule {
    pub fn new(config: MechanicsConfig) -> PhysicsResult<Self> {
        config.validate()?;
        let dt_s = to_s(us(BASE_STEP_US as f64));
        Ok(Self {
            dt_s,
            damping: -2.0 * config.zeta * config.omega_n,
            stiffness: -(config.omega_n * config.omega_n),
            max_accel_step: config.max_jerk * dt_s,
            prev_accel: 0.0,
            config,
        })
    }

    pub fn mode(&self) -> ControlMode {
        self.config.mode
    }

    /// Acceleration applied on the previous step (µm/s²).
    pub fn previous_acceleration(&self) -> f64 {
        self.prev_accel
    }

    fn nominal_acceleration(&self, velocity: f64, delta: f64) -> f64 {
        match self.config.mode {
            ControlMode::Position => {
                let error = -delta;
                self.damping * velocity + self.stiffness * error
            }
            ControlMode::Velocity => -self.config.omega_n * (velocity - delta),
        }
    }
}

impl ProcessModule for MechanicsModule {
    fn name(&self) -> &'static str {
        "mechanics"
    }

    fn reset(&mut self) {
        self.prev_accel = 0.0;
    }

    fn update(&mut self, record: &mut SimRecord, _rng: &mut SimRng) {
        let v = record.wire_velocity_um_per_s;
        let a_max = self.config.max_accel;

        let nominal = self.nominal_acceleration(v, record.servo_delta).clamp(-a_max, a_max);
        let da = (nominal - self.prev_accel).clamp(-self.max_accel_step, self.max_accel_step);
        let a = self.prev_accel + da;
        self.prev_accel = a;

        let v_max = self.config.max_speed;
        let v = (v + a * self.dt_s).clamp(-v_max, v_max);
        record.wire_velocity_um_per_s = v;
        record.wire_position_um += v * self.dt_s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded_rng;

    fn module(mode: ControlMode) -> MechanicsModule {
        MechanicsModule::new(MechanicsConfig {
            mode,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_modes() {
        assert_eq!("position".parse::<ControlMode>().unwrap(), ControlMode::Position);
        assert_eq!(" Velocity ".parse::<ControlMode>().unwrap(), ControlMode::Velocity);
        let err = "torque".parse::<ControlMode>().unwrap_err();
        assert!(matches!(err, PhysicsError::UnknownControlMode { .. }));
        assert_eq!(ControlMode::Velocity.to_string(), "velocity");
    }

    #[test]
    fn zero_delta_from_rest_does_not_drift() {
        for mode in [ControlMode::Position, ControlMode::Velocity] {
            let mut m = module(mode);
            let mut rng = seeded_rng(0);
            let mut rec = SimRecord {
                wire_position_um: 30.0,
                ..Default::default()
            };
            for _ in 0..10_000 {
                m.update(&mut rec, &mut rng);
            }
            assert_eq!(rec.wire_position_um, 30.0);
            assert_eq!(rec.wire_velocity_um_per_s, 0.0);
        }
    }

    #[test]
    fn jerk_limits_the_first_step() {
        let mut m = module(ControlMode::Position);
        let mut rng = seeded_rng(0);
        let mut rec = SimRecord {
            servo_delta: 10.0,
            ..Default::default()
        };
        m.update(&mut rec, &mut rng);
        // ωₙ²·δ = 4e5 clamps to 3e5, then the jerk limit allows 1e8·1e-6 = 100.
        assert!((m.previous_acceleration() - 100.0).abs() < 1e-9);
        assert!(rec.wire_velocity_um_per_s > 0.0);
    }

    #[test]
    fn acceleration_saturates() {
        let mut m = module(ControlMode::Position);
        let mut rng = seeded_rng(0);
        let mut rec = SimRecord {
            servo_delta: 1e6,
            ..Default::default()
        };
        for _ in 0..20_000 {
            m.update(&mut rec, &mut rng);
            assert!(m.previous_acceleration().abs() <= 3.0e5 + 1e-6);
        }
    }

    #[test]
    fn velocity_mode_saturates_speed() {
        let mut m = module(ControlMode::Velocity);
        let mut rng = seeded_rng(0);
        let mut rec = SimRecord {
            servo_delta: 1e9,
            ..Default::default()
        };
        for _ in 0..200_000 {
            m.update(&mut rec, &mut rng);
            assert!(rec.wire_velocity_um_per_s <= 3.0e4);
        }
        assert_eq!(rec.wire_velocity_um_per_s, 3.0e4);
    }

    #[test]
    fn velocity_mode_tracks_target() {
        let mut m = module(ControlMode::Velocity);
        let mut rng = seeded_rng(0);
        let mut rec = SimRecord {
            servo_delta: 100.0,
            ..Default::default()
        };
        for _ in 0..100_000 {
            m.update(&mut rec, &mut rng);
        }
        assert!((rec.wire_velocity_um_per_s - 100.0).abs() < 1.0);
    }

    #[test]
    fn reset_clears_acceleration_memory() {
        let mut m = module(ControlMode::Position);
        let mut rng = seeded_rng(0);
        let mut rec = SimRecord {
            servo_delta: 5.0,
            ..Default::default()
        };
        m.update(&mut rec, &mut rng);
        assert!(m.previous_acceleration() != 0.0);
        m.reset();
        assert_eq!(m.previous_acceleration(), 0.0);
    }
}
