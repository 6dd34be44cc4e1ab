//! Gap-holding servo policy used by the CLI runs.
//!
//! A PI controller on the measured gap with anti-windup, output clamping and
//! integral clamping, sampled once per control step. Its output is the
//! position-mode servo delta in µm.

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapController {
    /// Gap to hold (µm)
    pub target_gap_um: f64,
    /// Proportional gain (µm of delta per µm of gap error)
    pub kp: f64,
    /// Integral time constant (seconds)
    pub ti: f64,
    /// Output limits (µm per control step)
    pub out_min: f64,
    pub out_max: f64,
    /// Integral windup limit (µm·s)
    pub integral_limit: Option<f64>,
}

impl GapController {
    pub fn new(target_gap_um: f64, kp: f64, ti: f64, out_min: f64, out_max: f64) -> CliResult<Self> {
        if target_gap_um <= 0.0 {
            return Err(CliError::InvalidArg {
                what: "target gap must be positive",
            });
        }
        if ti <= 0.0 {
            return Err(CliError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if out_min >= out_max {
            return Err(CliError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            target_gap_um,
            kp,
            ti,
            out_min,
            out_max,
            integral_limit: None,
        })
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// Servo delta for the measured gap. A gap wider than the target
    /// yields a positive delta (advance the wire).
    pub fn update(&self, state: &GapControllerState, gap_um: f64, dt: f64) -> (GapControllerState, f64) {
        let error = gap_um - self.target_gap_um;
        let p_term = self.kp * error;

        let ki = self.kp / self.ti;
        let new_integral = state.integral + error * dt;
        let clamped_integral = match self.integral_limit {
            Some(limit) => new_integral.clamp(-limit, limit),
            None => new_integral,
        };

        let output_raw = p_term + ki * clamped_integral;
        let output = output_raw.clamp(self.out_min, self.out_max);

        // Hold the integral while saturated.
        let integral = if output == output_raw {
            clamped_integral
        } else {
            state.integral
        };
        (GapControllerState { integral }, output)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapControllerState {
    pub integral: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> GapController {
        GapController::new(20.0, 0.05, 0.05, -2.0, 2.0).unwrap()
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(GapController::new(0.0, 1.0, 1.0, -1.0, 1.0).is_err());
        assert!(GapController::new(20.0, 1.0, 0.0, -1.0, 1.0).is_err());
        assert!(GapController::new(20.0, 1.0, 1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn zero_error_holds_position() {
        let (state, out) = controller().update(&GapControllerState::default(), 20.0, 1e-3);
        assert_eq!(out, 0.0);
        assert_eq!(state.integral, 0.0);
    }

    #[test]
    fn wide_gap_advances_the_wire() {
        let (_, out) = controller().update(&GapControllerState::default(), 30.0, 1e-3);
        assert!(out > 0.0);
        let (_, out) = controller().update(&GapControllerState::default(), 10.0, 1e-3);
        assert!(out < 0.0);
    }

    #[test]
    fn saturation_freezes_integral() {
        let c = controller();
        let (state, out) = c.update(&GapControllerState::default(), 500.0, 1e-3);
        assert_eq!(out, 2.0);
        assert_eq!(state.integral, 0.0);
    }

    #[test]
    fn integral_limit_applies() {
        let c = GapController::new(20.0, 0.01, 1.0, -100.0, 100.0)
            .unwrap()
            .with_integral_limit(0.5);
        let mut state = GapControllerState::default();
        for _ in 0..100 {
            state = c.update(&state, 30.0, 1.0).0;
        }
        assert_eq!(state.integral, 0.5);
    }
}
