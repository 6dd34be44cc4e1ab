//! Simulation configuration: process settings plus one block per model.
//!
//! Every field has a default, so an empty YAML document is a valid config.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wedm_core::{ensure_finite, ensure_non_negative, ensure_positive};
use wedm_physics::{
    DielectricConfig, IgnitionConfig, MaterialConfig, MechanicsConfig, ProcessGeometry,
    WireConfig, WireThermalModule,
};

/// Process-level settings owned by the orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Control step length (µs)
    pub servo_interval_us: u64,
    pub workpiece_height_mm: f64,
    pub wire_diameter_mm: f64,
    pub initial_workpiece_position_um: f64,
    pub initial_wire_position_um: f64,
    /// Workpiece face position that ends the cut (µm)
    pub target_position_um: f64,
    /// Wire may pass the workpiece face by this much before collision (µm)
    pub overrun_tolerance_um: f64,
    pub wire_unwind_velocity_um_per_us: f64,
    pub dielectric_temperature_k: f64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            servo_interval_us: 1000,
            workpiece_height_mm: 10.0,
            wire_diameter_mm: 0.25,
            initial_workpiece_position_um: 100.0,
            initial_wire_position_um: 30.0,
            target_position_um: 5000.0,
            overrun_tolerance_um: 100.0,
            wire_unwind_velocity_um_per_us: 0.1,
            dielectric_temperature_k: 293.15,
        }
    }
}

impl ProcessConfig {
    pub fn geometry(&self) -> ProcessGeometry {
        ProcessGeometry {
            workpiece_height_mm: self.workpiece_height_mm,
            wire_diameter_mm: self.wire_diameter_mm,
        }
    }

    pub fn initial_gap_um(&self) -> f64 {
        self.initial_workpiece_position_um - self.initial_wire_position_um
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.servo_interval_us == 0 {
            return Err(SimError::InvalidConfig {
                what: "servo_interval_us must be positive".to_string(),
            });
        }
        self.geometry().validate()?;
        ensure_finite(self.initial_workpiece_position_um, "initial_workpiece_position_um")?;
        ensure_finite(self.initial_wire_position_um, "initial_wire_position_um")?;
        ensure_finite(self.target_position_um, "target_position_um")?;
        ensure_non_negative(self.overrun_tolerance_um, "overrun_tolerance_um must be non-negative")?;
        ensure_non_negative(
            self.wire_unwind_velocity_um_per_us,
            "wire_unwind_velocity_um_per_us must be non-negative",
        )?;
        ensure_positive(self.dielectric_temperature_k, "dielectric_temperature_k must be positive")?;
        if -self.initial_gap_um() > self.overrun_tolerance_um {
            return Err(SimError::InvalidConfig {
                what: "initial wire position already overruns the workpiece".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub process: ProcessConfig,
    pub ignition: IgnitionConfig,
    pub material: MaterialConfig,
    pub dielectric: DielectricConfig,
    pub wire: WireConfig,
    pub mechanics: MechanicsConfig,
}

impl SimConfig {
    pub fn geometry(&self) -> ProcessGeometry {
        self.process.geometry()
    }

    /// Check every block, including stability of the explicit thermal step.
    pub fn validate(&self) -> SimResult<()> {
        self.process.validate()?;
        self.ignition.validate()?;
        self.material.validate()?;
        self.dielectric.validate()?;
        self.mechanics.validate()?;

        let wire = WireThermalModule::new(self.wire.clone(), self.geometry())?;
        wire.ensure_stable(self.process.wire_unwind_velocity_um_per_us)?;
        Ok(())
    }

    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let config: SimConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_path(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_json_path(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load YAML or JSON depending on the file extension.
    pub fn from_path(path: &Path) -> SimResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_path(path),
            _ => Self::from_yaml_path(path),
        }
    }

    pub fn to_yaml_string(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save_yaml(&self, path: &Path) -> SimResult<()> {
        self.validate()?;
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }
}
