//! Debris accumulation and dielectric flushing.

use crate::error::PhysicsResult;
use crate::geometry::ProcessGeometry;
use crate::record::SimRecord;
use crate::rng::SimRng;
use crate::traits::ProcessModule;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use wedm_core::units::constants::BASE_STEP_US;
use wedm_core::units::{Area, to_um3, um};
use wedm_core::{ensure_non_negative, ensure_positive};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DielectricConfig {
    /// Gap at which the geometric flushing factor saturates (µm)
    pub reference_gap_um: f64,
    /// Exponential obstruction coefficient on debris density
    pub obstruction_coeff: f64,
    /// Debris volume flushed per µs under full flow (µm³/µs)
    pub base_flow_rate_um3_per_us: f64,
    /// Lower bound on the gap used for the cavity volume (µm)
    pub min_cavity_gap_um: f64,
}

impl Default for DielectricConfig {
    fn default() -> Self {
        Self {
            reference_gap_um: 30.0,
            obstruction_coeff: 3.0,
            base_flow_rate_um3_per_us: 1000.0,
            min_cavity_gap_um: 0.1,
        }
    }
}

impl DielectricConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_positive(self.reference_gap_um, "reference_gap_um must be positive")?;
        ensure_positive(self.min_cavity_gap_um, "min_cavity_gap_um must be positive")?;
        ensure_non_negative(self.obstruction_coeff, "obstruction_coeff must be non-negative")?;
        ensure_non_negative(
            self.base_flow_rate_um3_per_us,
            "base_flow_rate_um3_per_us must be non-negative",
        )?;
        Ok(())
    }
}

/// Tracks debris in the frontal cavity and the resulting flow condition.
///
/// ```text
/// cavity  = π · max(gap, g_min) · r_wire · h_workpiece
/// density = clamp(debris / cavity, 0, 1)
/// flow    = min(1, (gap / g_ref)³) · exp(−k · density)
/// debris -= flow · Q · dt            (floored at 0)
/// ```
pub struct DielectricModule {
    config: DielectricConfig,
    /// r_wire · h_workpiece · π
    cavity_section: Area,
    temperature_k: f64,
}

impl DielectricModule {
    pub fn new(
        config: DielectricConfig,
        geometry: ProcessGeometry,
        temperature_k: f64,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        geometry.validate()?;
        ensure_positive(temperature_k, "dielectric temperature must be positive")?;
        Ok(Self {
            cavity_section: um(geometry.wire_radius_um()) * um(geometry.workpiece_height_um()) * PI,
            config,
            temperature_k,
        })
    }

    pub fn cavity_volume_um3(&self, gap_um: f64) -> f64 {
        to_um3(self.cavity_section * um(gap_um.max(self.config.min_cavity_gap_um)))
    }

    pub fn debris_density(&self, debris_um3: f64, gap_um: f64) -> f64 {
        (debris_um3 / self.cavity_volume_um3(gap_um)).clamp(0.0, 1.0)
    }

    /// Normalized flushing effectiveness in [0, 1].
    pub fn flow_condition(&self, gap_um: f64, density: f64) -> f64 {
        if gap_um <= 0.0 {
            return 0.0;
        }
        let ramp = (gap_um / self.config.reference_gap_um).powi(3).min(1.0);
        let obstruction = (-self.config.obstruction_coeff * density.clamp(0.0, 1.0)).exp();
        (ramp * obstruction).clamp(0.0, 1.0)
    }
}

impl ProcessModule for DielectricModule {
    fn name(&self) -> &'static str {
        "dielectric"
    }

    fn update(&mut self, record: &mut SimRecord, _rng: &mut SimRng) {
        record.dielectric_temperature_k = self.temperature_k;

        let gap = record.gap_um();
        let mut debris = record.debris_volume_um3 + record.last_crater_volume_um3;

        let cavity = self.cavity_volume_um3(gap);
        let density = self.debris_density(debris, gap);
        let flow = self.flow_condition(gap, density);

        debris -= flow * self.config.base_flow_rate_um3_per_us * BASE_STEP_US as f64;

        record.cavity_volume_um3 = cavity;
        record.debris_density = density;
        record.flow_condition = flow;
        record.debris_volume_um3 = debris.max(0.0);
    }
}
