//! Material removal: one crater per freshly started pulse.

use crate::error::PhysicsResult;
use crate::geometry::ProcessGeometry;
use crate::record::SimRecord;
use crate::rng::SimRng;
use crate::tables::{CraterStats, CurrentMode, ProcessTables};
use crate::traits::ProcessModule;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wedm_core::ensure_non_negative;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Side gap added to the kerf beyond wire diameter and crater depth (µm)
    pub base_overcut_um: f64,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            base_overcut_um: 20.0,
        }
    }
}

impl MaterialConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_non_negative(self.base_overcut_um, "base_overcut_um must be non-negative")?;
        Ok(())
    }
}

/// Resolved crater row plus the face-advance denominator for it.
#[derive(Clone, Copy, Debug)]
struct ActiveCrater {
    mode: Option<CurrentMode>,
    stats: CraterStats,
    /// kerf width × workpiece height (µm²)
    face_area_um2: f64,
}

/// Samples a crater volume on each fresh pulse and advances the workpiece face:
///
/// ```text
/// Δx = V_crater / (kerf_width × workpiece_height)
/// kerf_width = base_overcut + wire_diameter + crater_depth
/// ```
pub struct MaterialRemovalModule {
    config: MaterialConfig,
    geometry: ProcessGeometry,
    tables: Arc<ProcessTables>,
    active: Option<ActiveCrater>,
}

impl MaterialRemovalModule {
    pub fn new(
        config: MaterialConfig,
        geometry: ProcessGeometry,
        tables: Arc<ProcessTables>,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        geometry.validate()?;
        Ok(Self {
            config,
            geometry,
            tables,
            active: None,
        })
    }

    pub fn kerf_width_um(&self, stats: &CraterStats) -> f64 {
        self.config.base_overcut_um + self.geometry.wire_diameter_um() + stats.depth
    }

    /// Workpiece advance for a crater of the given volume.
    pub fn face_advance_um(&self, volume_um3: f64, stats: &CraterStats) -> f64 {
        volume_um3.max(0.0) / (self.kerf_width_um(stats) * self.geometry.workpiece_height_um())
    }

    fn active_crater(&mut self, mode: Option<CurrentMode>) -> ActiveCrater {
        if let Some(active) = self.active {
            if active.mode == mode {
                return active;
            }
        }
        let stats = self.tables.crater(mode).value;
        let active = ActiveCrater {
            mode,
            stats,
            face_area_um2: self.kerf_width_um(&stats) * self.geometry.workpiece_height_um(),
        };
        self.active = Some(active);
        active
    }

    /// Draw one crater volume, clamped non-negative.
    pub fn sample_volume(stats: &CraterStats, rng: &mut SimRng) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        (stats.mean + stats.std * z).max(0.0)
    }
}

impl ProcessModule for MaterialRemovalModule {
    fn name(&self) -> &'static str {
        "material_removal"
    }

    fn update(&mut self, record: &mut SimRecord, rng: &mut SimRng) {
        record.last_crater_volume_um3 = 0.0;
        if !record.spark_status.is_fresh_pulse() {
            return;
        }

        let crater = self.active_crater(record.current_mode);
        let volume = Self::sample_volume(&crater.stats, rng);
        record.last_crater_volume_um3 = volume;
        record.workpiece_position_um += volume / crater.face_area_um2;
    }
}
