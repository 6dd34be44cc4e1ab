//! Fixed process geometry shared by several models.

use serde::{Deserialize, Serialize};
use wedm_core::units::{mm, to_um};
use wedm_core::{CoreResult, ensure_positive};

/// Workpiece and wire dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessGeometry {
    /// Workpiece height along the wire axis (mm)
    pub workpiece_height_mm: f64,
    /// Wire diameter (mm)
    pub wire_diameter_mm: f64,
}

impl Default for ProcessGeometry {
    fn default() -> Self {
        Self {
            workpiece_height_mm: 10.0,
            wire_diameter_mm: 0.25,
        }
    }
}

impl ProcessGeometry {
    pub fn validate(&self) -> CoreResult<()> {
        ensure_positive(self.workpiece_height_mm, "workpiece height must be positive")?;
        ensure_positive(self.wire_diameter_mm, "wire diameter must be positive")?;
        Ok(())
    }

    pub fn workpiece_height_um(&self) -> f64 {
        to_um(mm(self.workpiece_height_mm))
    }

    pub fn wire_diameter_um(&self) -> f64 {
        to_um(mm(self.wire_diameter_mm))
    }

    pub fn wire_radius_um(&self) -> f64 {
        0.5 * self.wire_diameter_um()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micrometre_views() {
        let g = ProcessGeometry::default();
        assert!((g.workpiece_height_um() - 10_000.0).abs() < 1e-6);
        assert!((g.wire_radius_um() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_degenerate_geometry() {
        let g = ProcessGeometry {
            workpiece_height_mm: 0.0,
            ..Default::default()
        };
        assert!(g.validate().is_err());
    }
}
