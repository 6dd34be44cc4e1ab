//! One-dimensional transient heat model of the travelling wire.
//!
//! The wire is discretized along its axis into equal segments spanning a
//! bottom buffer, the workpiece height and a top buffer. Segment 0 is the
//! spool entry and is held at the spool temperature (Dirichlet); the last
//! segment has a zero-gradient (Neumann) condition.
//!
//! Per base step, for each segment `i`:
//!
//! ```text
//! q_cond   = k·S/Δy · (T[i-1] + T[i+1] − 2·T[i])
//! q_joule  = ½ · I² · ρₑ(1 + α(T[i] − T_ref)) · Δy / S
//! q_plasma = η · V · I                       (spark segment only)
//! q_conv   = −h·A·(1 + flow·[i in zone]) · (T[i] − T_dielectric)
//! q_adv    = ρ·cp·v·S · (T[i-1] − T[i])
//! T[i]    += Σq / (ρ·cp·S·Δy) · dt
//! ```

use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::ProcessGeometry;
use crate::record::{SimRecord, SparkState};
use crate::rng::SimRng;
use crate::traits::ProcessModule;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use wedm_core::units::constants::{BASE_STEP_US, T_REF_K};
use wedm_core::units::{Area, Length, mm, to_m, to_m2, to_mps, to_s, um, um_per_us, us};
use wedm_core::{ensure_non_negative, ensure_positive};

/// Wire discretization, material and break parameters (brass defaults).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Free wire below the workpiece, on the spool side (mm)
    pub buffer_bottom_mm: f64,
    /// Free wire above the workpiece (mm)
    pub buffer_top_mm: f64,
    /// Axial length of one segment (mm)
    pub segment_length_mm: f64,
    pub spool_temperature_k: f64,

    /// Mass density (kg/m³)
    pub density_kg_m3: f64,
    /// Specific heat (J/(kg·K))
    pub specific_heat_j_kg_k: f64,
    /// Thermal conductivity (W/(m·K))
    pub thermal_conductivity_w_m_k: f64,
    /// Electrical resistivity at the reference temperature (Ω·m)
    pub electrical_resistivity_ohm_m: f64,
    /// Linear temperature coefficient of resistivity (1/K)
    pub resistivity_temp_coeff_per_k: f64,

    /// Baseline convection coefficient (W/(m²·K))
    pub convection_coeff_w_m2_k: f64,
    /// Fraction of discharge power deposited into the wire
    pub plasma_efficiency: f64,

    pub melting_temperature_k: f64,
    pub critical_temperature_k: f64,
    /// Time above the critical temperature that breaks the wire (µs)
    pub critical_duration_us: u64,

    /// Publish the work-zone mean on every step instead of on demand
    pub compute_zone_mean_every_step: bool,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            buffer_bottom_mm: 30.0,
            buffer_top_mm: 20.0,
            segment_length_mm: 1.0,
            spool_temperature_k: 293.15,
            density_kg_m3: 8400.0,
            specific_heat_j_kg_k: 377.0,
            thermal_conductivity_w_m_k: 120.0,
            electrical_resistivity_ohm_m: 6.4e-8,
            resistivity_temp_coeff_per_k: 0.0039,
            convection_coeff_w_m2_k: 14_000.0,
            plasma_efficiency: 0.1,
            melting_temperature_k: 1180.0,
            critical_temperature_k: 1000.0,
            critical_duration_us: 500,
            compute_zone_mean_every_step: true,
        }
    }
}

impl WireConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_positive(self.segment_length_mm, "segment_length_mm must be positive")?;
        ensure_non_negative(self.buffer_bottom_mm, "buffer_bottom_mm must be non-negative")?;
        ensure_non_negative(self.buffer_top_mm, "buffer_top_mm must be non-negative")?;
        ensure_positive(self.spool_temperature_k, "spool_temperature_k must be positive")?;
        ensure_positive(self.density_kg_m3, "density_kg_m3 must be positive")?;
        ensure_positive(self.specific_heat_j_kg_k, "specific_heat_j_kg_k must be positive")?;
        ensure_non_negative(
            self.thermal_conductivity_w_m_k,
            "thermal_conductivity_w_m_k must be non-negative",
        )?;
        ensure_non_negative(
            self.electrical_resistivity_ohm_m,
            "electrical_resistivity_ohm_m must be non-negative",
        )?;
        ensure_non_negative(
            self.convection_coeff_w_m2_k,
            "convection_coeff_w_m2_k must be non-negative",
        )?;
        if !(0.0..=1.0).contains(&self.plasma_efficiency) {
            return Err(PhysicsError::config("plasma_efficiency must lie in [0, 1]"));
        }
        if self.melting_temperature_k <= self.spool_temperature_k {
            return Err(PhysicsError::config(
                "melting_temperature_k must exceed spool_temperature_k",
            ));
        }
        if self.critical_temperature_k > self.melting_temperature_k {
            return Err(PhysicsError::config(
                "critical_temperature_k must not exceed melting_temperature_k",
            ));
        }
        Ok(())
    }
}

/// Whole segments covering `length` (tolerant to float round-off).
fn whole_segments(length_mm: f64, segment_mm: f64) -> usize {
    (length_mm / segment_mm + 1e-9).floor().max(0.0) as usize
}

pub struct WireThermalModule {
    config: WireConfig,

    n_segments: usize,
    zone: Range<usize>,

    segment_length_m: f64,
    /// k·S/Δy (W/K)
    conduction_coeff: f64,
    /// ½·ρₑ·Δy/S, multiplied by I² and the resistivity factor (Ω)
    joule_coeff: f64,
    /// h·A (W/K)
    convection_coeff: f64,
    /// ρ·cp·S (J/(K·m)), multiplied by the unwind speed
    advection_coeff: f64,
    /// dt / (ρ·cp·S·Δy) (K/W)
    step_gain: f64,

    /// Net heat flow per segment, reused every step (W)
    heat: Vec<f64>,
}

impl WireThermalModule {
    pub fn new(config: WireConfig, geometry: ProcessGeometry) -> PhysicsResult<Self> {
        config.validate()?;
        geometry.validate()?;

        let seg = config.segment_length_mm;
        let total = config.buffer_bottom_mm + geometry.workpiece_height_mm + config.buffer_top_mm;
        let n_segments = whole_segments(total, seg).max(1);
        let zone_end = (whole_segments(config.buffer_bottom_mm, seg)
            + whole_segments(geometry.workpiece_height_mm, seg))
        .min(n_segments);
        let zone_start = whole_segments(config.buffer_bottom_mm, seg).min(zone_end);

        let segment: Length = mm(seg);
        let radius: Length = um(geometry.wire_radius_um());
        let section_area: Area = radius * radius * PI;
        let lateral_area: Area = radius * segment * (2.0 * PI);
        let dy = to_m(segment);
        let section = to_m2(section_area);
        let lateral = to_m2(lateral_area);
        let capacity = config.density_kg_m3 * config.specific_heat_j_kg_k * section * dy;
        let capacity = ensure_positive(capacity, "wire segment heat capacity must be positive")?;

        Ok(Self {
            n_segments,
            zone: zone_start..zone_end,
            segment_length_m: dy,
            conduction_coeff: config.thermal_conductivity_w_m_k * section / dy,
            joule_coeff: 0.5 * config.electrical_resistivity_ohm_m * dy / section,
            convection_coeff: config.convection_coeff_w_m2_k * lateral,
            advection_coeff: config.density_kg_m3 * config.specific_heat_j_kg_k * section,
            step_gain: to_s(us(BASE_STEP_US as f64)) / capacity,
            heat: vec![0.0; n_segments],
            config,
        })
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn n_segments(&self) -> usize {
        self.n_segments
    }

    /// Segment indices adjacent to the workpiece.
    pub fn zone_range(&self) -> Range<usize> {
        self.zone.clone()
    }

    pub fn segment_length_m(&self) -> f64 {
        self.segment_length_m
    }

    /// Field at rest: every segment at spool temperature.
    pub fn initial_field(&self) -> Vec<f64> {
        vec![self.config.spool_temperature_k; self.n_segments]
    }

    /// Largest fraction of a segment's excess temperature removed in one
    /// step, with full flow and the given unwind speed. The explicit update
    /// stays monotone while this is at most 1.
    pub fn stability_number(&self, unwind_um_per_us: f64) -> f64 {
        // µm/µs is numerically m/s.
        let advection = self.advection_coeff * to_mps(um_per_us(unwind_um_per_us)).abs();
        (2.0 * self.conduction_coeff + 2.0 * self.convection_coeff + advection) * self.step_gain
    }

    pub fn ensure_stable(&self, unwind_um_per_us: f64) -> PhysicsResult<()> {
        let n = self.stability_number(unwind_um_per_us);
        if n > 1.0 {
            return Err(PhysicsError::config(format!(
                "explicit thermal step unstable (coefficient sum {n:.3} > 1)"
            )));
        }
        Ok(())
    }

    /// Mean temperature over the work zone; falls back to the whole field if
    /// the zone is empty.
    pub fn zone_mean_temperature(&self, field: &[f64]) -> f64 {
        let end = self.zone.end.min(field.len());
        let start = self.zone.start.min(end);
        let zone = if end > start { &field[start..end] } else { field };
        if zone.is_empty() {
            return self.config.spool_temperature_k;
        }
        zone.iter().sum::<f64>() / zone.len() as f64
    }

    /// Segment receiving plasma heat for a spark at `location_mm` above the
    /// workpiece bottom.
    pub fn spark_segment(&self, location_mm: f64) -> Option<usize> {
        if !location_mm.is_finite() || location_mm < 0.0 {
            return None;
        }
        let idx = self.zone.start + (location_mm / self.config.segment_length_mm).floor() as usize;
        (idx < self.n_segments).then_some(idx)
    }

    fn accumulate_heat(&mut self, record: &SimRecord) {
        let t = &record.wire_temperature_k;
        let n = self.n_segments;
        let current = record.current.unwrap_or(0.0);
        let joule = self.joule_coeff * current * current;
        let alpha = self.config.resistivity_temp_coeff_per_k;
        let t_d = record.dielectric_temperature_k;
        let zone_conv = self.convection_coeff * (1.0 + record.flow_condition);
        let advection =
            self.advection_coeff * to_mps(um_per_us(record.wire_unwind_velocity_um_per_us));

        for i in 0..n {
            let ti = t[i];
            let conduction = match i {
                0 => 0.0,
                _ if i + 1 == n => t[i - 1] - ti,
                _ => t[i - 1] + t[i + 1] - 2.0 * ti,
            };
            let upstream = if i == 0 { ti } else { t[i - 1] };
            let h = if self.zone.contains(&i) {
                zone_conv
            } else {
                self.convection_coeff
            };

            self.heat[i] = self.conduction_coeff * conduction
                + joule * (1.0 + alpha * (ti - T_REF_K))
                - h * (ti - t_d)
                + advection * (upstream - ti);
        }

        if record.spark_status.state == SparkState::Spark {
            if let Some(idx) = record.spark_status.location_mm.and_then(|y| self.spark_segment(y)) {
                let q = self.config.plasma_efficiency * record.voltage.unwrap_or(0.0) * current;
                if q.is_finite() {
                    self.heat[idx] += q;
                }
            }
        }
    }

    fn check_break(&self, record: &mut SimRecord) {
        let hottest = record
            .wire_temperature_k
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        if hottest >= self.config.melting_temperature_k {
            record.is_wire_broken = true;
        }
        if hottest >= self.config.critical_temperature_k {
            record.time_in_critical_temp_us += BASE_STEP_US;
            if record.time_in_critical_temp_us >= self.config.critical_duration_us {
                record.is_wire_broken = true;
            }
        } else {
            record.time_in_critical_temp_us = 0;
        }
    }
}

impl ProcessModule for WireThermalModule {
    fn name(&self) -> &'static str {
        "wire_thermal"
    }

    fn update(&mut self, record: &mut SimRecord, _rng: &mut SimRng) {
        if record.is_wire_broken {
            return;
        }
        if record.wire_temperature_k.len() != self.n_segments {
            record.wire_temperature_k = self.initial_field();
        }

        let spool = self.config.spool_temperature_k;
        record.wire_temperature_k[0] = spool;

        self.accumulate_heat(record);
        for (t, q) in record.wire_temperature_k.iter_mut().zip(&self.heat) {
            *t += q * self.step_gain;
        }
        record.wire_temperature_k[0] = spool;

        record.wire_mean_temperature_k = if self.config.compute_zone_mean_every_step {
            Some(self.zone_mean_temperature(&record.wire_temperature_k))
        } else {
            None
        };

        self.check_break(record);
    }
}
