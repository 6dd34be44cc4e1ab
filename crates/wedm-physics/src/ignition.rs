//! Stochastic spark ignition and short-circuit detection.
//!
//! State machine on [`SparkStatus`]:
//!
//! ```text
//!   Idle --ignite(λ)--> Spark --ON--> Rest --ON+OFF--> Idle
//!   Idle --short------> Short --ON--> Rest
//! ```
//!
//! Short circuits are evaluated strictly before the ignition probability, so
//! λ(gap) is never evaluated for a gap at or below the hard-short threshold.

use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::ProcessGeometry;
use crate::record::{SimRecord, SparkState, SparkStatus};
use crate::rng::SimRng;
use crate::tables::{CurrentMode, ProcessTables};
use crate::traits::ProcessModule;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use std::sync::Arc;
use tracing::warn;
use wedm_core::{Quantizer, ensure_non_negative, ensure_positive};

/// Ignition and short-circuit parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnitionConfig {
    /// Gap below which a short is certain (µm)
    pub hard_short_gap_um: f64,
    /// Critical debris density at zero gap
    pub base_critical_density: f64,
    /// Growth of the critical density per µm of gap
    pub critical_density_gap_coeff: f64,
    /// Cap on the critical density
    pub max_critical_density: f64,
    /// Gap at or below which the random short probability is maximal (µm)
    pub random_short_min_gap_um: f64,
    /// Gap at or above which random shorts never occur (µm)
    pub random_short_max_gap_um: f64,
    /// Random short probability per µs at the minimum gap
    pub random_short_max_probability: f64,
    /// How long a random short persists once triggered (µs)
    pub random_short_duration_us: u32,
    /// Upper end of the fitted λ domain; larger gaps evaluate at this value (µm)
    pub lambda_max_gap_um: f64,
    /// Quantization step of the λ cache key (µm)
    pub lambda_resolution_um: f64,
    /// Discharge voltage as a fraction of the open-circuit target
    pub spark_voltage_fraction: f64,
    /// Open-circuit voltage before any command arrives (V)
    pub default_target_voltage: f64,
    /// ON time before any command arrives (µs)
    pub default_on_time_us: f64,
    /// OFF time before any command arrives (µs)
    pub default_off_time_us: f64,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            hard_short_gap_um: 6.0,
            base_critical_density: 0.3,
            critical_density_gap_coeff: 0.02,
            max_critical_density: 0.95,
            random_short_min_gap_um: 6.0,
            random_short_max_gap_um: 50.0,
            random_short_max_probability: 0.001,
            random_short_duration_us: 100,
            lambda_max_gap_um: 500.0,
            lambda_resolution_um: 0.1,
            spark_voltage_fraction: 0.3,
            default_target_voltage: 80.0,
            default_on_time_us: 3.0,
            default_off_time_us: 80.0,
        }
    }
}

/// Upper bound on the λ memo table size.
const MAX_LAMBDA_BINS: f64 = 1_000_000.0;

impl IgnitionConfig {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_positive(self.hard_short_gap_um, "hard_short_gap_um must be positive")?;
        ensure_positive(self.lambda_max_gap_um, "lambda_max_gap_um must be positive")?;
        ensure_positive(self.lambda_resolution_um, "lambda_resolution_um must be positive")?;
        if self.lambda_max_gap_um / self.lambda_resolution_um > MAX_LAMBDA_BINS {
            return Err(PhysicsError::config(
                "lambda_resolution_um is too fine for lambda_max_gap_um",
            ));
        }
        ensure_non_negative(self.base_critical_density, "base_critical_density must be non-negative")?;
        ensure_non_negative(
            self.critical_density_gap_coeff,
            "critical_density_gap_coeff must be non-negative",
        )?;
        ensure_non_negative(self.default_on_time_us, "default_on_time_us must be non-negative")?;
        ensure_non_negative(self.default_off_time_us, "default_off_time_us must be non-negative")?;
        ensure_non_negative(self.default_target_voltage, "default_target_voltage must be non-negative")?;
        if self.lambda_max_gap_um <= self.hard_short_gap_um {
            return Err(PhysicsError::config(
                "lambda_max_gap_um must exceed hard_short_gap_um",
            ));
        }
        if self.random_short_max_gap_um <= self.random_short_min_gap_um {
            return Err(PhysicsError::config(
                "random_short_max_gap_um must exceed random_short_min_gap_um",
            ));
        }
        if !(0.0..=1.0).contains(&self.random_short_max_probability) {
            return Err(PhysicsError::config(
                "random_short_max_probability must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.max_critical_density) {
            return Err(PhysicsError::config("max_critical_density must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.spark_voltage_fraction) {
            return Err(PhysicsError::config("spark_voltage_fraction must lie in [0, 1]"));
        }
        Ok(())
    }
}

/// Empirical ignition probability per µs for a gap in µm.
///
/// `λ = ln 2 / (0.48 g² − 3.69 g + 14.05)`, the inverse of the fitted median
/// ignition delay. A non-positive or non-finite denominator yields 0 and the
/// result is clamped to [0, 1].
pub fn lambda_closed_form(gap_um: f64) -> f64 {
    let denom = 0.48 * gap_um * gap_um - 3.69 * gap_um + 14.05;
    if !denom.is_finite() || denom <= 0.0 {
        return 0.0;
    }
    (LN_2 / denom).clamp(0.0, 1.0)
}

/// Diagnostics for the random-short latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortCircuitStatus {
    pub has_random_short: bool,
    pub random_short_remaining_us: u32,
}

pub struct IgnitionModule {
    config: IgnitionConfig,
    workpiece_height_mm: f64,
    tables: Arc<ProcessTables>,

    quantizer: Quantizer,
    /// λ per quantized gap bin; NaN marks a bin not yet evaluated
    lambda_cache: Vec<f64>,

    random_short_remaining_us: u32,
    cached_peak_current: Option<(Option<CurrentMode>, f64)>,
}

impl IgnitionModule {
    pub fn new(
        config: IgnitionConfig,
        geometry: ProcessGeometry,
        tables: Arc<ProcessTables>,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        geometry.validate()?;

        let quantizer = Quantizer::new(config.lambda_resolution_um)?;
        let max_bin = quantizer.bin(config.lambda_max_gap_um);
        let lambda_cache = vec![f64::NAN; max_bin as usize + 1];

        Ok(Self {
            config,
            workpiece_height_mm: geometry.workpiece_height_mm,
            tables,
            quantizer,
            lambda_cache,
            random_short_remaining_us: 0,
            cached_peak_current: None,
        })
    }

    pub fn config(&self) -> &IgnitionConfig {
        &self.config
    }

    /// Memoized λ(gap). Gaps are clamped to the fitted domain and snapped to
    /// the cache resolution before evaluation.
    pub fn ignition_probability(&mut self, gap_um: f64) -> f64 {
        debug_assert!(
            gap_um > 0.0,
            "ignition probability evaluated at non-positive gap {gap_um}"
        );
        let clamped = gap_um.clamp(self.config.hard_short_gap_um, self.config.lambda_max_gap_um);
        let bin = self.quantizer.bin(clamped).max(0) as usize;
        let idx = bin.min(self.lambda_cache.len() - 1);

        let cached = self.lambda_cache[idx];
        if !cached.is_nan() {
            return cached;
        }
        let lambda = lambda_closed_form(self.quantizer.value(idx as i64));
        self.lambda_cache[idx] = lambda;
        lambda
    }

    /// Number of λ bins evaluated so far.
    pub fn lambda_cache_filled(&self) -> usize {
        self.lambda_cache.iter().filter(|v| !v.is_nan()).count()
    }

    /// Critical debris density for a gap; 0 inside the hard-short zone.
    pub fn critical_density(&self, gap_um: f64) -> f64 {
        if gap_um < self.config.hard_short_gap_um {
            return 0.0;
        }
        (self.config.base_critical_density + self.config.critical_density_gap_coeff * gap_um)
            .min(self.config.max_critical_density)
    }

    /// Random short probability per µs: maximal below the minimum gap,
    /// zero above the maximum gap, linear in between.
    pub fn random_short_probability(&self, gap_um: f64) -> f64 {
        let c = &self.config;
        if gap_um >= c.random_short_max_gap_um {
            0.0
        } else if gap_um <= c.random_short_min_gap_um {
            c.random_short_max_probability
        } else {
            let span = c.random_short_max_gap_um - c.random_short_min_gap_um;
            (1.0 - (gap_um - c.random_short_min_gap_um) / span) * c.random_short_max_probability
        }
    }

    pub fn short_circuit_status(&self) -> ShortCircuitStatus {
        ShortCircuitStatus {
            has_random_short: self.random_short_remaining_us > 0,
            random_short_remaining_us: self.random_short_remaining_us,
        }
    }

    fn is_deterministic_short(&self, gap_um: f64, debris_density: f64) -> bool {
        gap_um < self.config.hard_short_gap_um || debris_density > self.critical_density(gap_um)
    }

    fn detect_short(&mut self, record: &SimRecord, rng: &mut SimRng) -> bool {
        if self.random_short_remaining_us > 0 {
            self.random_short_remaining_us -= 1;
            return true;
        }

        let gap = record.gap_um().max(0.0);
        if self.is_deterministic_short(gap, record.debris_density) {
            return true;
        }

        let p = self.random_short_probability(gap);
        if p > 0.0 && rng.r#gen::<f64>() < p {
            // This step counts as the first one of the latched short.
            self.random_short_remaining_us = self.config.random_short_duration_us.saturating_sub(1);
            return true;
        }
        false
    }

    fn peak_current(&mut self, mode: Option<CurrentMode>) -> f64 {
        if let Some((cached_mode, value)) = self.cached_peak_current {
            if cached_mode == mode {
                return value;
            }
        }
        let lookup = self.tables.peak_current(mode);
        if lookup.fell_back {
            if let Some(requested) = mode {
                warn!(%requested, fallback = %lookup.resolved, "current mode missing from table");
            }
        }
        self.cached_peak_current = Some((mode, lookup.value));
        lookup.value
    }

    fn target_voltage(&self, record: &SimRecord) -> f64 {
        record
            .target_voltage
            .unwrap_or(self.config.default_target_voltage)
    }

    /// A zero ON time selects the configured default.
    fn on_time(&self, record: &SimRecord) -> f64 {
        record
            .on_time_us
            .filter(|t| *t > 0.0)
            .unwrap_or(self.config.default_on_time_us)
    }

    fn off_time(&self, record: &SimRecord) -> f64 {
        record.off_time_us.unwrap_or(self.config.default_off_time_us)
    }

    fn on_idle(&mut self, record: &mut SimRecord, rng: &mut SimRng) {
        record.current = Some(0.0);

        if record.is_short_circuit {
            record.spark_status = SparkStatus {
                state: SparkState::Short,
                location_mm: None,
                duration_us: 0,
            };
            record.current = Some(self.peak_current(record.current_mode));
            return;
        }

        let target = self.target_voltage(record);
        record.voltage = Some(target);

        debug_assert!(!record.is_short_circuit);
        let lambda = self.ignition_probability(record.gap_um());
        if rng.r#gen::<f64>() < lambda {
            let location = rng.gen_range(0.0..self.workpiece_height_mm);
            record.spark_status = SparkStatus {
                state: SparkState::Spark,
                location_mm: Some(location),
                duration_us: 0,
            };
            record.voltage = Some(target * self.config.spark_voltage_fraction);
            record.current = Some(self.peak_current(record.current_mode));
        }
    }

    fn on_spark(&mut self, record: &mut SimRecord) {
        let duration = record.spark_status.duration_us + 1;
        record.spark_status.duration_us = duration;

        if f64::from(duration) >= self.on_time(record) {
            record.spark_status.state = SparkState::Rest;
            record.spark_status.location_mm = None;
            record.current = Some(0.0);
            if !record.is_short_circuit {
                record.voltage = Some(0.0);
            }
        } else {
            record.current = Some(self.peak_current(record.current_mode));
            if !record.is_short_circuit {
                record.voltage = Some(self.target_voltage(record) * self.config.spark_voltage_fraction);
            }
        }
    }

    fn on_short(&mut self, record: &mut SimRecord) {
        let duration = record.spark_status.duration_us + 1;
        record.spark_status.duration_us = duration;
        record.voltage = Some(0.0);

        if f64::from(duration) >= self.on_time(record) {
            record.spark_status.state = SparkState::Rest;
            record.current = Some(0.0);
        } else {
            record.current = Some(self.peak_current(record.current_mode));
        }
    }

    fn on_rest(&mut self, record: &mut SimRecord) {
        let duration = record.spark_status.duration_us + 1;
        record.spark_status.duration_us = duration;
        record.current = Some(0.0);

        let cycle = self.on_time(record) + self.off_time(record);
        if f64::from(duration) >= cycle {
            record.spark_status = SparkStatus::IDLE;
            if !record.is_short_circuit {
                record.voltage = Some(self.target_voltage(record));
            }
        } else if !record.is_short_circuit {
            record.voltage = Some(0.0);
        }
    }
}

impl ProcessModule for IgnitionModule {
    fn name(&self) -> &'static str {
        "ignition"
    }

    fn reset(&mut self) {
        self.random_short_remaining_us = 0;
    }

    fn update(&mut self, record: &mut SimRecord, rng: &mut SimRng) {
        record.is_short_circuit = self.detect_short(record, rng);
        if record.is_short_circuit {
            record.voltage = Some(0.0);
        }

        match record.spark_status.state {
            SparkState::Idle => self.on_idle(record, rng),
            SparkState::Spark => self.on_spark(record),
            SparkState::Short => self.on_short(record),
            SparkState::Rest => self.on_rest(record),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lambda_in_unit_interval(g in -100.0_f64..10_000.0) {
            let l = lambda_closed_form(g);
            prop_assert!((0.0..=1.0).contains(&l));
        }

        #[test]
        fn repeated_gap_identical_lambda(g in 6.0_f64..600.0) {
            let mut m = IgnitionModule::new(
                IgnitionConfig::default(),
                ProcessGeometry::default(),
                Arc::new(ProcessTables::builtin()),
            ).unwrap();
            let a = m.ignition_probability(g);
            let b = m.ignition_probability(g);
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
