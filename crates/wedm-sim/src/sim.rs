//! The step orchestrator.
//!
//! Two nested time scales: every call to [`WireEdmSim::step`] advances one
//! 1 µs base step; every `servo_interval_us` base steps the pending command is
//! written into the record first. Within a base step the models run in the
//! fixed order Ignition → MaterialRemoval → Dielectric → WireThermal, then
//! Mechanics unless the wire has just broken.

use crate::command::Command;
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::observation::{Snapshot, StepOutcome};
use std::sync::Arc;
use tracing::{debug, info};
use wedm_core::units::constants::BASE_STEP_US;
use wedm_physics::{
    DielectricModule, IgnitionModule, MaterialRemovalModule, MechanicsModule, ProcessModule,
    ProcessTables, SimRecord, SimRng, SparkState, WireThermalModule, seeded_rng,
};

pub struct WireEdmSim {
    config: SimConfig,
    tables: Arc<ProcessTables>,
    seed: u64,
    rng: SimRng,
    record: SimRecord,

    ignition: IgnitionModule,
    material: MaterialRemovalModule,
    dielectric: DielectricModule,
    wire: WireThermalModule,
    mechanics: MechanicsModule,

    spark_count: u64,
    short_count: u64,
    terminated: bool,
}

impl WireEdmSim {
    /// Build all models from a validated config and start an episode.
    pub fn new(config: SimConfig, tables: Arc<ProcessTables>, seed: u64) -> SimResult<Self> {
        config.validate()?;
        let geometry = config.geometry();

        let ignition = IgnitionModule::new(config.ignition.clone(), geometry, Arc::clone(&tables))?;
        let material =
            MaterialRemovalModule::new(config.material.clone(), geometry, Arc::clone(&tables))?;
        let dielectric = DielectricModule::new(
            config.dielectric.clone(),
            geometry,
            config.process.dielectric_temperature_k,
        )?;
        let wire = WireThermalModule::new(config.wire.clone(), geometry)?;
        let mechanics = MechanicsModule::new(config.mechanics.clone())?;

        let mut sim = Self {
            config,
            tables,
            seed,
            rng: seeded_rng(seed),
            record: SimRecord::default(),
            ignition,
            material,
            dielectric,
            wire,
            mechanics,
            spark_count: 0,
            short_count: 0,
            terminated: false,
        };
        sim.reset(seed);
        Ok(sim)
    }

    /// Start a fresh episode. The record is rebuilt from the config, the
    /// thermal field is initialized by one forced wire update and the first
    /// step is a control step.
    pub fn reset(&mut self, seed: u64) {
        let process = &self.config.process;
        self.seed = seed;
        self.rng = seeded_rng(seed);
        self.record = SimRecord {
            time_since_servo_us: process.servo_interval_us,
            workpiece_position_um: process.initial_workpiece_position_um,
            wire_position_um: process.initial_wire_position_um,
            target_position_um: process.target_position_um,
            wire_unwind_velocity_um_per_us: process.wire_unwind_velocity_um_per_us,
            dielectric_temperature_k: process.dielectric_temperature_k,
            ..Default::default()
        };

        self.ignition.reset();
        self.material.reset();
        self.dielectric.reset();
        self.wire.reset();
        self.mechanics.reset();
        self.wire.update(&mut self.record, &mut self.rng);

        self.spark_count = 0;
        self.short_count = 0;
        self.terminated = false;

        info!(
            seed,
            gap_um = self.record.gap_um(),
            segments = self.wire.n_segments(),
            "episode reset"
        );
    }

    /// Advance one base step. `command` is only read on control steps.
    ///
    /// After termination the record is frozen and further calls return the
    /// terminal outcome unchanged.
    pub fn step(&mut self, command: &Command) -> SimResult<StepOutcome> {
        if self.terminated {
            return Ok(self.outcome(false));
        }

        let is_control_step = self.is_control_step_due();
        if is_control_step {
            command.validate()?;
            self.apply_command(command);
            self.record.time_since_servo_us = 0;
        }

        let prev_voltage = self.record.voltage;
        {
            let chain: [&mut dyn ProcessModule; 4] = [
                &mut self.ignition,
                &mut self.material,
                &mut self.dielectric,
                &mut self.wire,
            ];
            for module in chain {
                module.update(&mut self.record, &mut self.rng);
            }
        }
        self.count_pulses();

        if self.record.is_wire_broken {
            self.terminated = true;
            info!(time_us = self.record.time_us, "wire broken");
            return Ok(self.outcome(is_control_step));
        }

        self.mechanics.update(&mut self.record, &mut self.rng);
        self.advance_counters(prev_voltage);
        self.check_termination();

        Ok(self.outcome(is_control_step))
    }

    /// Step until the next control boundary or termination. The returned
    /// outcome always carries a snapshot of the final state.
    pub fn run_control_interval(&mut self, command: &Command) -> SimResult<StepOutcome> {
        let interval = self.config.process.servo_interval_us;
        let mut outcome = self.step(command)?;
        while !outcome.terminated && self.record.time_since_servo_us < interval {
            outcome = self.step(command)?;
        }
        outcome.snapshot = Some(self.snapshot());
        Ok(outcome)
    }

    /// Whether the next call to [`step`](Self::step) applies its command.
    pub fn is_control_step_due(&self) -> bool {
        !self.terminated && self.record.time_since_servo_us >= self.config.process.servo_interval_us
    }

    pub fn snapshot(&self) -> Snapshot {
        let r = &self.record;
        let mean = r
            .wire_mean_temperature_k
            .unwrap_or_else(|| self.wire.zone_mean_temperature(&r.wire_temperature_k));
        let max = r
            .wire_temperature_k
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        Snapshot {
            time_us: r.time_us,
            time_since_voltage_change_us: r.time_since_voltage_change_us,
            time_since_spark_ignition_us: r.time_since_spark_ignition_us,
            time_since_spark_end_us: r.time_since_spark_end_us,
            voltage: r.voltage,
            current: r.current,
            target_voltage: r.target_voltage,
            current_mode: r.current_mode,
            on_time_us: r.on_time_us,
            off_time_us: r.off_time_us,
            servo_delta: r.servo_delta,
            spark_state: r.spark_status.state,
            spark_location_mm: r.spark_status.location_mm,
            spark_duration_us: r.spark_status.duration_us,
            workpiece_position_um: r.workpiece_position_um,
            wire_position_um: r.wire_position_um,
            gap_um: r.gap_um(),
            wire_velocity_um_per_s: r.wire_velocity_um_per_s,
            wire_mean_temperature_k: mean,
            wire_max_temperature_k: max,
            debris_volume_um3: r.debris_volume_um3,
            debris_density: r.debris_density,
            flow_condition: r.flow_condition,
            is_short_circuit: r.is_short_circuit,
            spark_count: self.spark_count,
            short_count: self.short_count,
        }
    }

    pub fn record(&self) -> &SimRecord {
        &self.record
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tables(&self) -> &Arc<ProcessTables> {
        &self.tables
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn spark_count(&self) -> u64 {
        self.spark_count
    }

    pub fn short_count(&self) -> u64 {
        self.short_count
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn ignition(&self) -> &IgnitionModule {
        &self.ignition
    }

    pub fn wire(&self) -> &WireThermalModule {
        &self.wire
    }

    fn apply_command(&mut self, command: &Command) {
        let r = &mut self.record;
        r.servo_delta = command.servo_delta;
        r.target_voltage = Some(command.target_voltage);
        r.current_mode = Some(command.current_mode);
        r.on_time_us = Some(command.on_time_us);
        r.off_time_us = Some(command.off_time_us);
        debug!(
            time_us = r.time_us,
            servo_delta = command.servo_delta,
            target_voltage = command.target_voltage,
            current_mode = %command.current_mode,
            on_time_us = command.on_time_us,
            off_time_us = command.off_time_us,
            "command applied"
        );
    }

    fn count_pulses(&mut self) {
        let status = &self.record.spark_status;
        if !status.is_fresh_pulse() {
            return;
        }
        match status.state {
            SparkState::Spark => self.spark_count += 1,
            SparkState::Short => self.short_count += 1,
            SparkState::Idle | SparkState::Rest => {}
        }
    }

    fn advance_counters(&mut self, prev_voltage: Option<f64>) {
        let r = &mut self.record;
        r.time_us += BASE_STEP_US;
        r.time_since_servo_us += BASE_STEP_US;
        if r.voltage != prev_voltage {
            r.time_since_voltage_change_us = 0;
        } else {
            r.time_since_voltage_change_us += BASE_STEP_US;
        }
        if r.spark_status.state == SparkState::Spark {
            r.time_since_spark_ignition_us += BASE_STEP_US;
            r.time_since_spark_end_us = 0;
        } else {
            r.time_since_spark_end_us += BASE_STEP_US;
            r.time_since_spark_ignition_us = 0;
        }
    }

    fn check_termination(&mut self) {
        let process = &self.config.process;
        let r = &mut self.record;
        if r.wire_position_um > r.workpiece_position_um + process.overrun_tolerance_um {
            r.is_wire_colliding = true;
        }
        if r.workpiece_position_um >= r.target_position_um {
            r.is_target_reached = true;
        }
        if r.is_terminal() {
            self.terminated = true;
            info!(
                time_us = r.time_us,
                target_reached = r.is_target_reached,
                colliding = r.is_wire_colliding,
                sparks = self.spark_count,
                shorts = self.short_count,
                "episode terminated"
            );
        }
    }

    fn outcome(&self, is_control_step: bool) -> StepOutcome {
        let r = &self.record;
        StepOutcome {
            wire_broken: r.is_wire_broken,
            target_reached: r.is_target_reached,
            wire_colliding: r.is_wire_colliding,
            spark_state: r.spark_status.state,
            time_us: r.time_us,
            is_control_step,
            terminated: self.terminated,
            snapshot: is_control_step.then(|| self.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(config: SimConfig) -> WireEdmSim {
        WireEdmSim::new(config, Arc::new(ProcessTables::builtin()), 42).unwrap()
    }

    #[test]
    fn reset_initializes_thermal_field() {
        let s = sim(SimConfig::default());
        let r = s.record();
        assert_eq!(r.wire_temperature_k.len(), s.wire().n_segments());
        assert_eq!(r.time_us, 0);
        assert_eq!(r.time_since_servo_us, 1000);
        assert_eq!(r.gap_um(), 70.0);
    }

    #[test]
    fn first_step_is_control_step() {
        let mut s = sim(SimConfig::default());
        let cmd = Command::default().with_servo_delta(0.5);
        let out = s.step(&cmd).unwrap();
        assert!(out.is_control_step);
        assert!(out.snapshot.is_some());
        assert_eq!(s.record().servo_delta, 0.5);
        assert_eq!(out.time_us, 1);

        let out = s.step(&cmd).unwrap();
        assert!(!out.is_control_step);
        assert!(out.snapshot.is_none());
    }

    #[test]
    fn control_steps_follow_servo_interval() {
        let mut config = SimConfig::default();
        config.process.servo_interval_us = 10;
        let mut s = sim(config);
        let cmd = Command::default();
        let control_times: Vec<u64> = (0..35)
            .filter_map(|_| {
                let out = s.step(&cmd).unwrap();
                out.is_control_step.then_some(out.time_us - 1)
            })
            .collect();
        assert_eq!(control_times, vec![0, 10, 20, 30]);
    }

    #[test]
    fn commands_apply_only_on_control_steps() {
        let mut s = sim(SimConfig::default());
        s.step(&Command::default().with_servo_delta(1.0)).unwrap();
        s.step(&Command::default().with_servo_delta(9.0)).unwrap();
        assert_eq!(s.record().servo_delta, 1.0);
    }

    #[test]
    fn invalid_command_is_rejected_on_control_step() {
        let mut s = sim(SimConfig::default());
        let bad = Command {
            on_time_us: -1.0,
            ..Default::default()
        };
        assert!(s.step(&bad).is_err());
    }

    #[test]
    fn control_interval_runs_to_next_boundary() {
        let mut config = SimConfig::default();
        config.process.servo_interval_us = 50;
        let mut s = sim(config);
        let out = s.run_control_interval(&Command::default()).unwrap();
        assert_eq!(out.time_us, 50);
        assert!(out.snapshot.is_some());
        let out = s.run_control_interval(&Command::default()).unwrap();
        assert_eq!(out.time_us, 100);
    }

    #[test]
    fn lazy_zone_mean_matches_snapshot() {
        let mut config = SimConfig::default();
        config.wire.compute_zone_mean_every_step = false;
        let mut s = sim(config);
        for _ in 0..100 {
            s.step(&Command::default()).unwrap();
        }
        assert_eq!(s.record().wire_mean_temperature_k, None);
        let snap = s.snapshot();
        let expected = s.wire().zone_mean_temperature(&s.record().wire_temperature_k);
        assert_eq!(snap.wire_mean_temperature_k, expected);
    }
}
