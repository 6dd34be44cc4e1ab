//! In-memory trace recording.

use crate::types::{LogFrequency, RunOutcome, Signal, TraceRow, TraceSpec};
use std::collections::BTreeMap;
use wedm_physics::SimRecord;
use wedm_sim::{Snapshot, StepOutcome, WireEdmSim};

/// Samples selected signals from a running simulation.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    spec: TraceSpec,
    rows: Vec<TraceRow>,
}

impl TraceRecorder {
    pub fn new(spec: TraceSpec) -> Self {
        Self {
            spec,
            rows: Vec::new(),
        }
    }

    pub fn spec(&self) -> &TraceSpec {
        &self.spec
    }

    /// Whether a step with this outcome is sampled. Terminal steps always are.
    pub fn should_record(&self, outcome: &StepOutcome) -> bool {
        if outcome.terminated {
            return true;
        }
        match self.spec.frequency {
            LogFrequency::EveryStep => true,
            LogFrequency::ControlStep => outcome.is_control_step,
            LogFrequency::Interval(n) => n > 0 && outcome.time_us % n == 0,
        }
    }

    pub fn observe(&mut self, sim: &WireEdmSim, outcome: &StepOutcome) {
        if !self.should_record(outcome) {
            return;
        }
        if let Some(last) = self.rows.last() {
            // A frozen terminal record repeats its time.
            if last.time_us == outcome.time_us && outcome.terminated {
                return;
            }
        }
        let snapshot = match &outcome.snapshot {
            Some(s) => s.clone(),
            None => sim.snapshot(),
        };
        self.push(&snapshot, sim.record(), outcome.is_control_step);
    }

    fn push(&mut self, snapshot: &Snapshot, record: &SimRecord, is_control_step: bool) {
        let values: BTreeMap<Signal, f64> = self
            .spec
            .signals
            .iter()
            .map(|&sig| (sig, signal_value(sig, snapshot)))
            .collect();
        let temperature_field = self
            .spec
            .temperature_field
            .then(|| record.wire_temperature_k.clone());

        self.rows.push(TraceRow {
            time_us: snapshot.time_us,
            is_control_step,
            values,
            temperature_field,
        });
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TraceRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One signal as a column; `None` if the signal was not traced.
    pub fn column(&self, signal: Signal) -> Option<Vec<f64>> {
        column(&self.rows, signal)
    }
}

/// Extract one signal from stored rows.
pub fn column(rows: &[TraceRow], signal: Signal) -> Option<Vec<f64>> {
    rows.iter()
        .map(|row| row.values.get(&signal).copied())
        .collect()
}

/// Classify how an episode ended from its last outcome.
pub fn run_outcome(outcome: &StepOutcome) -> RunOutcome {
    if outcome.wire_broken {
        RunOutcome::WireBroken
    } else if outcome.wire_colliding {
        RunOutcome::WireCollision
    } else if outcome.target_reached {
        RunOutcome::TargetReached
    } else {
        RunOutcome::StepLimit
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn signal_value(signal: Signal, s: &Snapshot) -> f64 {
    match signal {
        Signal::Voltage => s.voltage.unwrap_or(0.0),
        Signal::Current => s.current.unwrap_or(0.0),
        Signal::SparkState => f64::from(s.spark_state.code()),
        Signal::WorkpiecePosition => s.workpiece_position_um,
        Signal::WirePosition => s.wire_position_um,
        Signal::Gap => s.gap_um,
        Signal::WireVelocity => s.wire_velocity_um_per_s,
        Signal::WireMeanTemperature => s.wire_mean_temperature_k,
        Signal::WireMaxTemperature => s.wire_max_temperature_k,
        Signal::DebrisVolume => s.debris_volume_um3,
        Signal::DebrisDensity => s.debris_density,
        Signal::FlowCondition => s.flow_condition,
        Signal::IsShortCircuit => flag(s.is_short_circuit),
        Signal::ServoDelta => s.servo_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wedm_physics::ProcessTables;
    use wedm_sim::{Command, SimConfig};

    fn sim(servo_interval_us: u64) -> WireEdmSim {
        let mut config = SimConfig::default();
        config.process.servo_interval_us = servo_interval_us;
        WireEdmSim::new(config, Arc::new(ProcessTables::builtin()), 1).unwrap()
    }

    fn run(recorder: &mut TraceRecorder, sim: &mut WireEdmSim, steps: usize) {
        let cmd = Command::default();
        for _ in 0..steps {
            let out = sim.step(&cmd).unwrap();
            recorder.observe(sim, &out);
        }
    }

    #[test]
    fn control_step_frequency() {
        let mut s = sim(10);
        let mut rec = TraceRecorder::new(TraceSpec::default());
        run(&mut rec, &mut s, 50);
        assert_eq!(rec.len(), 5);
        assert!(rec.rows().iter().all(|r| r.is_control_step));
    }

    #[test]
    fn interval_frequency() {
        let mut s = sim(1000);
        let mut rec = TraceRecorder::new(TraceSpec {
            frequency: LogFrequency::Interval(25),
            ..Default::default()
        });
        run(&mut rec, &mut s, 100);
        let times: Vec<u64> = rec.rows().iter().map(|r| r.time_us).collect();
        assert_eq!(times, vec![25, 50, 75, 100]);
    }

    #[test]
    fn every_step_with_field() {
        let mut s = sim(1000);
        let mut rec = TraceRecorder::new(TraceSpec {
            signals: vec![Signal::Gap, Signal::SparkState],
            temperature_field: true,
            frequency: LogFrequency::EveryStep,
        });
        run(&mut rec, &mut s, 20);
        assert_eq!(rec.len(), 20);
        let gap = rec.column(Signal::Gap).unwrap();
        assert!(gap.iter().all(|g| (g - 70.0).abs() < 1.0));
        assert!(rec.column(Signal::Voltage).is_none());
        let field = rec.rows()[0].temperature_field.as_ref().unwrap();
        assert_eq!(field.len(), s.wire().n_segments());
    }

    #[test]
    fn parses_signal_names() {
        for sig in Signal::ALL {
            assert_eq!(sig.name().parse::<Signal>().unwrap(), sig);
        }
        assert!("entropy".parse::<Signal>().is_err());
        assert_eq!("every_step".parse::<LogFrequency>().unwrap(), LogFrequency::EveryStep);
        assert_eq!("40".parse::<LogFrequency>().unwrap(), LogFrequency::Interval(40));
        assert!("0".parse::<LogFrequency>().is_err());
    }
}
