use std::sync::Arc;

use wedm_physics::ProcessTables;
use wedm_results::{
    LogFrequency, ResultsError, RunOutcome, RunStore, Signal, TraceSpec, record_episode,
};
use wedm_sim::{Command, SimConfig, WireEdmSim};

fn short_episode(seed: u64) -> wedm_results::RecordedRun {
    let mut config = SimConfig::default();
    config.process.servo_interval_us = 100;
    let mut sim =
        WireEdmSim::new(config, Arc::new(ProcessTables::builtin()), seed).expect("sim");
    let trace = TraceSpec {
        signals: vec![Signal::Gap, Signal::Voltage, Signal::SparkState],
        temperature_field: true,
        frequency: LogFrequency::ControlStep,
    };
    record_episode(&mut sim, "persist", 1000, trace, |_| Command::default())
        .expect("episode")
}

#[test]
fn recorded_run_round_trips_through_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RunStore::new(dir.path().join("runs")).expect("store");

    let run = short_episode(3);
    assert_eq!(run.manifest.steps_run, 1000);
    assert_eq!(run.manifest.outcome, RunOutcome::StepLimit);
    assert_eq!(run.rows.len(), 10);

    store.save_run(&run.manifest, &run.rows).expect("save");
    assert!(store.has_run(&run.manifest.run_id));

    let manifest = store.load_manifest(&run.manifest.run_id).expect("manifest");
    assert_eq!(manifest, run.manifest);
    let rows = store.load_trace(&run.manifest.run_id).expect("trace");
    assert_eq!(rows, run.rows);

    let runs = store.list_runs().expect("list");
    assert_eq!(runs.len(), 1);

    store.delete_run(&run.manifest.run_id).expect("delete");
    assert!(!store.has_run(&run.manifest.run_id));
}

#[test]
fn run_ids_are_content_hashes() {
    let a = short_episode(3);
    let b = short_episode(3);
    let c = short_episode(4);
    assert_eq!(a.manifest.run_id, b.manifest.run_id);
    assert_ne!(a.manifest.run_id, c.manifest.run_id);
    assert_eq!(a.rows, b.rows);
}

#[test]
fn missing_run_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RunStore::new(dir.path().to_path_buf()).expect("store");
    assert!(matches!(
        store.load_manifest("nope"),
        Err(ResultsError::RunNotFound { .. })
    ));
}
