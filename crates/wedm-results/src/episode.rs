//! Drive one episode under a policy while recording its trace.

use crate::hash::compute_run_id;
use crate::recorder::{TraceRecorder, run_outcome};
use crate::types::{RunManifest, RunOutcome, TraceRow, TraceSpec};
use crate::ResultsResult;
use chrono::Utc;
use tracing::info;
use wedm_core::timing::Timer;
use wedm_sim::{Command, Snapshot, WireEdmSim};

#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub manifest: RunManifest,
    pub rows: Vec<TraceRow>,
}

/// Step `sim` for at most `max_steps` base steps. `policy` is asked for a new
/// command right before every control step, given the current snapshot.
pub fn record_episode<P>(
    sim: &mut WireEdmSim,
    label: &str,
    max_steps: u64,
    trace: TraceSpec,
    mut policy: P,
) -> ResultsResult<RecordedRun>
where
    P: FnMut(&Snapshot) -> Command,
{
    let run_id = compute_run_id(sim.config(), sim.seed(), max_steps, &trace);
    let mut recorder = TraceRecorder::new(trace.clone());
    let timer = Timer::start("episode");

    let mut command = Command::default();
    let mut steps_run = 0;
    let mut outcome = RunOutcome::StepLimit;
    while steps_run < max_steps {
        if sim.is_control_step_due() {
            command = policy(&sim.snapshot());
        }
        let step = sim.step(&command)?;
        steps_run += 1;
        recorder.observe(sim, &step);
        if step.terminated {
            outcome = run_outcome(&step);
            break;
        }
    }

    let rtf = timer.stop(sim.record().time_us);
    info!(
        %run_id,
        steps_run,
        ?outcome,
        real_time_factor = rtf.ratio(),
        "episode recorded"
    );

    let manifest = RunManifest {
        run_id,
        label: label.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        seed: sim.seed(),
        max_steps,
        steps_run,
        outcome,
        spark_count: sim.spark_count(),
        short_count: sim.short_count(),
        trace,
        real_time_factor: rtf.ratio().is_finite().then(|| rtf.ratio()),
    };
    Ok(RecordedRun {
        manifest,
        rows: recorder.into_rows(),
    })
}
