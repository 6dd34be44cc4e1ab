mod controller;
mod error;

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wedm_core::timing::{AccumulatingTimer, Timer};
use wedm_physics::{CurrentMode, ProcessTables, lambda_closed_form};
use wedm_results::recorder::column;
use wedm_results::{
    LogFrequency, RecordedRun, RunStore, Signal, TraceSpec, record_episode,
};
use wedm_sim::{Command, SimConfig, WireEdmSim};

use controller::{GapController, GapControllerState};
use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "wedm-cli")]
#[command(about = "Wire-EDM micro-physics simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config (and optional tables) and print derived quantities
    Validate {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run one seeded episode under the gap controller
    Run {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        episode: EpisodeArgs,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Persist the trace into this run store
        #[arg(long)]
        store: Option<PathBuf>,
        /// every_step, control_step or an interval in µs
        #[arg(long, default_value = "control_step")]
        log_frequency: String,
        /// Comma-separated signal names (default: all)
        #[arg(long, value_delimiter = ',')]
        signals: Vec<String>,
        /// Also record the full wire temperature field
        #[arg(long)]
        temperature_field: bool,
    },
    /// Run independent seeds in parallel and summarize them
    Batch {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        episode: EpisodeArgs,
        #[arg(long, default_value_t = 0)]
        first_seed: u64,
        #[arg(long, default_value_t = 8)]
        seeds: u64,
    },
    /// List stored runs
    Runs {
        store: PathBuf,
    },
    /// Show one stored run
    ShowRun {
        store: PathBuf,
        run_id: String,
    },
    /// Export one traced signal as CSV
    ExportSeries {
        store: PathBuf,
        run_id: String,
        signal: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct ModelArgs {
    /// Simulation config (YAML or JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Peak-current table (JSON), requires --craters
    #[arg(long, requires = "craters")]
    currents: Option<PathBuf>,
    /// Crater statistics table (JSON), requires --currents
    #[arg(long, requires = "currents")]
    craters: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct EpisodeArgs {
    /// Simulated time budget (ms)
    #[arg(long, default_value_t = 100)]
    max_ms: u64,
    /// Gap held by the servo controller (µm)
    #[arg(long, default_value_t = 20.0)]
    target_gap: f64,
    #[arg(long, default_value = "I5")]
    current_mode: String,
    #[arg(long, default_value_t = 80.0)]
    voltage: f64,
    #[arg(long, default_value_t = 3.0)]
    on_time: f64,
    #[arg(long, default_value_t = 80.0)]
    off_time: f64,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { model } => cmd_validate(&model),
        Commands::Run {
            model,
            episode,
            seed,
            store,
            log_frequency,
            signals,
            temperature_field,
        } => {
            let trace = trace_spec(&log_frequency, &signals, temperature_field)?;
            cmd_run(&model, &episode, seed, store.as_deref(), trace)
        }
        Commands::Batch {
            model,
            episode,
            first_seed,
            seeds,
        } => cmd_batch(&model, &episode, first_seed, seeds),
        Commands::Runs { store } => cmd_runs(&store),
        Commands::ShowRun { store, run_id } => cmd_show_run(&store, &run_id),
        Commands::ExportSeries {
            store,
            run_id,
            signal,
            output,
        } => cmd_export_series(&store, &run_id, &signal, output.as_deref()),
    }
}

fn load_model(model: &ModelArgs) -> CliResult<(SimConfig, Arc<ProcessTables>)> {
    let config = match &model.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig::default(),
    };
    let tables = match (&model.currents, &model.craters) {
        (Some(currents), Some(craters)) => ProcessTables::from_json_paths(currents, craters)?,
        _ => ProcessTables::builtin(),
    };
    Ok((config, Arc::new(tables)))
}

fn trace_spec(frequency: &str, signals: &[String], temperature_field: bool) -> CliResult<TraceSpec> {
    let frequency: LogFrequency = frequency.parse()?;
    let signals = if signals.is_empty() {
        Signal::ALL.to_vec()
    } else {
        signals
            .iter()
            .map(|s| s.parse::<Signal>())
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(TraceSpec {
        signals,
        temperature_field,
        frequency,
    })
}

fn base_command(episode: &EpisodeArgs) -> CliResult<Command> {
    let current_mode = CurrentMode::parse_or_default(&episode.current_mode);
    let command = Command {
        servo_delta: 0.0,
        target_voltage: episode.voltage,
        current_mode,
        on_time_us: episode.on_time,
        off_time_us: episode.off_time,
    };
    command.validate()?;
    Ok(command)
}

fn run_episode(
    config: SimConfig,
    tables: Arc<ProcessTables>,
    episode: &EpisodeArgs,
    seed: u64,
    trace: TraceSpec,
) -> CliResult<RecordedRun> {
    let base = base_command(episode)?;
    let dt_s = config.process.servo_interval_us as f64 * 1e-6;
    let controller = GapController::new(episode.target_gap, 0.05, 0.05, -2.0, 2.0)?
        .with_integral_limit(5.0);
    let max_steps = episode.max_ms.saturating_mul(1000);

    let mut sim = WireEdmSim::new(config, tables, seed)?;
    let mut state = GapControllerState::default();
    let run = record_episode(&mut sim, "gap-controller", max_steps, trace, |snapshot| {
        let (next, delta) = controller.update(&state, snapshot.gap_um, dt_s);
        state = next;
        base.with_servo_delta(delta)
    })?;
    Ok(run)
}

fn cmd_validate(model: &ModelArgs) -> CliResult<()> {
    let (config, tables) = load_model(model)?;
    config.validate()?;

    let wire = wedm_physics::WireThermalModule::new(config.wire.clone(), config.geometry())?;
    let gap = config.process.initial_gap_um();
    println!("✓ Configuration is valid");
    println!("  Wire segments:     {}", wire.n_segments());
    println!("  Work zone:         {:?}", wire.zone_range());
    println!(
        "  Stability number:  {:.3e}",
        wire.stability_number(config.process.wire_unwind_velocity_um_per_us)
    );
    println!("  Initial gap:       {:.2} µm", gap);
    if gap > config.ignition.hard_short_gap_um {
        println!("  λ(initial gap):    {:.3e} /µs", lambda_closed_form(gap));
    } else {
        println!("  Initial gap is inside the hard-short zone");
    }
    println!("  Current modes:     {}", tables.modes().count());
    Ok(())
}

fn cmd_run(
    model: &ModelArgs,
    episode: &EpisodeArgs,
    seed: u64,
    store: Option<&Path>,
    trace: TraceSpec,
) -> CliResult<()> {
    let (config, tables) = load_model(model)?;
    println!("Running seed {} for up to {} ms", seed, episode.max_ms);

    let run = run_episode(config, tables, episode, seed, trace)?;
    print_manifest(&run.manifest);

    if let Some(dir) = store {
        let store = RunStore::new(dir.to_path_buf())?;
        store.save_run(&run.manifest, &run.rows)?;
        println!("✓ Saved run {} ({} rows)", run.manifest.run_id, run.rows.len());
    }
    Ok(())
}

fn cmd_batch(model: &ModelArgs, episode: &EpisodeArgs, first_seed: u64, seeds: u64) -> CliResult<()> {
    let (config, tables) = load_model(model)?;
    config.validate()?;
    println!("Running {} seeds in parallel", seeds);

    let timer = Timer::start("batch");
    let wall = AccumulatingTimer::default();
    let trace = TraceSpec {
        signals: vec![Signal::Gap],
        temperature_field: false,
        frequency: LogFrequency::ControlStep,
    };
    let runs: Vec<RecordedRun> = (first_seed..first_seed + seeds)
        .into_par_iter()
        .map(|seed| {
            let t = Timer::start("seed");
            let run = run_episode(config.clone(), Arc::clone(&tables), episode, seed, trace.clone())?;
            wall.record(t.stop(run.manifest.steps_run));
            Ok(run)
        })
        .collect::<CliResult<_>>()?;
    let batch_wall_s = timer.elapsed_s();

    println!("{:>6}  {:>16}  {:>8}  {:>8}  {:>8}", "seed", "outcome", "steps", "sparks", "shorts");
    for run in &runs {
        let m = &run.manifest;
        println!(
            "{:>6}  {:>16}  {:>8}  {:>8}  {:>8}",
            m.seed,
            format!("{:?}", m.outcome),
            m.steps_run,
            m.spark_count,
            m.short_count
        );
    }
    let total = wall.total();
    println!(
        "\nSimulated {:.1} ms in {:.2} s wall ({:.0} steps/s per worker)",
        total.simulated_us as f64 * 1e-3,
        batch_wall_s,
        total.steps_per_second()
    );
    Ok(())
}

fn print_manifest(m: &wedm_results::RunManifest) {
    println!("  Run id:     {}", m.run_id);
    println!("  Outcome:    {:?}", m.outcome);
    println!("  Steps:      {} / {}", m.steps_run, m.max_steps);
    println!("  Sparks:     {}", m.spark_count);
    println!("  Shorts:     {}", m.short_count);
    if let Some(rtf) = m.real_time_factor {
        println!("  Real-time:  {:.1}x", rtf);
    }
}

fn cmd_runs(store: &Path) -> CliResult<()> {
    let store = RunStore::new(store.to_path_buf())?;
    let runs = store.list_runs()?;
    if runs.is_empty() {
        println!("No stored runs");
    } else {
        for m in runs {
            println!(
                "  {}  seed={}  {:?}  {}",
                m.run_id, m.seed, m.outcome, m.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_run(store: &Path, run_id: &str) -> CliResult<()> {
    let store = RunStore::new(store.to_path_buf())?;
    let manifest = store.load_manifest(run_id)?;
    let rows = store.load_trace(run_id)?;
    print_manifest(&manifest);
    println!("  Trace rows: {}", rows.len());
    println!("  Signals:    {:?}", manifest.trace.signals);
    Ok(())
}

fn cmd_export_series(store: &Path, run_id: &str, signal: &str, output: Option<&Path>) -> CliResult<()> {
    let store = RunStore::new(store.to_path_buf())?;
    let signal: Signal = signal.parse()?;
    let rows = store.load_trace(run_id)?;
    let values = column(&rows, signal).ok_or(CliError::InvalidArg {
        what: "signal was not traced in this run",
    })?;

    let mut csv = format!("time_us,{}\n", signal);
    for (row, value) in rows.iter().zip(values) {
        csv.push_str(&format!("{},{}\n", row.time_us, value));
    }

    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            println!("✓ Exported {} rows to {}", rows.len(), path.display());
        }
        None => {
            io::stdout().write_all(csv.as_bytes())?;
        }
    }
    Ok(())
}
