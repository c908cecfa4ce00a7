use clap::{Parser, Subcommand};
use rcs_scenario::{
    RunOptions, RunRecord, ScenarioResult, load_record_json, load_yaml, run_scenario,
    save_record_json, save_snapshots_jsonl, scenario_id,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "rcs")]
#[command(about = "Primary coolant heatup simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
    },
    /// Run a scenario and print progress
    Run {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Print and keep every Nth tick
        #[arg(long, default_value_t = 60)]
        every: u64,
        /// Write the run record as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write kept snapshots as JSON lines
        #[arg(long)]
        jsonl: Option<PathBuf>,
    },
    /// Run a scenario and print only its fingerprint
    Fingerprint {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
    },
    /// Summarise a saved run record
    ShowRun {
        /// Path to a run record written by `run --json`
        record_path: PathBuf,
    },
}

fn main() -> ScenarioResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            every,
            json,
            jsonl,
        } => cmd_run(&scenario_path, every, json.as_deref(), jsonl.as_deref()),
        Commands::Fingerprint { scenario_path } => cmd_fingerprint(&scenario_path),
        Commands::ShowRun { record_path } => cmd_show_run(&record_path),
    }
}

fn cmd_validate(scenario_path: &Path) -> ScenarioResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = load_yaml(scenario_path)?;
    println!("✓ Scenario is valid");
    println!("  Name: {}", scenario.name);
    println!("  Ticks: {}", scenario.tick_count());
    println!("  Schedule segments: {}", scenario.schedule.len());
    println!("  ID: {}", scenario_id(&scenario)?);
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    every: u64,
    json: Option<&Path>,
    jsonl: Option<&Path>,
) -> ScenarioResult<()> {
    let scenario = load_yaml(scenario_path)?;
    println!("Running scenario: {}", scenario.name);
    println!(
        "  dt = {:.3} s, duration = {:.1} s",
        scenario.plant.dt_seconds(),
        scenario.duration_s
    );

    let started = Instant::now();
    let record = run_scenario(&scenario, &RunOptions { record_every: every })?;
    let elapsed = started.elapsed();

    for snap in &record.snapshots {
        println!("  {}", snap.summary());
    }
    println!("✓ Simulation completed in {:.2} s", elapsed.as_secs_f64());
    print_summary(&record);

    if let Some(path) = json {
        save_record_json(path, &record)?;
        println!("  Record written to {}", path.display());
    }
    if let Some(path) = jsonl {
        save_snapshots_jsonl(path, &record)?;
        println!("  Snapshots written to {}", path.display());
    }
    Ok(())
}

fn cmd_fingerprint(scenario_path: &Path) -> ScenarioResult<()> {
    let scenario = load_yaml(scenario_path)?;
    let record = run_scenario(&scenario, &RunOptions { record_every: u64::MAX })?;
    println!("{}", record.fingerprint);
    Ok(())
}

fn cmd_show_run(record_path: &Path) -> ScenarioResult<()> {
    let record = load_record_json(record_path)?;
    println!("Run of scenario: {}", record.scenario);
    print_summary(&record);
    if let Some(last) = record.snapshots.last() {
        println!("  Final: {}", last.summary());
    }
    Ok(())
}

fn print_summary(record: &RunRecord) {
    let s = &record.summary;
    println!("  Ticks: {}", s.ticks);
    println!("  Final mode: {}", s.final_mode);
    println!(
        "  Pressure range: {:.2} .. {:.2} psia",
        s.min_pressure_psia, s.max_pressure_psia
    );
    println!("  Final RCS temperature: {:.1} F", s.final_rcs_temperature_f);
    match s.bubble_tick {
        Some(tick) => println!("  Bubble formed at tick {tick}"),
        None => println!("  No bubble formed"),
    }
    println!(
        "  Audit: {} violations, max residual {:.3e} lbm",
        s.audit_violations, s.max_audit_residual_lbm
    );
    if s.relief_ticks > 0 {
        println!("  Relief valve passed flow on {} ticks", s.relief_ticks);
    }
    if s.solver_fallbacks > 0 {
        println!("  Coupled solver fell back on {} ticks", s.solver_fallbacks);
    }
    println!("  Transitions: {}", record.transitions.len());
    for event in &record.transitions {
        println!(
            "    tick {:>5}: {} -> {} ({:?} -> {:?}, {:.2} psi jump)",
            event.tick,
            event.from_mode,
            event.to_mode,
            event.from_model,
            event.to_model,
            event.pressure_jump()
        );
    }
    println!("  Fingerprint: {}", record.fingerprint);
}
