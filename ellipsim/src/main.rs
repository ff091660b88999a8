use ellipsim::{ScenarioConfig, Scenario, Simulation, SimError};
use ellipsim::{bench_detector, bench_integrator, bench_run};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, long, default_value = "default.yaml")]
    file_name: String,

    /// Run the timing sweeps instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("cannot open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("cannot parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_integrator();
        bench_detector();
        bench_run();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let scenario = Scenario::build_scenario(scenario_cfg)?;
    let simulation = Simulation::from_scenario(scenario)?;

    let output = match simulation.run() {
        Ok(output) => output,
        Err(SimError::NumericalInstability { time, reason, last_snapshot }) => {
            if let Some(snapshot) = &last_snapshot {
                error!(
                    "last valid snapshot at t = {:.6} (step {}), energy {:.9e}",
                    snapshot.time,
                    snapshot.step,
                    snapshot.total_energy()
                );
            }
            anyhow::bail!("run aborted at t = {time}: {reason}");
        }
        Err(e) => return Err(e.into()),
    };

    let s = &output.summary;
    info!("{} snapshots recorded, {} dropped", output.snapshots.len(), s.snapshots_dropped);
    println!(
        "t = {:.6}, steps = {}, collisions = {}, grazing = {}, micro steps = {}",
        s.final_time, s.steps, s.collisions, s.grazing, s.micro_steps
    );
    println!(
        "E = {:.12e}, drift = {:.3e}, max |drift| = {:.3e}, projections = {}, warnings = {}",
        s.final_energy,
        s.final_drift,
        output.conservation.max_abs_drift(),
        s.projections,
        s.drift_warnings
    );
    println!("wall clock = {:.3} s", s.wall_clock_secs);

    Ok(())
}
