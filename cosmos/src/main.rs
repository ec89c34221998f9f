use cosmos::{load_settings, SimulationEngine, SimulationSettings};
use cosmos::{bench_gravity, bench_step};
use cosmos::simulation::diagnostics::{kinetic_energy, total_momentum};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(about = "Barnes-Hut N-body solver")]
struct Args {
    /// Settings file under `scenarios/`
    #[arg(short, long = "file", default_value = "galaxy.yaml")]
    file_name: String,

    /// Number of steps to run
    #[arg(short, long, default_value_t = 100)]
    steps: u64,

    /// Log a summary every N steps
    #[arg(long, default_value_t = 10)]
    report_every: u64,

    /// Run the benchmarks instead of a simulation
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_settings_from_yaml(file_name: &str) -> Result<SimulationSettings> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    load_settings(&config_path).with_context(|| format!("loading {}", config_path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.bench {
        bench_gravity();
        bench_step();
        return Ok(());
    }

    let settings = load_settings_from_yaml(&args.file_name)?;

    let mut engine = SimulationEngine::new();
    engine.reset(&settings);

    let report_every = args.report_every.max(1);
    let started = Instant::now();
    let mut collisions = 0;
    let mut absorbed = 0;

    for _ in 0..args.steps {
        let report = engine.step(&settings);
        collisions += report.collisions;
        absorbed += report.absorbed;

        if engine.frame() % report_every == 0 {
            let particles = engine.particles();
            info!(
                "frame {:5}  t = {:8.4}  n = {:7}  KE = {:12.5e}  |p| = {:10.4e}  collisions = {}  absorbed = {}",
                engine.frame(),
                engine.time(),
                particles.len(),
                kinetic_energy(particles),
                total_momentum(particles).norm(),
                collisions,
                absorbed,
            );
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "ran {} steps in {:.3} s ({:.2} ms/step)",
        args.steps,
        elapsed,
        1000.0 * elapsed / args.steps.max(1) as f64
    );

    Ok(())
}
