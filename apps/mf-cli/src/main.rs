use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mf_entropy::EntropyAnalysis;
use mf_results::{
    EntropySummary, FlowSummary, InflowSummary, InventorySummary, RunIdInputs, RunManifest,
    RunStore, SimulationSummary, SummaryStatistics, compute_run_id,
};
use mf_sim::{SimOptions, Simulator};
use tracing::info;

mod scenarios;

#[derive(Parser)]
#[command(name = "mf-cli")]
#[command(about = "massflow CLI - probabilistic material-flow simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in demo scenarios
    Scenarios,
    /// Run a scenario and print (or store) the summary
    Run {
        /// Scenario name (see `scenarios`)
        scenario: String,
        /// Number of Monte-Carlo runs
        #[arg(long, default_value_t = 100)]
        runs: usize,
        /// Number of simulated periods
        #[arg(long, default_value_t = 25)]
        periods: usize,
        /// Seed for all probability distributions
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Fan runs out over the thread pool
        #[arg(long)]
        parallel: bool,
        /// Include per-period medians in the summary
        #[arg(long)]
        median: bool,
        /// Percentiles to include (repeatable)
        #[arg(long = "percentile")]
        percentiles: Vec<f64>,
        /// Store the run under this directory instead of printing
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show a stored run
    ShowRun {
        /// Result store directory
        out: PathBuf,
        /// Run ID to display
        run_id: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scenarios => cmd_scenarios(),
        Commands::Run {
            scenario,
            runs,
            periods,
            seed,
            parallel,
            median,
            percentiles,
            out,
        } => cmd_run(
            &scenario,
            SimOptions {
                runs,
                periods,
                seed,
                parallel,
                ..SimOptions::default()
            },
            median,
            &percentiles,
            out,
        ),
        Commands::ShowRun { out, run_id } => cmd_show_run(&out, &run_id),
    }
}

fn cmd_scenarios() -> Result<(), Box<dyn Error>> {
    for scenario in scenarios::SCENARIOS {
        println!("{:16} {}", scenario.name, scenario.description);
    }
    Ok(())
}

fn cmd_run(
    scenario: &str,
    options: SimOptions,
    median: bool,
    percentiles: &[f64],
    out: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let periods = options.periods;
    let model = scenarios::build(scenario, periods)
        .ok_or_else(|| format!("unknown scenario '{scenario}', try `mf-cli scenarios`"))?;

    let mut sim = Simulator::new(options.clone())?;
    sim.set_model(&model)?;
    sim.run()?;

    let mut summary = SimulationSummary::default();
    for (compartment, record) in sim.logged_inflows() {
        summary.inflows.push(InflowSummary {
            compartment: compartment.to_string(),
            stats: SummaryStatistics::from_record(record, median, percentiles),
        });
    }
    for (source, targets) in sim.logged_flows() {
        for (target, record) in targets {
            summary.flows.push(FlowSummary {
                source: source.to_string(),
                target: target.to_string(),
                stats: SummaryStatistics::from_record(record, median, percentiles),
            });
        }
    }
    for (compartment, record) in sim.all_stocked_material() {
        summary.inventories.push(InventorySummary {
            compartment: compartment.to_string(),
            stats: SummaryStatistics::from_record(record, median, percentiles),
        });
    }

    if let Some((h_max, series)) = scenarios::entropy_inputs(scenario, &sim, periods) {
        let analysis = EntropyAnalysis::new(h_max, periods, &series, &[])?;
        for (stage, values) in analysis.compute().iter() {
            summary.entropy.push(EntropySummary {
                stage,
                values: values.to_vec(),
            });
        }
    }

    match out {
        Some(root) => {
            let run_id = compute_run_id(&RunIdInputs {
                model: scenario,
                seed: options.seed,
                runs: options.runs,
                periods,
                engine_version: env!("CARGO_PKG_VERSION"),
            });
            let manifest = RunManifest {
                run_id: run_id.clone(),
                model: scenario.to_string(),
                seed: options.seed,
                runs: options.runs,
                periods,
                timestamp: chrono::Utc::now().to_rfc3339(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            };
            let store = RunStore::new(root)?;
            store.save_run(&manifest, &summary)?;
            info!(run_id = %run_id, "run stored");
            println!("{run_id}");
        }
        None => {
            println!("{}", serde_json_pretty(&summary)?);
        }
    }
    Ok(())
}

fn cmd_show_run(out: &PathBuf, run_id: &str) -> Result<(), Box<dyn Error>> {
    let store = RunStore::new(out.clone())?;
    let manifest = store.load_manifest(run_id)?;
    let summary = store.load_summary(run_id)?;
    println!("{}", serde_json_pretty(&manifest)?);
    println!("{}", serde_json_pretty(&summary)?);
    Ok(())
}

fn serde_json_pretty<T: serde::Serialize>(value: &T) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}
