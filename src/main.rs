use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use rand::prelude::*;
use rusty_ekmc::defaults::CONFIG_FILE_NAME;
use rusty_ekmc::dynamics::{run_ensemble, run_in_directory, EnsembleSummary, RunOutcome};
use rusty_ekmc::initialization::{EkmcConfiguration, SystemData};
use rusty_ekmc::neighbours::NeighbourCatalogue;
use rusty_ekmc::postprocessing::process_results;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exciton kinetic Monte Carlo in molecular crystals
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// configuration file, written with the default settings if it does not exist
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// print level from -2 (errors only) to 2 (trace), overrides the configuration
    #[clap(short, long, allow_hyphen_values = true)]
    verbose: Option<i8>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// run or resume a single exciton walk
    Run {
        /// folder of the trajectory log
        #[clap(default_value = ".", parse(from_os_str))]
        directory: PathBuf,
    },
    /// run an ensemble of independent walks in parallel
    Ensemble {
        /// folder that receives one Simulation_<i> folder per walk
        #[clap(default_value = ".", parse(from_os_str))]
        output: PathBuf,
    },
    /// compute diffusion and energy observables from finished walks
    Process {
        /// folder searched recursively for trajectory logs
        #[clap(default_value = ".", parse(from_os_str))]
        input: PathBuf,
        /// result folder, defaults to the configured output folder
        #[clap(parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli: Cli = Cli::parse();

    // read the configuration file, if it does not exist in the directory
    // the program initializes the default settings and writes a configuration file
    // to the directory
    let config_path: PathBuf = cli
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config: EkmcConfiguration = EkmcConfiguration::from_path(&config_path)
        .with_context(|| format!("cannot load the configuration {:?}", config_path))?;

    let log_level: LevelFilter = match cli.verbose.unwrap_or(config.verbose) {
        2 => LevelFilter::Trace,
        1 => LevelFilter::Debug,
        0 => LevelFilter::Info,
        -1 => LevelFilter::Warn,
        -2 => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    Builder::new()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter(None, log_level)
        .init();

    let system: SystemData = SystemData::from_file(Path::new(&config.setup_data_path))
        .with_context(|| format!("cannot load the setup data {:?}", config.setup_data_path))?;
    info!("{} molecules per unit cell", system.molecules.len());

    match cli.command {
        Command::Run { directory } => {
            let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config)
                .context("cannot build the neighbour catalogue")?;
            let seed: u64 = config.seed.unwrap_or_else(|| {
                let seed: u64 = StdRng::from_entropy().gen();
                info!("no seed given, the walk uses the seed {}", seed);
                seed
            });
            let outcome: RunOutcome = run_in_directory(
                &config,
                &system,
                &catalogue,
                &directory,
                config.temp_folder_path.as_deref().map(Path::new),
                seed,
            )
            .with_context(|| format!("the walk in {:?} failed", directory))?;
            match outcome {
                RunOutcome::Completed(summary) => info!(
                    "finished ({:?}) after {} steps at {} ps",
                    summary.state, summary.steps, summary.time
                ),
                RunOutcome::AlreadyFinished(summary) => info!(
                    "nothing to do, the walk already finished after {} steps at {} ps",
                    summary.steps, summary.time
                ),
            }
        }
        Command::Ensemble { output } => {
            let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config)
                .context("cannot build the neighbour catalogue")?;
            let summary: EnsembleSummary = run_ensemble(&config, &system, &catalogue, &output)
                .with_context(|| format!("the ensemble in {:?} failed", output))?;
            info!(
                "{} of {} walks finished (base seed {})",
                summary.n_completed(),
                summary.outcomes.len(),
                summary.base_seed
            );
        }
        Command::Process { input, output } => {
            let output: PathBuf =
                output.unwrap_or_else(|| input.join(&config.postprocessing.output_folder));
            process_results(&config, &system, &input, &output)
                .with_context(|| format!("cannot process the walks below {:?}", input))?;
        }
    }
    Ok(())
}
