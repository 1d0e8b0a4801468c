use crate::defaults::SIMULATION_FOLDER_PREFIX;
use crate::dynamics::{run_in_directory, RunOutcome};
use crate::error::{EkmcError, Result};
use crate::initialization::{EkmcConfiguration, SystemData};
use crate::neighbours::NeighbourCatalogue;
use log::{debug, error, info, warn};
use rand::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Outcome of all walkers of an ensemble, in walker order.
#[derive(Debug)]
pub struct EnsembleSummary {
    pub base_seed: u64,
    pub outcomes: Vec<Option<RunOutcome>>,
    pub n_failed: usize,
}

impl EnsembleSummary {
    pub fn n_completed(&self) -> usize {
        self.outcomes.len() - self.n_failed
    }
}

pub fn simulation_folder(output_directory: &Path, index: usize) -> PathBuf {
    output_directory.join(format!("{}{}", SIMULATION_FOLDER_PREFIX, index))
}

/// Runs `number_of_simulations` independent walkers in parallel. Walker `i`
/// lives in `Simulation_i` and is seeded with `base_seed + i`. A failed
/// walker is logged and counted; the ensemble fails only if all walkers fail.
pub fn run_ensemble(
    config: &EkmcConfiguration,
    system: &SystemData,
    catalogue: &NeighbourCatalogue,
    output_directory: &Path,
) -> Result<EnsembleSummary> {
    let base_seed: u64 = match config.seed {
        Some(seed) => seed,
        None => {
            let seed: u64 = StdRng::from_entropy().gen();
            info!("no seed given, the ensemble uses the base seed {}", seed);
            seed
        }
    };
    let n_simulations: usize = config.number_of_simulations;
    let pool: rayon::ThreadPool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.number_of_cpus)
        .build()
        .map_err(|err| EkmcError::Configuration(format!("cannot start the thread pool: {}", err)))?;
    info!(
        "run {} walkers on {} threads",
        n_simulations,
        pool.current_num_threads()
    );
    match (config.mem.as_ref(), config.mem_per_cpu.as_ref()) {
        (Some(mem), _) => debug!("memory request of the ensemble: {}", mem),
        (_, Some(mem)) => debug!("memory request per thread: {}", mem),
        _ => {}
    }

    let results: Vec<Result<RunOutcome>> = pool.install(|| {
        (0..n_simulations)
            .into_par_iter()
            .map(|index| {
                let directory: PathBuf = simulation_folder(output_directory, index);
                let scratch: Option<PathBuf> = config
                    .temp_folder_path
                    .as_ref()
                    .map(|folder| simulation_folder(Path::new(folder), index));
                run_in_directory(
                    config,
                    system,
                    catalogue,
                    &directory,
                    scratch.as_deref(),
                    base_seed.wrapping_add(index as u64),
                )
            })
            .collect()
    });

    let mut outcomes: Vec<Option<RunOutcome>> = Vec::with_capacity(n_simulations);
    let mut first_error: Option<EkmcError> = None;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(outcome) => outcomes.push(Some(outcome)),
            Err(err) => {
                error!("walker {} failed: {}", index, err);
                outcomes.push(None);
                first_error.get_or_insert(err);
            }
        }
    }
    let n_failed: usize = outcomes.iter().filter(|outcome| outcome.is_none()).count();
    if n_failed == n_simulations {
        if let Some(err) = first_error {
            return Err(err);
        }
    }
    if n_failed > 0 {
        warn!("{} of {} walkers failed", n_failed, n_simulations);
    }
    info!("{} walkers finished", n_simulations - n_failed);
    Ok(EnsembleSummary {
        base_seed,
        outcomes,
        n_failed,
    })
}
