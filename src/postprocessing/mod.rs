pub use diffusion::*;
pub use hopping_probabilities::*;
pub use sampling::*;
pub use time_average::*;
pub use trajectory::*;

pub mod diffusion;
pub mod hopping_probabilities;
pub mod sampling;
pub mod time_average;
pub mod trajectory;

use crate::defaults::RATE_CONSTANTS_FILE_NAME;
use crate::error::{EkmcError, Result};
use crate::initialization::{EkmcConfiguration, PostProcessingConfiguration, SystemData};
use crate::output::{write_hopping_probabilities, write_results};
use log::{debug, info, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub struct PostProcessingResult {
    pub points: Vec<DiffusionPoint>,
    pub summary: TimeAveragedSummary,
    /// empty if no walker logged its rate constants
    pub hopping_probabilities: Vec<HopProbability>,
}

/// Reads every trajectory log below `input_folder`, computes the ensemble
/// observables on the time grid and writes them to `output_folder`. Rate
/// constant logs found next to the trajectories are reduced to the average
/// hopping probabilities.
pub fn process_results(
    config: &EkmcConfiguration,
    system: &SystemData,
    input_folder: &Path,
    output_folder: &Path,
) -> Result<PostProcessingResult> {
    let post: &PostProcessingConfiguration = &config.postprocessing;
    let paths: Vec<PathBuf> = find_trajectory_files(input_folder)?;
    info!("found {} trajectory logs below {:?}", paths.len(), input_folder);
    let trajectories: Vec<Trajectory> = paths
        .par_iter()
        .map(|path| Trajectory::from_file(path))
        .collect::<Result<Vec<Trajectory>>>()?
        .into_iter()
        .filter(|trajectory| {
            if trajectory.records.is_empty() {
                warn!("skip {:?}, it holds no records", trajectory.path);
            }
            !trajectory.records.is_empty()
        })
        .collect();
    if trajectories.is_empty() {
        return Err(EkmcError::Statistics(format!(
            "no trajectory with records below {:?}",
            input_folder
        )));
    }

    let shortest: f64 = trajectories
        .iter()
        .map(|trajectory| trajectory.end_time())
        .fold(f64::INFINITY, f64::min);
    let end_time: f64 = match config.sim_time_limit.0 {
        Some(limit) if limit <= shortest => limit,
        Some(limit) => {
            warn!(
                "the shortest trajectory ends at {} ps, before the time limit of {} ps",
                shortest, limit
            );
            shortest
        }
        None => shortest,
    };
    let grid: Array1<f64> = time_grid(end_time, post.no_of_times_to_sample);
    info!(
        "sample {} trajectories at {} times up to {} ps",
        trajectories.len(),
        grid.len(),
        end_time
    );

    let samples: Vec<SampledTrajectory> = trajectories
        .par_iter()
        .map(|trajectory| sample_trajectory(trajectory, grid.view(), system))
        .collect::<Result<Vec<SampledTrajectory>>>()?;
    let points: Vec<DiffusionPoint> = ensemble_observables(&samples, grid.view())?;
    let step_weighted: Array2<f64> = step_weighted_tensor(&trajectories)?;
    info!(
        "time average over [{}, {}] ps",
        post.time_average_start, post.time_average_end
    );
    let summary: TimeAveragedSummary = time_averaged_summary(
        &points,
        trajectories.len(),
        post.time_average_start,
        post.time_average_end,
        post.confidence_level,
        TensorComponents::from_tensor(&step_weighted),
    )?;
    write_results(output_folder, &points, &summary)?;

    let rate_logs: Vec<PathBuf> = find_files(input_folder, RATE_CONSTANTS_FILE_NAME)?;
    let hopping_probabilities: Vec<HopProbability> = if rate_logs.is_empty() {
        debug!("no rate constant logs below {:?}", input_folder);
        Vec::new()
    } else {
        info!("average the hopping probabilities of {} rate constant logs", rate_logs.len());
        let probabilities: Vec<HopProbability> = average_hopping_probabilities(&rate_logs)?;
        write_hopping_probabilities(output_folder, &probabilities)?;
        probabilities
    };
    info!("results written to {:?}", output_folder);
    Ok(PostProcessingResult {
        points,
        summary,
        hopping_probabilities,
    })
}
