use crate::error::{EkmcError, Result};
use crate::initialization::SystemData;
use crate::output::TrajectoryRecord;
use crate::postprocessing::Trajectory;
use ndarray::prelude::*;

/// State of one trajectory on the common time grid.
#[derive(Clone, Debug)]
pub struct SampledTrajectory {
    /// displacement from the starting site in Angstrom, one row per grid time
    pub displacements: Array2<f64>,
    /// site energy in eV
    pub energies: Array1<f64>,
}

/// `n_intervals + 1` equally spaced times from 0 to `end_time`.
pub fn time_grid(end_time: f64, n_intervals: usize) -> Array1<f64> {
    Array1::linspace(0.0, end_time, n_intervals + 1)
}

/// Piecewise constant resampling of a trajectory: at every grid time the walker
/// sits on the site of the last record that started at or before it.
pub fn sample_trajectory(
    trajectory: &Trajectory,
    grid: ArrayView1<f64>,
    system: &SystemData,
) -> Result<SampledTrajectory> {
    let first: &TrajectoryRecord = trajectory.records.first().ok_or_else(|| {
        EkmcError::Statistics(format!("{:?} holds no records", trajectory.path))
    })?;
    let origin: Array1<f64> = system.site_position(&first.site())?;

    let mut displacements: Array2<f64> = Array2::zeros((grid.len(), 3));
    let mut energies: Array1<f64> = Array1::zeros(grid.len());
    for (idx, time) in grid.iter().enumerate() {
        let record: &TrajectoryRecord = trajectory.record_at(*time).unwrap_or(first);
        let position: Array1<f64> = system.site_position(&record.site())?;
        displacements.row_mut(idx).assign(&(&position - &origin));
        energies[idx] = record.energy;
    }
    Ok(SampledTrajectory {
        displacements,
        energies,
    })
}
