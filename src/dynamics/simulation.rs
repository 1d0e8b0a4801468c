use crate::constants::{PER_S_TO_PER_PS, PS_TO_FS, S_TO_PS};
use crate::defaults::{FIRST_RATE_CONSTANTS, RATE_CONSTANTS_FILE_NAME, TRAJECTORY_FILE_NAME};
use crate::dynamics::{hop_tensor, select_transition, waiting_time};
use crate::error::{EkmcError, Result};
use crate::initialization::restart::{
    did_finish, read_last_record, truncate_log, truncate_rate_log, ResumePoint,
};
use crate::initialization::{
    add_cells, EkmcConfiguration, RunState, Simulation, Site, SystemData,
};
use crate::neighbours::{Neighbour, NeighbourCatalogue};
use crate::output::{RateConstantWriter, TrajectoryRecord, TrajectoryWriter};
use log::{debug, error, info, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Final state of a walker.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub state: RunState,
    pub site: Site,
    /// ps
    pub time: f64,
    pub steps: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// the trajectory log already reached a stop condition
    AlreadyFinished(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::AlreadyFinished(summary) => summary,
        }
    }
}

impl Simulation<'_> {
    /// Stop condition met by the current state, checked before a step is drawn.
    fn reached_limit(&self) -> Option<RunState> {
        if self.time_limit.map_or(false, |limit| self.time >= limit) {
            Some(RunState::FinishedTimeLimit)
        } else if self.step_limit.map_or(false, |limit| self.step >= limit) {
            Some(RunState::FinishedStepLimit)
        } else {
            None
        }
    }

    /// Draws one hop out of the current site. Returns the record of the
    /// current site together with the site the exciton hops to and the
    /// waiting time in ps. The walker itself is not moved.
    pub fn kmc_step<V: Write>(
        &mut self,
        rate_log: Option<&mut RateConstantWriter<V>>,
    ) -> Result<(TrajectoryRecord, Site, f64)> {
        let total_rate: f64 = self.rate_constants()?;
        if !(total_rate > 0.0) {
            self.state = RunState::FailedNoOutgoingRate;
            error!(
                "no outgoing rate from molecule {} in cell {:?} at step {} ({} ps, {} eV)",
                self.site.molecule, self.site.cell, self.step, self.time, self.site_energy
            );
            return Err(EkmcError::NoOutgoingRate {
                molecule: self.site.molecule,
                cell: self.site.cell,
            });
        }
        let catalogue: &NeighbourCatalogue = self.catalogue;
        let neighbours: &[Neighbour] = catalogue.neighbours(self.site.molecule)?;
        if let Some(writer) = rate_log {
            writer.write_step(self.step, &self.site, total_rate, neighbours, &self.rates)?;
        }

        let tau: f64 = waiting_time(total_rate, &mut self.rng) * S_TO_PS;
        let u: f64 = self.rng.gen();
        let index: usize = select_transition(&self.rates, total_rate, u).ok_or_else(|| {
            EkmcError::NoOutgoingRate {
                molecule: self.site.molecule,
                cell: self.site.cell,
            }
        })?;
        let neighbour: &Neighbour = &neighbours[index];
        let diffusion: [f64; 6] = hop_tensor(&neighbour.entry.displacement, tau).map_err(|err| {
            error!(
                "walker on molecule {} in cell {:?} at step {} ({} ps): {}",
                self.site.molecule, self.site.cell, self.step, self.time, err
            );
            err
        })?;
        let record: TrajectoryRecord = TrajectoryRecord {
            step: self.step,
            molecule: self.site.molecule,
            cell: self.site.cell,
            time: self.time,
            time_step: tau * PS_TO_FS,
            hop_distance: neighbour.entry.hop_distance(),
            energy: self.site_energy,
            total_rate: total_rate * PER_S_TO_PER_PS,
            diffusion,
        };
        let target: Site = Site::new(
            neighbour.molecule,
            add_cells(&self.site.cell, &neighbour.cell_offset),
        );
        Ok((record, target, tau))
    }

    /// Runs the walker until the time or step limit is reached. Every
    /// accepted hop is written to the trajectory log before the walker moves.
    pub fn run<W: Write, V: Write>(
        &mut self,
        trajectory: &mut TrajectoryWriter<W>,
        mut rate_log: Option<&mut RateConstantWriter<V>>,
    ) -> Result<RunSummary> {
        self.state = RunState::Running;
        info!(
            "start the kinetic Monte Carlo walk at step {} ({} ps)",
            self.step, self.time
        );
        loop {
            if let Some(state) = self.reached_limit() {
                self.state = state;
                break;
            }
            let (record, target, tau): (TrajectoryRecord, Site, f64) =
                self.kmc_step(rate_log.as_deref_mut())?;
            trajectory.write_record(&record)?;
            self.site = target;
            self.time += tau;
            self.step += 1;
            if self.step % 10000 == 0 {
                debug!("step {}: {} ps", self.step, self.time);
            }
        }
        info!(
            "walk finished ({:?}) after {} steps at {} ps, disorder sampled on {} sites and {} dimers",
            self.state,
            self.step,
            self.time,
            self.disorder.n_sites(),
            self.disorder.n_dimers()
        );
        Ok(RunSummary {
            state: self.state,
            site: self.site,
            time: self.time,
            steps: self.step,
        })
    }
}

/// Runs (or resumes) one walker whose logs live in `directory`. With a
/// `scratch` folder the logs are written there and moved back afterwards.
pub fn run_in_directory(
    config: &EkmcConfiguration,
    system: &SystemData,
    catalogue: &NeighbourCatalogue,
    directory: &Path,
    scratch: Option<&Path>,
    seed: u64,
) -> Result<RunOutcome> {
    let log_path: PathBuf = directory.join(TRAJECTORY_FILE_NAME);
    let resume: Option<ResumePoint> = if log_path.exists() {
        read_last_record(&log_path)?
    } else {
        None
    };
    if let Some(point) = resume.as_ref() {
        let record: &TrajectoryRecord = &point.record;
        if did_finish(record, config.sim_time_limit.0, config.max_no_of_steps.0) {
            info!(
                "the trajectory in {:?} has already finished at step {}",
                directory, record.step
            );
            let state: RunState = if config
                .sim_time_limit
                .0
                .map_or(false, |limit| record.end_time() >= limit)
            {
                RunState::FinishedTimeLimit
            } else {
                RunState::FinishedStepLimit
            };
            return Ok(RunOutcome::AlreadyFinished(RunSummary {
                state,
                site: record.site(),
                time: record.end_time(),
                steps: record.step + 1,
            }));
        }
    }

    let work_directory: PathBuf = match scratch {
        Some(folder) => {
            prepare_scratch_directory(folder, directory)?;
            folder.to_path_buf()
        }
        None => {
            fs::create_dir_all(directory)?;
            directory.to_path_buf()
        }
    };
    let summary: RunSummary = run_walker(config, system, catalogue, &work_directory, resume, seed)?;
    if let Some(folder) = scratch {
        finish_scratch_directory(folder, directory)?;
    }
    Ok(RunOutcome::Completed(summary))
}

fn run_walker(
    config: &EkmcConfiguration,
    system: &SystemData,
    catalogue: &NeighbourCatalogue,
    work_directory: &Path,
    resume: Option<ResumePoint>,
    seed: u64,
) -> Result<RunSummary> {
    let log_path: PathBuf = work_directory.join(TRAJECTORY_FILE_NAME);
    let rate_log_path: PathBuf = work_directory.join(RATE_CONSTANTS_FILE_NAME);
    let resumed_step: Option<u64> = resume.as_ref().map(|point| point.record.step);
    let (mut simulation, mut trajectory) = match resume {
        Some(point) => {
            let seed: u64 = resumed_seed(seed, point.record.step);
            info!(
                "resume from step {} on molecule {} in cell {:?} at {} ps with seed {}",
                point.record.step, point.record.molecule, point.record.cell, point.record.time, seed
            );
            warn!("the disorder sampled before the restart is not restored");
            // the last record is drawn again
            truncate_log(&log_path, point.offset)?;
            let simulation: Simulation = Simulation::from_state(
                config,
                system,
                catalogue,
                point.record.site(),
                point.record.time,
                point.record.step,
                StdRng::seed_from_u64(seed),
            );
            (simulation, TrajectoryWriter::append(&log_path)?)
        }
        None => (
            Simulation::new(config, system, catalogue, seed)?,
            TrajectoryWriter::create(&log_path)?,
        ),
    };

    if config.write_rate_constants_to_file {
        let step_limit: Option<u64> = if config.write_first_500_rate_constants_only {
            Some(FIRST_RATE_CONSTANTS)
        } else {
            None
        };
        let mut rate_log = match resumed_step {
            Some(step) => {
                if rate_log_path.exists() {
                    truncate_rate_log(&rate_log_path, step)?;
                }
                RateConstantWriter::append(&rate_log_path, step_limit)?
            }
            None => RateConstantWriter::create(&rate_log_path, step_limit)?,
        };
        simulation.run(&mut trajectory, Some(&mut rate_log))
    } else {
        simulation.run::<_, std::io::Sink>(&mut trajectory, None)
    }
}

/// Seed of a walker continued at `step`, so the resumed draws do not repeat
/// the stream of the first run.
pub fn resumed_seed(seed: u64, step: u64) -> u64 {
    seed ^ (step + 1).rotate_left(32)
}

/// Creates the scratch folder and copies the existing logs of `directory` into it.
fn prepare_scratch_directory(scratch: &Path, directory: &Path) -> Result<()> {
    if scratch.exists() {
        return Err(EkmcError::ScratchDirectoryExists(scratch.to_path_buf()));
    }
    fs::create_dir_all(scratch)?;
    for name in [TRAJECTORY_FILE_NAME, RATE_CONSTANTS_FILE_NAME].iter() {
        let source: PathBuf = directory.join(name);
        if source.exists() {
            fs::copy(&source, scratch.join(name))?;
        }
    }
    debug!("work in the scratch folder {:?}", scratch);
    Ok(())
}

/// Moves the logs back to `directory` and removes the scratch folder.
fn finish_scratch_directory(scratch: &Path, directory: &Path) -> Result<()> {
    fs::create_dir_all(directory)?;
    for name in [TRAJECTORY_FILE_NAME, RATE_CONSTANTS_FILE_NAME].iter() {
        let source: PathBuf = scratch.join(name);
        if source.exists() {
            // rename fails across file systems
            fs::copy(&source, directory.join(name))?;
        }
    }
    fs::remove_dir_all(scratch)?;
    Ok(())
}
