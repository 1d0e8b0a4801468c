mod common;

use common::*;
use rusty_ekmc::defaults::{RATE_CONSTANTS_FILE_NAME, TRAJECTORY_FILE_NAME};
use rusty_ekmc::dynamics::{run_in_directory, RunOutcome};
use rusty_ekmc::initialization::restart::{read_last_record, ResumePoint};
use rusty_ekmc::initialization::{EkmcConfiguration, RunState, SystemData};
use rusty_ekmc::neighbours::NeighbourCatalogue;
use rusty_ekmc::output::TrajectoryRecord;
use rusty_ekmc::EkmcError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn log_text(directory: &Path) -> String {
    fs::read_to_string(directory.join(TRAJECTORY_FILE_NAME)).unwrap()
}

#[test]
fn truncated_log_is_continued() {
    let system: SystemData = cubic_system();
    let config: EkmcConfiguration = cubic_config("max_no_of_steps = 40\nsim_time_limit = -1");
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let dir = tempdir().unwrap();
    run_in_directory(&config, &system, &catalogue, dir.path(), None, 5).unwrap();
    let original: String = log_text(dir.path());
    let original_records: Vec<TrajectoryRecord> = parse_records(&original);
    assert_eq!(original_records.len(), 40);

    // an interrupted write leaves half a line behind
    let cut: usize = original.trim_end().len() - 30;
    fs::write(dir.path().join(TRAJECTORY_FILE_NAME), &original[..cut]).unwrap();
    let point: ResumePoint = read_last_record(&dir.path().join(TRAJECTORY_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(point.record.step, 38);

    let outcome: RunOutcome =
        run_in_directory(&config, &system, &catalogue, dir.path(), None, 5).unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.summary().state, RunState::FinishedStepLimit);
    assert_eq!(outcome.summary().steps, 40);

    let resumed: String = log_text(dir.path());
    let records: Vec<TrajectoryRecord> = parse_records(&resumed);
    assert_eq!(records.len(), 40);
    for (idx, record) in records.iter().enumerate() {
        assert_eq!(record.step, idx as u64);
    }
    // everything before the resumed record is untouched
    let kept: Vec<&str> = original.lines().take(39).collect();
    let new: Vec<&str> = resumed.lines().take(39).collect();
    assert_eq!(kept, new);
    // the resumed record starts from the same state
    let before: &TrajectoryRecord = &original_records[38];
    let after: &TrajectoryRecord = &records[38];
    assert_eq!(after.molecule, before.molecule);
    assert_eq!(after.cell, before.cell);
    assert_eq!(after.time, before.time);
    assert_eq!(after.energy, before.energy);
}

#[test]
fn rate_log_has_one_line_per_step_after_a_resume() {
    let system: SystemData = cubic_system();
    let config: EkmcConfiguration = cubic_config(
        "max_no_of_steps = 60\nsim_time_limit = -1\nwrite_rate_constants_to_file = true",
    );
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let dir = tempdir().unwrap();
    run_in_directory(&config, &system, &catalogue, dir.path(), None, 17).unwrap();
    let rate_path: PathBuf = dir.path().join(RATE_CONSTANTS_FILE_NAME);
    assert_eq!(fs::read_to_string(&rate_path).unwrap().lines().count(), 60);

    // the crash hits both logs in the middle of a line
    let original: String = log_text(dir.path());
    let cut: usize = original.trim_end().len() - 30;
    fs::write(dir.path().join(TRAJECTORY_FILE_NAME), &original[..cut]).unwrap();
    let mut rates: String = fs::read_to_string(&rate_path).unwrap();
    rates.push_str("60: 0 (1, 2, ");
    fs::write(&rate_path, &rates).unwrap();

    let outcome: RunOutcome =
        run_in_directory(&config, &system, &catalogue, dir.path(), None, 17).unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.summary().steps, 60);

    let rates: String = fs::read_to_string(&rate_path).unwrap();
    assert!(rates.ends_with('\n'));
    let steps: Vec<u64> = rates
        .lines()
        .map(|line| line.split(':').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(steps, (0..60).collect::<Vec<u64>>());
    // the rate line of each step belongs to the site in the trajectory
    let records: Vec<TrajectoryRecord> = parse_records(&log_text(dir.path()));
    for (record, line) in records.iter().zip(rates.lines()) {
        let prefix: String = format!(
            "{}: {} ({}, {}, {}) [",
            record.step, record.molecule, record.cell[0], record.cell[1], record.cell[2]
        );
        assert!(line.starts_with(&prefix), "{} vs {}", line, prefix);
    }
}

#[test]
fn header_only_log_starts_over() {
    let system: SystemData = cubic_system();
    let config: EkmcConfiguration = cubic_config("max_no_of_steps = 12\nsim_time_limit = -1");
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let fresh = tempdir().unwrap();
    run_in_directory(&config, &system, &catalogue, fresh.path(), None, 21).unwrap();

    let dir = tempdir().unwrap();
    let header: String = log_text(fresh.path()).lines().next().unwrap().to_string();
    fs::write(dir.path().join(TRAJECTORY_FILE_NAME), format!("{}\n", header)).unwrap();
    run_in_directory(&config, &system, &catalogue, dir.path(), None, 21).unwrap();
    assert_eq!(log_text(dir.path()), log_text(fresh.path()));
}

#[test]
fn zero_time_limit_only_writes_the_header() {
    let system: SystemData = cubic_system();
    let config: EkmcConfiguration = cubic_config("sim_time_limit = 0.0");
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let dir = tempdir().unwrap();
    let outcome: RunOutcome =
        run_in_directory(&config, &system, &catalogue, dir.path(), None, 2).unwrap();
    assert_eq!(outcome.summary().state, RunState::FinishedTimeLimit);
    assert_eq!(outcome.summary().time, 0.0);
    let text: String = log_text(dir.path());
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Count"));
}

#[test]
fn scratch_folder_holds_the_walk_until_it_finishes() {
    let system: SystemData = cubic_system();
    let config: EkmcConfiguration = cubic_config(
        "max_no_of_steps = 600\nsim_time_limit = -1\nwrite_rate_constants_to_file = true\n\
         write_first_500_rate_constants_only = true",
    );
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let dir = tempdir().unwrap();
    let target: PathBuf = dir.path().join("walk");
    let scratch: PathBuf = dir.path().join("scratch").join("Simulation_0");
    run_in_directory(&config, &system, &catalogue, &target, Some(&scratch), 11).unwrap();
    assert!(!scratch.exists());
    assert_eq!(parse_records(&log_text(&target)).len(), 600);
    let rates: String = fs::read_to_string(target.join(RATE_CONSTANTS_FILE_NAME)).unwrap();
    assert_eq!(rates.lines().count(), 500);
    assert!(rates.lines().last().unwrap().starts_with("499: "));

    // a finished walk never touches the scratch folder
    fs::create_dir_all(&scratch).unwrap();
    let outcome: RunOutcome =
        run_in_directory(&config, &system, &catalogue, &target, Some(&scratch), 11).unwrap();
    assert!(matches!(outcome, RunOutcome::AlreadyFinished(_)));
    let other: PathBuf = dir.path().join("other_walk");
    let result = run_in_directory(&config, &system, &catalogue, &other, Some(&scratch), 12);
    assert!(matches!(result, Err(EkmcError::ScratchDirectoryExists(_))));
}
