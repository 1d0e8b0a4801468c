mod common;

use common::*;
use rusty_ekmc::dynamics::{run_ensemble, simulation_folder, EnsembleSummary};
use rusty_ekmc::initialization::{EkmcConfiguration, SetupData, SystemData};
use rusty_ekmc::neighbours::NeighbourCatalogue;
use rusty_ekmc::output::{
    DIFFUSION_TABLE_FILE_NAME, EIGENVECTOR_FILE_NAME, HOPPING_PROBABILITY_FILE_NAME, SUMMARY_FILE_NAME,
};
use rusty_ekmc::postprocessing::{process_results, PostProcessingResult};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_inputs(folder: &Path) -> PathBuf {
    let setup: SetupData = cubic_setup();
    let setup_path: PathBuf = folder.join("KMC_setup_data.yaml");
    fs::write(&setup_path, serde_yaml::to_string(&setup).unwrap()).unwrap();
    let config_path: PathBuf = folder.join("ekmc.toml");
    fs::write(
        &config_path,
        format!(
            "setup_data_path = {:?}\nshort_range_cutoff = 10.0\nlong_range_cutoff = 10.0\n\
             sim_time_limit = 200.0\nnumber_of_simulations = 8\nnumber_of_cpus = 2\nseed = 7\n\
             write_rate_constants_to_file = true\n\n\
             [postprocessing]\nno_of_times_to_sample = 40\ntime_average_start = 50.0\n",
            setup_path.to_str().unwrap()
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn ensemble_results_are_reproducible() {
    let dir = tempdir().unwrap();
    let config_path: PathBuf = write_inputs(dir.path());
    let config: EkmcConfiguration = EkmcConfiguration::from_path(&config_path).unwrap();
    let system: SystemData = SystemData::from_file(Path::new(&config.setup_data_path)).unwrap();
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();

    let walks: PathBuf = dir.path().join("walks");
    let summary: EnsembleSummary = run_ensemble(&config, &system, &catalogue, &walks).unwrap();
    assert_eq!(summary.n_completed(), 8);
    assert!(simulation_folder(&walks, 7).is_dir());

    let first: PathBuf = dir.path().join("first");
    let second: PathBuf = dir.path().join("second");
    let result: PostProcessingResult = process_results(&config, &system, &walks, &first).unwrap();
    process_results(&config, &system, &walks, &second).unwrap();
    for name in [
        DIFFUSION_TABLE_FILE_NAME,
        EIGENVECTOR_FILE_NAME,
        SUMMARY_FILE_NAME,
        HOPPING_PROBABILITY_FILE_NAME,
    ]
    .iter()
    {
        let a: Vec<u8> = fs::read(first.join(name)).unwrap();
        let b: Vec<u8> = fs::read(second.join(name)).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b, "{} differs", name);
    }

    assert_eq!(result.points.len(), 41);
    assert_eq!(result.points[0].time, 0.0);
    assert_eq!(result.points[40].time, 200.0);
    assert_eq!(result.points[0].diffusion_coefficient, 0.0);
    assert_eq!(result.summary.n_trajectories, 8);
    assert_eq!(result.summary.window_start, 50.0);
    assert_eq!(result.summary.window_end, 200.0);
    assert_eq!(result.summary.n_samples, 31);
    assert!(result.summary.diffusion_coefficient.mean > 0.0);
    assert!(result.summary.diffusion_coefficient.confidence_interval.is_some());
    assert_eq!(result.summary.eigenvalues.len(), 3);
    // without disorder the exciton keeps the bandgap energy
    assert_eq!(result.summary.energy.mean, BANDGAP);

    let table: String = fs::read_to_string(first.join(DIFFUSION_TABLE_FILE_NAME)).unwrap();
    assert_eq!(table.lines().count(), 42);
    let summary_text: String = fs::read_to_string(first.join(SUMMARY_FILE_NAME)).unwrap();
    assert!(summary_text.contains("n_trajectories: 8"));
    // one XYZ frame of nine lines per sampled time
    let xyz: String = fs::read_to_string(first.join(EIGENVECTOR_FILE_NAME)).unwrap();
    assert_eq!(xyz.lines().count(), 41 * 9);

    // the six hops of the cubic crystal are equally likely
    assert_eq!(result.hopping_probabilities.len(), 6);
    for hop in result.hopping_probabilities.iter() {
        assert_eq!((hop.donor, hop.acceptor), (0, 0));
        assert_eq!(hop.cell_offset.iter().map(|c| c.abs()).sum::<i32>(), 1);
        assert!((hop.mean - 1.0 / 6.0).abs() < 1e-6);
        assert!(hop.standard_deviation.unwrap() < 1e-6);
    }
    assert_eq!(result.hopping_probabilities[0].cell_offset, [1, 0, 0]);
    let probabilities: String =
        fs::read_to_string(first.join(HOPPING_PROBABILITY_FILE_NAME)).unwrap();
    assert_eq!(probabilities.lines().count(), 6);

    // a second ensemble with the same seed reproduces the walks
    let again: PathBuf = dir.path().join("again");
    run_ensemble(&config, &system, &catalogue, &again).unwrap();
    let third: PathBuf = dir.path().join("third");
    process_results(&config, &system, &again, &third).unwrap();
    assert_eq!(
        fs::read(first.join(SUMMARY_FILE_NAME)).unwrap(),
        fs::read(third.join(SUMMARY_FILE_NAME)).unwrap()
    );
}

#[test]
fn missing_configuration_is_written_with_defaults() {
    let dir = tempdir().unwrap();
    let config_path: PathBuf = dir.path().join("ekmc.toml");
    let config: EkmcConfiguration = EkmcConfiguration::from_path(&config_path).unwrap();
    assert!(config_path.exists());
    let reread: EkmcConfiguration = EkmcConfiguration::from_path(&config_path).unwrap();
    assert_eq!(reread.short_range_cutoff, config.short_range_cutoff);
    assert_eq!(reread.postprocessing.output_folder, config.postprocessing.output_folder);
}
