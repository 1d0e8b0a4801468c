#![allow(dead_code)]

use rusty_ekmc::initialization::{
    AtomInput, CouplingInput, EkmcConfiguration, MoleculeInput, ReorganisationInput, SetupData,
    Simulation, SystemData,
};
use rusty_ekmc::neighbours::NeighbourCatalogue;
use rusty_ekmc::output::{is_complete_record, TrajectoryRecord, TrajectoryWriter};
use rusty_ekmc::postprocessing::Trajectory;
use std::path::PathBuf;

pub const LATTICE_CONSTANT: f64 = 10.0;
pub const COUPLING: f64 = 0.001;
pub const REORGANISATION_ENERGY: f64 = 0.2;
pub const BANDGAP: f64 = 2.0;

/// Simple cubic crystal with one molecule per cell that only couples to its
/// six nearest neighbours.
pub fn cubic_setup() -> SetupData {
    SetupData {
        lattice: [
            [LATTICE_CONSTANT, 0.0, 0.0],
            [0.0, LATTICE_CONSTANT, 0.0],
            [0.0, 0.0, LATTICE_CONSTANT],
        ],
        molecules: vec![MoleculeInput {
            name: 0,
            atoms: vec![AtomInput {
                element: String::from("C"),
                position: [0.0, 0.0, 0.0],
                charge: 0.0,
            }],
            centre_of_mass: None,
        }],
        bandgap_energies: vec![(0, BANDGAP)].into_iter().collect(),
        reorganisation_energies: vec![ReorganisationInput {
            donor: 0,
            acceptor: 0,
            energy: REORGANISATION_ENERGY,
        }],
        conformational_equivalence: Default::default(),
        eet_couplings: [[1, 0, 0], [0, 1, 0], [0, 0, 1]]
            .iter()
            .map(|cell| CouplingInput {
                molecule1: 0,
                molecule2: 0,
                cell: *cell,
                coupling: COUPLING,
            })
            .collect(),
    }
}

pub fn cubic_system() -> SystemData {
    SystemData::from_setup(cubic_setup()).unwrap()
}

pub fn cubic_config(extra: &str) -> EkmcConfiguration {
    EkmcConfiguration::from_toml(&format!(
        "short_range_coupling_model = \"EET\"\nshort_range_cutoff = {a}\nlong_range_cutoff = {a}\n{}",
        extra,
        a = LATTICE_CONSTANT
    ))
    .unwrap()
}

pub fn parse_records(text: &str) -> Vec<TrajectoryRecord> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| is_complete_record(line))
        .map(|(idx, line)| TrajectoryRecord::from_line(line, idx + 1).unwrap())
        .collect()
}

/// Runs one walker with the given seed and keeps its log in memory.
pub fn walk_in_memory(
    config: &EkmcConfiguration,
    system: &SystemData,
    catalogue: &NeighbourCatalogue,
    seed: u64,
) -> Trajectory {
    let mut simulation: Simulation = Simulation::new(config, system, catalogue, seed).unwrap();
    let mut writer: TrajectoryWriter<Vec<u8>> = TrajectoryWriter::new(Vec::new(), true).unwrap();
    simulation
        .run::<_, std::io::Sink>(&mut writer, None)
        .unwrap();
    let text: String = String::from_utf8(writer.into_inner()).unwrap();
    Trajectory {
        path: PathBuf::from(format!("walker_{}", seed)),
        records: parse_records(&text),
    }
}
