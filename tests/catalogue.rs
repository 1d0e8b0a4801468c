use approx::assert_relative_eq;
use rand::prelude::*;
use rand::rngs::StdRng;
use rusty_ekmc::constants::K_BOLTZMANN;
use rusty_ekmc::initialization::{
    negate_cell, AtomInput, EkmcConfiguration, MoleculeInput, ReorganisationInput, SetupData,
    SystemData,
};
use rusty_ekmc::neighbours::{NeighbourCatalogue, NeighbourEntry};
use rusty_ekmc::rates::{MarcusConstants, RateConstants};

fn molecule(name: usize, atoms: Vec<([f64; 3], f64)>) -> MoleculeInput {
    MoleculeInput {
        name,
        atoms: atoms
            .into_iter()
            .enumerate()
            .map(|(idx, (position, charge))| AtomInput {
                element: String::from(if idx == 2 { "H" } else { "C" }),
                position,
                charge,
            })
            .collect(),
        centre_of_mass: None,
    }
}

/// Triclinic cell with four molecules of three transition charges each at
/// random positions.
fn random_crystal(rng: &mut StdRng) -> SetupData {
    let lattice: [[f64; 3]; 3] = [
        [rng.gen_range(8.0..10.0), 0.0, 0.0],
        [rng.gen_range(-1.0..1.0), rng.gen_range(8.0..10.0), 0.0],
        [
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(8.0..10.0),
        ],
    ];
    let mut molecules: Vec<MoleculeInput> = Vec::new();
    for name in 0..4 {
        let q1: f64 = rng.gen_range(-0.2..0.2);
        let q2: f64 = rng.gen_range(-0.2..0.2);
        let charges: [f64; 3] = [q1, q2, -q1 - q2];
        let atoms: Vec<([f64; 3], f64)> = charges
            .iter()
            .map(|charge| {
                let fractional: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
                let mut position: [f64; 3] = [0.0; 3];
                for (i, f) in fractional.iter().enumerate() {
                    for k in 0..3 {
                        position[k] += f * lattice[i][k];
                    }
                }
                (position, *charge)
            })
            .collect();
        molecules.push(molecule(name, atoms));
    }
    let mut reorganisation_energies: Vec<ReorganisationInput> = Vec::new();
    for donor in 0..4 {
        for acceptor in donor..4 {
            let energy: f64 = rng.gen_range(0.1..0.3);
            reorganisation_energies.push(ReorganisationInput {
                donor,
                acceptor,
                energy,
            });
            if acceptor != donor {
                reorganisation_energies.push(ReorganisationInput {
                    donor: acceptor,
                    acceptor: donor,
                    energy,
                });
            }
        }
    }
    SetupData {
        lattice,
        molecules,
        bandgap_energies: (0..4).map(|name| (name, rng.gen_range(2.0..2.3))).collect(),
        reorganisation_energies,
        conformational_equivalence: Default::default(),
        eet_couplings: Vec::new(),
    }
}

#[test]
fn every_hop_has_a_mirrored_inverse() {
    let methods: [&str; 3] = ["centre_of_mass", "centre_of_molecule", "nearest_atoms_method"];
    for seed in 0..100_u64 {
        let mut rng: StdRng = StdRng::seed_from_u64(seed);
        let system: SystemData = SystemData::from_setup(random_crystal(&mut rng)).unwrap();
        let config: EkmcConfiguration = EkmcConfiguration::from_toml(&format!(
            "short_range_coupling_model = \"ATC\"\nlong_range_coupling_model = \"ATC\"\n\
             short_range_cutoff = 7.0\nlong_range_cutoff = 12.0\ndistance_method = \"{}\"",
            methods[seed as usize % 3]
        ))
        .unwrap();
        let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
        assert!(!catalogue.is_empty());
        assert_eq!(catalogue.len() % 2, 0);
        let kbt: f64 = K_BOLTZMANN * config.constant_rate_data.temperature;

        for donor in catalogue.molecule_names() {
            let neighbours = catalogue.neighbours(donor).unwrap();
            assert!(!neighbours.is_empty(), "molecule {} has no neighbours", donor);
            for neighbour in neighbours.iter() {
                let entry: &NeighbourEntry = &neighbour.entry;
                assert!(entry.distance <= 12.0 + 1e-4);
                let inverse: &NeighbourEntry = catalogue
                    .get(neighbour.molecule, donor, &negate_cell(&neighbour.cell_offset))
                    .unwrap();
                assert_eq!(inverse.coupling, entry.coupling);
                assert_eq!(inverse.distance, entry.distance);
                for k in 0..3 {
                    assert_relative_eq!(
                        inverse.displacement[k],
                        -entry.displacement[k],
                        epsilon = 1e-9
                    );
                }
                let lambda: f64 = system
                    .reorganisation_energy(donor, neighbour.molecule)
                    .unwrap();
                let expected: MarcusConstants =
                    MarcusConstants::new(lambda, config.constant_rate_data.temperature).unwrap();
                match (&entry.constants, &inverse.constants) {
                    (RateConstants::Marcus(forward), RateConstants::Marcus(backward)) => {
                        assert_eq!(*forward, expected);
                        assert_eq!(forward, backward);
                    }
                    _ => panic!("expected Marcus constants"),
                }

                let delta_e: f64 = system.bandgap(neighbour.molecule).unwrap()
                    - system.bandgap(donor).unwrap();
                let forward: f64 = entry.rate_constant(entry.coupling, delta_e);
                let backward: f64 = inverse.rate_constant(inverse.coupling, -delta_e);
                if forward > 0.0 && backward > 0.0 {
                    assert_relative_eq!(
                        forward / backward,
                        (-delta_e / kbt).exp(),
                        max_relative = 1e-8
                    );
                }
            }
        }
    }
}

#[test]
fn transition_charge_couplings_decay_with_the_cube_of_the_distance() {
    let a: f64 = 30.0;
    let setup: SetupData = SetupData {
        lattice: [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]],
        molecules: vec![molecule(0, vec![([-0.5, 0.0, 0.0], 0.1), ([0.5, 0.0, 0.0], -0.1)])],
        bandgap_energies: vec![(0, 2.0)].into_iter().collect(),
        reorganisation_energies: vec![ReorganisationInput {
            donor: 0,
            acceptor: 0,
            energy: 0.2,
        }],
        conformational_equivalence: Default::default(),
        eet_couplings: Vec::new(),
    };
    let system: SystemData = SystemData::from_setup(setup).unwrap();
    let config: EkmcConfiguration = EkmcConfiguration::from_toml(
        "short_range_coupling_model = \"ATC\"\nlong_range_coupling_model = \"ATC\"\n\
         short_range_cutoff = 65.0\nlong_range_cutoff = 65.0",
    )
    .unwrap();
    let catalogue: NeighbourCatalogue = NeighbourCatalogue::build(&system, &config).unwrap();
    let near: f64 = catalogue.get(0, 0, &[0, 0, 1]).unwrap().coupling;
    let far: f64 = catalogue.get(0, 0, &[0, 0, 2]).unwrap().coupling;
    // parallel dipoles side by side repel
    assert!(near > 0.0);
    assert_relative_eq!(near / far, 8.0, max_relative = 0.01);
    assert_eq!(catalogue.get(0, 0, &[0, 0, -2]).unwrap().coupling, far);
    // beyond the cutoff
    assert!(catalogue.get(0, 0, &[0, 0, 3]).is_none());
}
