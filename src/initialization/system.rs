use crate::constants;
use crate::error::{EkmcError, Result};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

pub type MoleculeName = usize;
/// Integer translation in units of the lattice vectors.
pub type CellPoint = [i32; 3];

pub const ORIGIN_CELL: CellPoint = [0, 0, 0];

pub fn add_cells(a: &CellPoint, b: &CellPoint) -> CellPoint {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn negate_cell(cell: &CellPoint) -> CellPoint {
    [-cell[0], -cell[1], -cell[2]]
}

/// A molecule placed in a given unit cell, the unit the exciton occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    pub molecule: MoleculeName,
    pub cell: CellPoint,
}

impl Site {
    pub fn new(molecule: MoleculeName, cell: CellPoint) -> Self {
        Site { molecule, cell }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AtomInput {
    pub element: String,
    pub position: [f64; 3],
    /// atomic transition charge in e
    #[serde(default)]
    pub charge: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MoleculeInput {
    pub name: MoleculeName,
    pub atoms: Vec<AtomInput>,
    #[serde(default)]
    pub centre_of_mass: Option<[f64; 3]>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReorganisationInput {
    pub donor: MoleculeName,
    pub acceptor: MoleculeName,
    pub energy: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CouplingInput {
    pub molecule1: MoleculeName,
    pub molecule2: MoleculeName,
    pub cell: CellPoint,
    pub coupling: f64,
}

/// Content of the setup data file as written by the user.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SetupData {
    pub lattice: [[f64; 3]; 3],
    pub molecules: Vec<MoleculeInput>,
    pub bandgap_energies: BTreeMap<MoleculeName, f64>,
    pub reorganisation_energies: Vec<ReorganisationInput>,
    /// equivalent molecule -> unique molecule it shares its energies with
    #[serde(default)]
    pub conformational_equivalence: BTreeMap<MoleculeName, MoleculeName>,
    #[serde(default)]
    pub eet_couplings: Vec<CouplingInput>,
}

impl SetupData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text: String = fs::read_to_string(path)?;
        let setup: SetupData = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            _ => serde_yaml::from_str(&text)?,
        };
        Ok(setup)
    }
}

pub struct Molecule {
    pub name: MoleculeName,
    pub elements: Vec<String>,
    /// cartesian positions in Angstrom, one row per atom
    pub positions: Array2<f64>,
    pub charges: Array1<f64>,
    pub centre_of_mass: Array1<f64>,
}

impl Molecule {
    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, element)| !constants::HYDROGEN_SYMBOLS.contains(&element.as_str()))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Positions of all atoms that are not hydrogen. Falls back to every atom
    /// for molecules made of hydrogen only.
    pub fn heavy_atom_positions(&self) -> Array2<f64> {
        let indices: Vec<usize> = self.heavy_atom_indices();
        if indices.is_empty() {
            self.positions.clone()
        } else {
            self.positions.select(Axis(0), &indices)
        }
    }

    /// Centroid of the non-hydrogen atoms.
    pub fn centre_of_molecule(&self) -> Array1<f64> {
        let heavy: Array2<f64> = self.heavy_atom_positions();
        heavy
            .mean_axis(Axis(0))
            .unwrap_or_else(|| self.centre_of_mass.clone())
    }
}

impl TryFrom<MoleculeInput> for Molecule {
    type Error = EkmcError;

    fn try_from(input: MoleculeInput) -> Result<Self> {
        let n_atoms: usize = input.atoms.len();
        if n_atoms == 0 {
            return Err(EkmcError::Configuration(format!(
                "molecule {} has no atoms",
                input.name
            )));
        }
        let mut positions: Array2<f64> = Array2::zeros((n_atoms, 3));
        let mut charges: Array1<f64> = Array1::zeros(n_atoms);
        let mut masses: Array1<f64> = Array1::zeros(n_atoms);
        let mut elements: Vec<String> = Vec::with_capacity(n_atoms);
        for (idx, atom) in input.atoms.into_iter().enumerate() {
            positions
                .slice_mut(s![idx, ..])
                .assign(&Array1::from(atom.position.to_vec()));
            charges[idx] = atom.charge;
            masses[idx] = *constants::ATOMIC_MASSES
                .get(atom.element.as_str())
                .ok_or_else(|| {
                    EkmcError::Configuration(format!(
                        "unknown element '{}' in molecule {}",
                        atom.element, input.name
                    ))
                })?;
            elements.push(atom.element);
        }
        let centre_of_mass: Array1<f64> = match input.centre_of_mass {
            Some(centre) => Array1::from(centre.to_vec()),
            None => masses.dot(&positions) / masses.sum(),
        };

        Ok(Molecule {
            name: input.name,
            elements,
            positions,
            charges,
            centre_of_mass,
        })
    }
}

pub struct Lattice {
    /// lattice vectors as rows, in Angstrom
    pub vectors: Array2<f64>,
}

impl Lattice {
    pub fn new(vectors: Array2<f64>) -> Result<Self> {
        let v = &vectors;
        let det: f64 = v[[0, 0]] * (v[[1, 1]] * v[[2, 2]] - v[[1, 2]] * v[[2, 1]])
            - v[[0, 1]] * (v[[1, 0]] * v[[2, 2]] - v[[1, 2]] * v[[2, 0]])
            + v[[0, 2]] * (v[[1, 0]] * v[[2, 1]] - v[[1, 1]] * v[[2, 0]]);
        if !det.is_finite() || det.abs() < 1.0e-8 {
            return Err(EkmcError::Configuration(String::from(
                "the lattice vectors are linearly dependent",
            )));
        }
        Ok(Lattice { vectors })
    }

    /// Cartesian displacement of a cell translation, cell^T * L.
    pub fn displacement(&self, cell: &CellPoint) -> Array1<f64> {
        let cell: Array1<f64> = arr1(&[cell[0] as f64, cell[1] as f64, cell[2] as f64]);
        self.vectors.t().dot(&cell)
    }
}

/// Type that holds the immutable description of the crystal.
pub struct SystemData {
    /// sorted by name
    pub molecules: Vec<Molecule>,
    pub lattice: Lattice,
    pub bandgap_energies: HashMap<MoleculeName, f64>,
    pub reorganisation_energies: HashMap<(MoleculeName, MoleculeName), f64>,
    pub eet_couplings: HashMap<(MoleculeName, MoleculeName, CellPoint), f64>,
}

impl SystemData {
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("read setup data from {}", path.display());
        Self::from_setup(SetupData::from_file(path)?)
    }

    pub fn from_setup(setup: SetupData) -> Result<Self> {
        let lattice_vectors: Array2<f64> = Array2::from_shape_fn((3, 3), |(i, j)| setup.lattice[i][j]);
        let lattice: Lattice = Lattice::new(lattice_vectors)?;

        let mut molecules: Vec<Molecule> = setup
            .molecules
            .into_iter()
            .map(Molecule::try_from)
            .collect::<Result<Vec<Molecule>>>()?;
        molecules.sort_by_key(|molecule| molecule.name);
        let duplicates: Vec<MoleculeName> = molecules
            .iter()
            .map(|molecule| molecule.name)
            .tuple_windows()
            .filter(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect();
        if !duplicates.is_empty() {
            return Err(EkmcError::Configuration(format!(
                "molecule names are given more than once: {:?}",
                duplicates
            )));
        }
        if molecules.is_empty() {
            return Err(EkmcError::Configuration(String::from(
                "the setup data contains no molecules",
            )));
        }
        let names: BTreeSet<MoleculeName> = molecules.iter().map(|molecule| molecule.name).collect();

        check_molecule_consistency(
            &names,
            &setup.bandgap_energies,
            &setup.reorganisation_energies,
            &setup.eet_couplings,
            &setup.conformational_equivalence,
        )?;

        let representative = |name: MoleculeName| -> MoleculeName {
            *setup.conformational_equivalence.get(&name).unwrap_or(&name)
        };
        let unique_reorganisation: HashMap<(MoleculeName, MoleculeName), f64> = setup
            .reorganisation_energies
            .iter()
            .map(|entry| ((entry.donor, entry.acceptor), entry.energy))
            .collect();

        let mut bandgap_energies: HashMap<MoleculeName, f64> = HashMap::new();
        let mut reorganisation_energies: HashMap<(MoleculeName, MoleculeName), f64> = HashMap::new();
        for &name in names.iter() {
            let bandgap: f64 = *setup
                .bandgap_energies
                .get(&representative(name))
                .ok_or_else(|| {
                    EkmcError::Inconsistent(format!("no bandgap for molecule {}", name))
                })?;
            bandgap_energies.insert(name, bandgap);
            for &other in names.iter() {
                let key = (representative(name), representative(other));
                let energy: f64 = *unique_reorganisation.get(&key).ok_or_else(|| {
                    EkmcError::Inconsistent(format!(
                        "no reorganisation energy for the dimer {:?}",
                        key
                    ))
                })?;
                if !(energy > 0.0) {
                    return Err(EkmcError::Configuration(format!(
                        "reorganisation energy of dimer {:?} must be positive, got {}",
                        key, energy
                    )));
                }
                reorganisation_energies.insert((name, other), energy);
            }
        }

        let eet_couplings: HashMap<(MoleculeName, MoleculeName, CellPoint), f64> = setup
            .eet_couplings
            .iter()
            .map(|entry| ((entry.molecule1, entry.molecule2, entry.cell), entry.coupling))
            .collect();

        debug!(
            "{} molecules, {} EET couplings in the setup data",
            molecules.len(),
            eet_couplings.len()
        );

        Ok(SystemData {
            molecules,
            lattice,
            bandgap_energies,
            reorganisation_energies,
            eet_couplings,
        })
    }

    pub fn molecule_names(&self) -> Vec<MoleculeName> {
        self.molecules.iter().map(|molecule| molecule.name).collect()
    }

    pub fn molecule(&self, name: MoleculeName) -> Result<&Molecule> {
        self.molecules
            .binary_search_by_key(&name, |molecule| molecule.name)
            .map(|idx| &self.molecules[idx])
            .map_err(|_| EkmcError::MissingDatum(format!("molecule {} does not exist", name)))
    }

    pub fn bandgap(&self, name: MoleculeName) -> Result<f64> {
        self.bandgap_energies
            .get(&name)
            .copied()
            .ok_or_else(|| EkmcError::MissingDatum(format!("no bandgap for molecule {}", name)))
    }

    pub fn reorganisation_energy(&self, donor: MoleculeName, acceptor: MoleculeName) -> Result<f64> {
        self.reorganisation_energies
            .get(&(donor, acceptor))
            .copied()
            .ok_or_else(|| {
                EkmcError::MissingDatum(format!(
                    "no reorganisation energy for the dimer ({}, {})",
                    donor, acceptor
                ))
            })
    }

    /// EET coupling of a dimer, looked up in either orientation.
    pub fn eet_coupling(
        &self,
        molecule1: MoleculeName,
        molecule2: MoleculeName,
        cell: &CellPoint,
    ) -> Option<f64> {
        self.eet_couplings
            .get(&(molecule1, molecule2, *cell))
            .or_else(|| self.eet_couplings.get(&(molecule2, molecule1, negate_cell(cell))))
            .copied()
    }

    /// Cartesian position (centre of mass) of a molecule in a given cell.
    pub fn site_position(&self, site: &Site) -> Result<Array1<f64>> {
        let molecule: &Molecule = self.molecule(site.molecule)?;
        Ok(&molecule.centre_of_mass + &self.lattice.displacement(&site.cell))
    }
}

/// Checks that the bandgap, reorganisation, coupling and equivalence tables
/// all refer to the same set of molecules.
fn check_molecule_consistency(
    names: &BTreeSet<MoleculeName>,
    bandgap_energies: &BTreeMap<MoleculeName, f64>,
    reorganisation_energies: &[ReorganisationInput],
    eet_couplings: &[CouplingInput],
    conformational_equivalence: &BTreeMap<MoleculeName, MoleculeName>,
) -> Result<()> {
    let unknown_in_couplings: BTreeSet<MoleculeName> = eet_couplings
        .iter()
        .flat_map(|entry| vec![entry.molecule1, entry.molecule2])
        .filter(|name| !names.contains(name))
        .collect();
    if !unknown_in_couplings.is_empty() {
        return Err(EkmcError::Inconsistent(format!(
            "molecules {:?} of the coupling table are not in the crystal {:?}",
            unknown_in_couplings, names
        )));
    }

    let unknown_in_equivalence: BTreeSet<MoleculeName> = conformational_equivalence
        .iter()
        .flat_map(|(&equivalent, &unique)| vec![equivalent, unique])
        .filter(|name| !names.contains(name))
        .collect();
    if !unknown_in_equivalence.is_empty() {
        return Err(EkmcError::Inconsistent(format!(
            "molecules {:?} of the conformational equivalence table are not in the crystal {:?}",
            unknown_in_equivalence, names
        )));
    }
    let chained: Vec<MoleculeName> = conformational_equivalence
        .values()
        .filter(|unique| conformational_equivalence.contains_key(unique))
        .copied()
        .collect();
    if !chained.is_empty() {
        return Err(EkmcError::Inconsistent(format!(
            "molecules {:?} are used as unique molecules but are themselves marked as equivalent",
            chained
        )));
    }

    let unique_molecules: BTreeSet<MoleculeName> = names
        .iter()
        .filter(|name| !conformational_equivalence.contains_key(name))
        .copied()
        .collect();
    let bandgap_molecules: BTreeSet<MoleculeName> = bandgap_energies.keys().copied().collect();
    if bandgap_molecules != unique_molecules {
        return Err(EkmcError::Inconsistent(format!(
            "the bandgap table must cover exactly the unique molecules: \
             molecules in the bandgap table = {:?}, unique molecules = {:?}",
            bandgap_molecules, unique_molecules
        )));
    }

    let given_dimers: BTreeSet<(MoleculeName, MoleculeName)> = reorganisation_energies
        .iter()
        .map(|entry| (entry.donor, entry.acceptor))
        .collect();
    let expected_dimers: BTreeSet<(MoleculeName, MoleculeName)> = unique_molecules
        .iter()
        .cartesian_product(unique_molecules.iter())
        .map(|(&a, &b)| (a, b))
        .collect();
    if given_dimers != expected_dimers {
        let missing: Vec<&(MoleculeName, MoleculeName)> =
            expected_dimers.difference(&given_dimers).collect();
        let extra: Vec<&(MoleculeName, MoleculeName)> =
            given_dimers.difference(&expected_dimers).collect();
        return Err(EkmcError::Inconsistent(format!(
            "the reorganisation table must cover every ordered pair of unique molecules: \
             missing = {:?}, not expected = {:?}",
            missing, extra
        )));
    }
    Ok(())
}
