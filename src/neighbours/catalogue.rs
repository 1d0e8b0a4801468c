use super::cells::{expanded_cell_points, is_positive_half};
use super::coulomb::molecule_coulomb_coupling;
use super::distance::{molecule_distance, MoleculeGeometry};
use crate::error::{EkmcError, Result};
use crate::initialization::{
    negate_cell, CellPoint, CouplingModel, EkmcConfiguration, MoleculeName, SystemData,
    ORIGIN_CELL,
};
use crate::rates::{RateConstants, RateLaw};
use hashbrown::HashMap;
use log::{debug, info};
use ndarray::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Disorder free data of one ordered dimer.
#[derive(Clone, Debug)]
pub struct NeighbourEntry {
    /// bare coupling V0 in eV
    pub coupling: f64,
    /// separation according to the distance policy, in Angstrom
    pub distance: f64,
    /// centre of mass hop vector in Angstrom
    pub displacement: [f64; 3],
    pub constants: RateConstants,
}

impl NeighbourEntry {
    pub fn hop_distance(&self) -> f64 {
        self.displacement.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn rate_constant(&self, coupling: f64, delta_e: f64) -> f64 {
        self.constants.rate_constant(coupling, delta_e)
    }
}

#[derive(Clone, Debug)]
pub struct Neighbour {
    pub molecule: MoleculeName,
    pub cell_offset: CellPoint,
    pub entry: NeighbourEntry,
}

/// Evaluated dimer before it is split into both hop directions.
struct DimerCoupling {
    molecule1: MoleculeName,
    molecule2: MoleculeName,
    cell: CellPoint,
    coupling: f64,
    distance: f64,
    displacement: [f64; 3],
}

/// Immutable adjacency table of the crystal: for every molecule in the origin
/// cell, all molecules it can hop to with their relative cell.
pub struct NeighbourCatalogue {
    neighbourhoods: BTreeMap<MoleculeName, Vec<Neighbour>>,
}

impl NeighbourCatalogue {
    pub fn build(system: &SystemData, config: &EkmcConfiguration) -> Result<Self> {
        let short_cutoff: f64 = config.short_range_cutoff;
        let long_cutoff: f64 = config.long_range_cutoff;
        let names: Vec<MoleculeName> = system.molecule_names();
        let geometries: HashMap<MoleculeName, MoleculeGeometry> = system
            .molecules
            .iter()
            .map(|molecule| (molecule.name, MoleculeGeometry::from(molecule)))
            .collect();

        let cells: Vec<CellPoint> = expanded_cell_points(&system.lattice, long_cutoff);
        let mut jobs: Vec<(MoleculeName, MoleculeName, CellPoint)> = Vec::new();
        for (idx, &molecule1) in names.iter().enumerate() {
            // the self dimer (m, m, c) is the inverse of (m, m, -c)
            for cell in cells.iter().filter(|cell| is_positive_half(cell)) {
                jobs.push((molecule1, molecule1, *cell));
            }
            for &molecule2 in names[idx + 1..].iter() {
                jobs.push((molecule1, molecule2, ORIGIN_CELL));
                for cell in cells.iter() {
                    jobs.push((molecule1, molecule2, *cell));
                }
            }
        }
        info!(
            "evaluate {} dimers over {} cells (r_short = {} A, r_long = {} A)",
            jobs.len(),
            cells.len(),
            short_cutoff,
            long_cutoff
        );

        let evaluated: Vec<Option<DimerCoupling>> = jobs
            .par_iter()
            .map(|&(molecule1, molecule2, cell)| {
                evaluate_dimer(system, config, &geometries, molecule1, molecule2, cell)
            })
            .collect::<Result<Vec<Option<DimerCoupling>>>>()?;

        let mut rate_constants: HashMap<(MoleculeName, MoleculeName), RateConstants> =
            HashMap::new();
        for &donor in names.iter() {
            for &acceptor in names.iter() {
                let lambda: f64 = system.reorganisation_energy(donor, acceptor)?;
                rate_constants.insert(
                    (donor, acceptor),
                    RateConstants::new(config.kinetic_model, lambda, &config.constant_rate_data)?,
                );
            }
        }

        let mut neighbourhoods: BTreeMap<MoleculeName, Vec<Neighbour>> =
            names.iter().map(|&name| (name, Vec::new())).collect();
        for dimer in evaluated.into_iter().flatten() {
            let inverse_displacement: [f64; 3] = [
                -dimer.displacement[0],
                -dimer.displacement[1],
                -dimer.displacement[2],
            ];
            let directions = [
                (dimer.molecule1, dimer.molecule2, dimer.cell, dimer.displacement),
                (
                    dimer.molecule2,
                    dimer.molecule1,
                    negate_cell(&dimer.cell),
                    inverse_displacement,
                ),
            ];
            for &(donor, acceptor, cell_offset, displacement) in directions.iter() {
                let constants: RateConstants = rate_constants
                    .get(&(donor, acceptor))
                    .cloned()
                    .ok_or_else(|| {
                        EkmcError::MissingDatum(format!(
                            "no rate constants for the dimer ({}, {})",
                            donor, acceptor
                        ))
                    })?;
                let neighbour: Neighbour = Neighbour {
                    molecule: acceptor,
                    cell_offset,
                    entry: NeighbourEntry {
                        coupling: dimer.coupling,
                        distance: dimer.distance,
                        displacement,
                        constants,
                    },
                };
                if let Some(neighbourhood) = neighbourhoods.get_mut(&donor) {
                    neighbourhood.push(neighbour);
                }
            }
        }

        for (name, neighbourhood) in neighbourhoods.iter_mut() {
            neighbourhood.sort_by(|a, b| (a.molecule, a.cell_offset).cmp(&(b.molecule, b.cell_offset)));
            debug!("molecule {}: {} neighbours", name, neighbourhood.len());
            if neighbourhood.is_empty() {
                return Err(EkmcError::NoOutgoingRate {
                    molecule: *name,
                    cell: ORIGIN_CELL,
                });
            }
        }

        let catalogue: NeighbourCatalogue = NeighbourCatalogue { neighbourhoods };
        catalogue.check_inverse_pairs(&rate_constants)?;
        info!("neighbour catalogue holds {} hops", catalogue.len());
        Ok(catalogue)
    }

    pub fn neighbours(&self, molecule: MoleculeName) -> Result<&[Neighbour]> {
        self.neighbourhoods
            .get(&molecule)
            .map(|neighbourhood| neighbourhood.as_slice())
            .ok_or_else(|| {
                EkmcError::MissingDatum(format!(
                    "molecule {} is not part of the neighbour catalogue",
                    molecule
                ))
            })
    }

    pub fn get(
        &self,
        donor: MoleculeName,
        acceptor: MoleculeName,
        cell_offset: &CellPoint,
    ) -> Option<&NeighbourEntry> {
        let neighbourhood: &Vec<Neighbour> = self.neighbourhoods.get(&donor)?;
        neighbourhood
            .binary_search_by(|neighbour| {
                (neighbour.molecule, neighbour.cell_offset).cmp(&(acceptor, *cell_offset))
            })
            .ok()
            .map(|idx| &neighbourhood[idx].entry)
    }

    pub fn molecule_names(&self) -> Vec<MoleculeName> {
        self.neighbourhoods.keys().copied().collect()
    }

    /// Total number of ordered hops.
    pub fn len(&self) -> usize {
        self.neighbourhoods.values().map(|neighbourhood| neighbourhood.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every hop (m, m', c) needs its inverse (m', m, -c) with the same
    /// |coupling|. Both directions must carry the rate constants that
    /// `rate_constants` holds for their ordered pair.
    pub fn check_inverse_pairs(
        &self,
        rate_constants: &HashMap<(MoleculeName, MoleculeName), RateConstants>,
    ) -> Result<()> {
        let expected_constants = |donor: MoleculeName, acceptor: MoleculeName| {
            rate_constants.get(&(donor, acceptor)).ok_or_else(|| {
                EkmcError::MissingDatum(format!(
                    "no rate constants for the dimer ({}, {})",
                    donor, acceptor
                ))
            })
        };
        for (&donor, neighbourhood) in self.neighbourhoods.iter() {
            for neighbour in neighbourhood.iter() {
                let acceptor: MoleculeName = neighbour.molecule;
                let inverse: &NeighbourEntry = self
                    .get(acceptor, donor, &negate_cell(&neighbour.cell_offset))
                    .ok_or_else(|| {
                        EkmcError::Inconsistent(format!(
                            "hop {} -> {} in cell {:?} has no inverse",
                            donor, acceptor, neighbour.cell_offset
                        ))
                    })?;
                if inverse.coupling.abs() != neighbour.entry.coupling.abs() {
                    return Err(EkmcError::Inconsistent(format!(
                        "hop {} -> {} in cell {:?} has coupling {} but its inverse has {}",
                        donor,
                        acceptor,
                        neighbour.cell_offset,
                        neighbour.entry.coupling,
                        inverse.coupling
                    )));
                }
                if neighbour.entry.constants != *expected_constants(donor, acceptor)?
                    || inverse.constants != *expected_constants(acceptor, donor)?
                {
                    return Err(EkmcError::Inconsistent(format!(
                        "hop {} -> {} in cell {:?} or its inverse carries the rate constants of another dimer",
                        donor, acceptor, neighbour.cell_offset
                    )));
                }
            }
        }
        Ok(())
    }
}

fn evaluate_dimer(
    system: &SystemData,
    config: &EkmcConfiguration,
    geometries: &HashMap<MoleculeName, MoleculeGeometry>,
    molecule1: MoleculeName,
    molecule2: MoleculeName,
    cell: CellPoint,
) -> Result<Option<DimerCoupling>> {
    let missing = |name: MoleculeName| {
        EkmcError::MissingDatum(format!("no geometry for molecule {}", name))
    };
    let geometry1: &MoleculeGeometry = geometries.get(&molecule1).ok_or_else(|| missing(molecule1))?;
    let geometry2: &MoleculeGeometry = geometries.get(&molecule2).ok_or_else(|| missing(molecule2))?;
    let translation: Array1<f64> = system.lattice.displacement(&cell);
    let distance: f64 =
        molecule_distance(config.distance_method, geometry1, geometry2, translation.view());

    let model: CouplingModel = if distance <= config.short_range_cutoff {
        config.short_range_coupling_model
    } else if distance <= config.long_range_cutoff {
        config.long_range_coupling_model
    } else {
        return Ok(None);
    };
    let coupling: f64 = match model {
        CouplingModel::Disabled => 0.0,
        CouplingModel::Eet => system
            .eet_coupling(molecule1, molecule2, &cell)
            .ok_or(EkmcError::MissingCoupling {
                molecule1,
                molecule2,
                cell,
            })?,
        CouplingModel::Atc => molecule_coulomb_coupling(
            system.molecule(molecule1)?,
            system.molecule(molecule2)?,
            translation.view(),
            config.constant_rate_data.relative_permittivity,
        )?,
    };
    if !coupling.is_finite() {
        return Err(EkmcError::Arithmetic(format!(
            "coupling of dimer ({}, {}) in cell {:?} is {}",
            molecule1, molecule2, cell, coupling
        )));
    }
    if coupling.abs() < f64::EPSILON {
        return Ok(None);
    }

    let hop: Array1<f64> = &geometry2.centre_of_mass + &translation - &geometry1.centre_of_mass;
    Ok(Some(DimerCoupling {
        molecule1,
        molecule2,
        cell,
        coupling,
        distance,
        displacement: [hop[0], hop[1], hop[2]],
    }))
}
