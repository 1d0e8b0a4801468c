use crate::constants::DISTANCE_DECIMALS;
use crate::initialization::{DistanceMethod, Molecule};
use ndarray::prelude::*;

/// Geometry of one molecule reduced to what the distance policies need.
pub struct MoleculeGeometry {
    pub centre_of_mass: Array1<f64>,
    pub centre_of_molecule: Array1<f64>,
    pub heavy_atoms: Array2<f64>,
}

impl From<&Molecule> for MoleculeGeometry {
    fn from(molecule: &Molecule) -> Self {
        MoleculeGeometry {
            centre_of_mass: molecule.centre_of_mass.clone(),
            centre_of_molecule: molecule.centre_of_molecule(),
            heavy_atoms: molecule.heavy_atom_positions(),
        }
    }
}

fn norm(vector: ArrayView1<f64>) -> f64 {
    vector.dot(&vector).sqrt()
}

fn round_distance(distance: f64) -> f64 {
    let factor: f64 = 10f64.powi(DISTANCE_DECIMALS);
    (distance * factor).round() / factor
}

/// Distance in Angstrom between `first` and `second` shifted by `displacement`.
pub fn molecule_distance(
    method: DistanceMethod,
    first: &MoleculeGeometry,
    second: &MoleculeGeometry,
    displacement: ArrayView1<f64>,
) -> f64 {
    let distance: f64 = match method {
        DistanceMethod::CentreOfMass => {
            norm((&second.centre_of_mass + &displacement - &first.centre_of_mass).view())
        }
        DistanceMethod::CentreOfMolecule => norm(
            (&second.centre_of_molecule + &displacement - &first.centre_of_molecule).view(),
        ),
        DistanceMethod::NearestAtoms => nearest_atom_distance(
            first.heavy_atoms.view(),
            second.heavy_atoms.view(),
            displacement,
        ),
    };
    round_distance(distance)
}

/// Shortest distance between any atom of `first` and any shifted atom of `second`.
pub fn nearest_atom_distance(
    first: ArrayView2<f64>,
    second: ArrayView2<f64>,
    displacement: ArrayView1<f64>,
) -> f64 {
    let shifted: Array2<f64> = &second + &displacement;
    let mut shortest: f64 = f64::INFINITY;
    for atom1 in first.outer_iter() {
        for atom2 in shifted.outer_iter() {
            let difference: Array1<f64> = &atom2 - &atom1;
            shortest = shortest.min(norm(difference.view()));
        }
    }
    shortest
}
