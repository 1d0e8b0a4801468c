use crate::constants::COULOMB_CONSTANT;
use crate::error::{EkmcError, Result};
use crate::initialization::Molecule;
use ndarray::prelude::*;

/// Transition charge coupling (eV) between two sets of point charges, the
/// second one shifted by `displacement`:
///
///   V = k_C / eps_r * sum_i sum_j q_i q_j / |r_i - (r_j + d)|
///
/// The sign follows the charges and must be kept.
pub fn coulomb_coupling(
    positions1: ArrayView2<f64>,
    charges1: ArrayView1<f64>,
    positions2: ArrayView2<f64>,
    charges2: ArrayView1<f64>,
    displacement: ArrayView1<f64>,
    relative_permittivity: f64,
) -> Result<f64> {
    let mut energy: f64 = 0.0;
    for (r_i, q_i) in positions1.outer_iter().zip(charges1.iter()) {
        for (r_j, q_j) in positions2.outer_iter().zip(charges2.iter()) {
            let separation: Array1<f64> = &r_i - &(&r_j + &displacement);
            let distance: f64 = separation.dot(&separation).sqrt();
            if distance == 0.0 {
                return Err(EkmcError::Arithmetic(String::from(
                    "two transition charges sit on the same point",
                )));
            }
            energy += q_i * q_j / distance;
        }
    }
    Ok(COULOMB_CONSTANT / relative_permittivity * energy)
}

pub fn molecule_coulomb_coupling(
    first: &Molecule,
    second: &Molecule,
    displacement: ArrayView1<f64>,
    relative_permittivity: f64,
) -> Result<f64> {
    coulomb_coupling(
        first.positions.view(),
        first.charges.view(),
        second.positions.view(),
        second.charges.view(),
        displacement,
        relative_permittivity,
    )
}
