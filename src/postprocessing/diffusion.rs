use crate::constants::ANGS2_PER_PS_TO_CM2_PER_S;
use crate::error::{EkmcError, Result};
use crate::postprocessing::{SampledTrajectory, Trajectory};
use ndarray::prelude::*;
use ndarray_linalg::{Eigh, UPLO};
use serde::Serialize;

/// Ensemble observables at one grid time. Diffusion quantities in cm^2/s.
#[derive(Clone, Debug)]
pub struct DiffusionPoint {
    /// ps
    pub time: f64,
    /// <|dr|> in Angstrom
    pub mean_displacement: f64,
    /// <|dr|^2> in Angstrom^2
    pub mean_square_displacement: f64,
    pub diffusion_coefficient: f64,
    /// <E> in eV
    pub energy: f64,
    pub tensor: Array2<f64>,
    /// descending
    pub eigenvalues: Array1<f64>,
    /// eigenvectors in the columns, ordered like the eigenvalues
    pub eigenvectors: Array2<f64>,
}

/// Upper triangle of a symmetric 3x3 tensor.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct TensorComponents {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

impl TensorComponents {
    pub fn from_tensor(tensor: &Array2<f64>) -> Self {
        TensorComponents {
            xx: tensor[[0, 0]],
            yy: tensor[[1, 1]],
            zz: tensor[[2, 2]],
            xy: tensor[[0, 1]],
            xz: tensor[[0, 2]],
            yz: tensor[[1, 2]],
        }
    }

    /// Order used by the trajectory log: xx, yy, zz, xy, xz, yz.
    pub fn to_array(&self) -> [f64; 6] {
        [self.xx, self.yy, self.zz, self.xy, self.xz, self.yz]
    }
}

pub fn tensor_from_components(components: &[f64; 6]) -> Array2<f64> {
    let [xx, yy, zz, xy, xz, yz] = *components;
    array![[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]]
}

/// Mean displacement, MSD, isotropic diffusion coefficient D = MSD / (6t) and
/// the tensor D_ab = <dr_a dr_b> / (2t) at every grid time. At t = 0 all
/// diffusion quantities are zero.
pub fn ensemble_observables(
    samples: &[SampledTrajectory],
    grid: ArrayView1<f64>,
) -> Result<Vec<DiffusionPoint>> {
    if samples.is_empty() {
        return Err(EkmcError::Statistics(String::from(
            "no trajectories to average over",
        )));
    }
    let n: f64 = samples.len() as f64;
    let mut points: Vec<DiffusionPoint> = Vec::with_capacity(grid.len());
    for (idx, time) in grid.iter().enumerate() {
        let mut mean_displacement: f64 = 0.0;
        let mut mean_square_displacement: f64 = 0.0;
        let mut energy: f64 = 0.0;
        let mut second_moment: Array2<f64> = Array2::zeros((3, 3));
        for sample in samples.iter() {
            let displacement: ArrayView1<f64> = sample.displacements.row(idx);
            let square: f64 = displacement.dot(&displacement);
            mean_displacement += square.sqrt();
            mean_square_displacement += square;
            energy += sample.energies[idx];
            let column: ArrayView2<f64> = displacement.insert_axis(Axis(1));
            second_moment = second_moment + column.dot(&column.t());
        }
        mean_displacement /= n;
        mean_square_displacement /= n;
        energy /= n;
        second_moment /= n;

        let (diffusion_coefficient, tensor): (f64, Array2<f64>) = if *time > 0.0 {
            (
                mean_square_displacement / (6.0 * time) * ANGS2_PER_PS_TO_CM2_PER_S,
                second_moment * (ANGS2_PER_PS_TO_CM2_PER_S / (2.0 * time)),
            )
        } else {
            (0.0, Array2::zeros((3, 3)))
        };
        let (eigenvalues, eigenvectors): (Array1<f64>, Array2<f64>) = principal_axes(&tensor)?;
        points.push(DiffusionPoint {
            time: *time,
            mean_displacement,
            mean_square_displacement,
            diffusion_coefficient,
            energy,
            tensor,
            eigenvalues,
            eigenvectors,
        });
    }
    Ok(points)
}

/// Eigenvalues in descending order and the matching eigenvectors (columns),
/// each signed so that its largest component is positive. The tensor is
/// symmetrised first.
pub fn principal_axes(tensor: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let symmetric: Array2<f64> = (tensor + &tensor.t()) * 0.5;
    let (values, vectors): (Array1<f64>, Array2<f64>) = symmetric.eigh(UPLO::Lower)?;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| {
        values[*b]
            .partial_cmp(&values[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut eigenvalues: Array1<f64> = Array1::zeros(values.len());
    let mut eigenvectors: Array2<f64> = Array2::zeros(vectors.raw_dim());
    for (new, old) in order.iter().enumerate() {
        eigenvalues[new] = values[*old];
        let mut vector: Array1<f64> = vectors.column(*old).to_owned();
        let largest: f64 = vector
            .iter()
            .copied()
            .fold(0.0, |acc: f64, x: f64| if x.abs() > acc.abs() { x } else { acc });
        if largest < 0.0 {
            vector *= -1.0;
        }
        eigenvectors.column_mut(new).assign(&vector);
    }
    Ok((eigenvalues, eigenvectors))
}

/// Diffusion tensor from the per-hop tensors of the logs, weighted by the
/// waiting times: sum(tau * D_hop) / sum(tau), in cm^2/s.
pub fn step_weighted_tensor(trajectories: &[Trajectory]) -> Result<Array2<f64>> {
    let mut weighted: [f64; 6] = [0.0; 6];
    let mut total_time: f64 = 0.0;
    for record in trajectories.iter().flat_map(|trajectory| trajectory.records.iter()) {
        for (sum, component) in weighted.iter_mut().zip(record.diffusion.iter()) {
            *sum += record.time_step * component;
        }
        total_time += record.time_step;
    }
    if !(total_time > 0.0) {
        return Err(EkmcError::Statistics(String::from(
            "the trajectories contain no hops",
        )));
    }
    for sum in weighted.iter_mut() {
        *sum /= total_time;
    }
    Ok(tensor_from_components(&weighted))
}
