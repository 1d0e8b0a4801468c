use crate::error::Result;
use crate::postprocessing::{
    DiffusionPoint, HopProbability, TensorComponents, TimeAveragedSummary,
};
use std::fs;
use std::path::Path;

pub const DIFFUSION_TABLE_FILE_NAME: &str = "diffusion_over_time.txt";
pub const EIGENVECTOR_FILE_NAME: &str = "diffusion_eigenvectors.xyz";
pub const SUMMARY_FILE_NAME: &str = "time_averaged_summary.yaml";
pub const HOPPING_PROBABILITY_FILE_NAME: &str = "Average_Hopping_Probability.txt";

/// Length in Angstrom of the pseudo-atom axis belonging to the largest eigenvalue.
const AXIS_LENGTH: f64 = 10.0;

pub fn diffusion_table(points: &[DiffusionPoint]) -> String {
    let columns: [&str; 14] = [
        "Time(ps)",
        "Mean_Displacement(A)",
        "MSD(A^2)",
        "D(cm^2/s)",
        "Energy(eV)",
        "D_xx",
        "D_yy",
        "D_zz",
        "D_xy",
        "D_xz",
        "D_yz",
        "Eigenvalue_1",
        "Eigenvalue_2",
        "Eigenvalue_3",
    ];
    let mut string: String = columns
        .iter()
        .map(|column| format!("{:>22}", column))
        .collect::<Vec<String>>()
        .join(" ");
    string.push('\n');
    for point in points.iter() {
        let mut values: Vec<f64> = vec![
            point.time,
            point.mean_displacement,
            point.mean_square_displacement,
            point.diffusion_coefficient,
            point.energy,
        ];
        values.extend_from_slice(&TensorComponents::from_tensor(&point.tensor).to_array());
        values.extend(point.eigenvalues.iter());
        let line: Vec<String> = values.iter().map(|value| format!("{:>22.12e}", value)).collect();
        string.push_str(&line.join(" "));
        string.push('\n');
    }
    string
}

/// Principal axes of the diffusion tensor as an XYZ frame: a carbon atom at
/// the origin and a pair of pseudo-atoms along every eigenvector, placed at a
/// distance proportional to the eigenvalue.
pub fn eigenvector_xyz(point: &DiffusionPoint) -> String {
    let symbols: [&str; 3] = ["O", "N", "H"];
    let largest: f64 = point
        .eigenvalues
        .iter()
        .fold(0.0, |acc: f64, value| acc.max(value.abs()));
    let mut string: String = String::from("7\n");
    string.push_str(&format!(
        "principal axes at {} ps, eigenvalues {:.6e} {:.6e} {:.6e} cm^2/s\n",
        point.time, point.eigenvalues[0], point.eigenvalues[1], point.eigenvalues[2]
    ));
    string.push_str(&format!("C\t{:.6}\t{:.6}\t{:.6}\n", 0.0, 0.0, 0.0));
    for (idx, symbol) in symbols.iter().enumerate() {
        let length: f64 = if largest > 0.0 {
            AXIS_LENGTH * point.eigenvalues[idx].abs() / largest
        } else {
            0.0
        };
        for sign in [1.0, -1.0].iter() {
            let column = point.eigenvectors.column(idx);
            string.push_str(&format!(
                "{}\t{:.6}\t{:.6}\t{:.6}\n",
                symbol,
                sign * length * column[0],
                sign * length * column[1],
                sign * length * column[2]
            ));
        }
    }
    string
}

/// Writes the three post-processing files into `folder`. The eigenvector
/// file holds one XYZ frame per time of the grid.
pub fn write_results(
    folder: &Path,
    points: &[DiffusionPoint],
    summary: &TimeAveragedSummary,
) -> Result<()> {
    fs::create_dir_all(folder)?;
    fs::write(folder.join(DIFFUSION_TABLE_FILE_NAME), diffusion_table(points))?;
    let frames: String = points.iter().map(eigenvector_xyz).collect();
    fs::write(folder.join(EIGENVECTOR_FILE_NAME), frames)?;
    fs::write(folder.join(SUMMARY_FILE_NAME), serde_yaml::to_string(summary)?)?;
    Ok(())
}

/// `(donor, acceptor, i, j, k): mean [standard deviation]`, one hop per line.
pub fn hopping_probability_table(probabilities: &[HopProbability]) -> String {
    let mut string: String = String::new();
    for hop in probabilities.iter() {
        let deviation: String = hop
            .standard_deviation
            .map_or(String::from("-"), |value| format!("{:.6e}", value));
        string.push_str(&format!(
            "({}, {}, {}, {}, {}): {:.6e} [{}]\n",
            hop.donor,
            hop.acceptor,
            hop.cell_offset[0],
            hop.cell_offset[1],
            hop.cell_offset[2],
            hop.mean,
            deviation
        ));
    }
    string
}

pub fn write_hopping_probabilities(folder: &Path, probabilities: &[HopProbability]) -> Result<()> {
    fs::create_dir_all(folder)?;
    fs::write(
        folder.join(HOPPING_PROBABILITY_FILE_NAME),
        hopping_probability_table(probabilities),
    )?;
    Ok(())
}
