use crate::initialization::{CellPoint, Lattice, ORIGIN_CELL};
use itertools::iproduct;
use log::debug;
use std::collections::BTreeSet;

fn shell(size: i32) -> impl Iterator<Item = CellPoint> {
    iproduct!(-size..=size, -size..=size, -size..=size)
        .filter(move |(i, j, k)| i.abs().max(j.abs()).max(k.abs()) == size)
        .map(|(i, j, k)| [i, j, k])
}

/// Cells whose lattice translation lies within `cutoff` of the origin, grown
/// shell by shell until a whole shell contributes nothing. The origin cell is
/// part of the result.
pub fn cells_within_cutoff(lattice: &Lattice, cutoff: f64) -> BTreeSet<CellPoint> {
    let mut cells: BTreeSet<CellPoint> = BTreeSet::new();
    cells.insert(ORIGIN_CELL);
    let mut size: i32 = 1;
    loop {
        let added: Vec<CellPoint> = shell(size)
            .filter(|cell| {
                let displacement = lattice.displacement(cell);
                displacement.dot(&displacement).sqrt() <= cutoff
            })
            .collect();
        if added.is_empty() {
            break;
        }
        cells.extend(added);
        size += 1;
    }
    cells
}

/// Every cell a dimer partner can sit in: the cells within the cutoff plus one
/// surrounding layer of neighbouring cells, so that molecules whose centre
/// lies just outside the sphere are still examined. The origin is excluded.
pub fn expanded_cell_points(lattice: &Lattice, cutoff: f64) -> Vec<CellPoint> {
    let within: BTreeSet<CellPoint> = cells_within_cutoff(lattice, cutoff);
    let mut expanded: BTreeSet<CellPoint> = within.clone();
    for cell in within.iter() {
        for (i, j, k) in iproduct!(-1..=1, -1..=1, -1..=1) {
            expanded.insert([cell[0] + i, cell[1] + j, cell[2] + k]);
        }
    }
    expanded.remove(&ORIGIN_CELL);
    debug!(
        "{} cells within {} A, {} cells including the surrounding layer",
        within.len() - 1,
        cutoff,
        expanded.len()
    );
    expanded.into_iter().collect()
}

/// One representative of each pair {c, -c}: the first non-zero index is positive.
pub fn is_positive_half(cell: &CellPoint) -> bool {
    cell.iter()
        .find(|&&index| index != 0)
        .map_or(false, |&index| index > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::prelude::*;

    fn cubic(a: f64) -> Lattice {
        Lattice::new(Array2::eye(3) * a).unwrap()
    }

    #[test]
    fn face_cells_on_the_cutoff_are_kept() {
        let cells: BTreeSet<CellPoint> = cells_within_cutoff(&cubic(10.0), 10.0);
        assert_eq!(cells.len(), 7);
        assert!(cells.contains(&[0, 0, -1]));
        assert!(!cells.contains(&[1, 1, 0]));
    }

    #[test]
    fn surrounding_layer_is_added() {
        let cells: Vec<CellPoint> = expanded_cell_points(&cubic(10.0), 10.0);
        let expected: BTreeSet<CellPoint> = iproduct!(-2..=2, -2..=2, -2..=2)
            .map(|(i, j, k)| [i, j, k])
            .filter(|cell| {
                let within: Vec<CellPoint> = vec![
                    [0, 0, 0],
                    [1, 0, 0],
                    [-1, 0, 0],
                    [0, 1, 0],
                    [0, -1, 0],
                    [0, 0, 1],
                    [0, 0, -1],
                ];
                within.iter().any(|centre| {
                    (0..3).all(|axis| (cell[axis] - centre[axis]).abs() <= 1)
                })
            })
            .filter(|cell| *cell != ORIGIN_CELL)
            .collect();
        assert_eq!(cells, expected.into_iter().collect::<Vec<CellPoint>>());
        assert!(cells.contains(&[2, 1, 1]));
        assert!(!cells.contains(&[2, 2, 0]));
    }

    #[test]
    fn skewed_lattice_keeps_short_translations() {
        let lattice: Lattice =
            Lattice::new(array![[4.0, 0.0, 0.0], [3.9, 1.0, 0.0], [0.0, 0.0, 50.0]]).unwrap();
        let cells: BTreeSet<CellPoint> = cells_within_cutoff(&lattice, 2.0);
        // (1, -1, 0) translates by (0.1, -1.0, 0.0)
        assert!(cells.contains(&[1, -1, 0]));
        assert!(cells.contains(&[-1, 1, 0]));
    }

    #[test]
    fn positive_half_splits_inverse_pairs() {
        assert!(is_positive_half(&[0, 1, -3]));
        assert!(!is_positive_half(&[0, -1, 3]));
        assert!(!is_positive_half(&ORIGIN_CELL));
    }
}
