use crate::error::{EkmcError, Result};
use crate::initialization::{CellPoint, MoleculeName};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Donor molecule, acceptor molecule and the cell of the acceptor relative to the donor.
pub type HopKey = (MoleculeName, MoleculeName, CellPoint);

/// Probability k_i / R of one kind of hop, averaged over all logged steps of all walkers.
#[derive(Clone, Debug, PartialEq)]
pub struct HopProbability {
    pub donor: MoleculeName,
    pub acceptor: MoleculeName,
    pub cell_offset: CellPoint,
    pub mean: f64,
    /// sample standard deviation, undefined for a single value
    pub standard_deviation: Option<f64>,
    pub n_samples: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Moments {
    n: usize,
    sum: f64,
    sum_of_squares: f64,
}

impl Moments {
    fn push(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
        self.sum_of_squares += value * value;
    }

    fn merge(&mut self, other: &Moments) {
        self.n += other.n;
        self.sum += other.sum;
        self.sum_of_squares += other.sum_of_squares;
    }
}

/// Parses `m (i, j, k)`.
fn parse_site(text: &str) -> Option<(MoleculeName, CellPoint)> {
    let (name, cell) = text.trim().split_once('(')?;
    let name: MoleculeName = name.trim().parse().ok()?;
    let values: Vec<i32> = cell
        .trim()
        .strip_suffix(')')?
        .split(',')
        .map(|value| value.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<i32>, _>>()
        .ok()?;
    match values.as_slice() {
        [i, j, k] => Some((name, [*i, *j, *k])),
        _ => None,
    }
}

/// Splits one line of the rate constant log into the hop probabilities of
/// that step. Returns `None` for lines that cannot be read.
pub fn parse_rate_line(line: &str) -> Option<Vec<(HopKey, f64)>> {
    let (head, hops) = line.split_once("-->")?;
    let (_step, donor) = head.split_once(':')?;
    let (donor, total_rate) = donor.split_once('[')?;
    let (donor, donor_cell) = parse_site(donor)?;
    let total_rate: f64 = total_rate.trim().strip_suffix(']')?.trim().parse().ok()?;
    if !(total_rate > 0.0) {
        return None;
    }
    hops.split('/')
        .map(|hop| {
            let (site, rate) = hop.rsplit_once(':')?;
            let (acceptor, acceptor_cell) = parse_site(site)?;
            let rate: f64 = rate.trim().parse().ok()?;
            let offset: CellPoint = [
                acceptor_cell[0] - donor_cell[0],
                acceptor_cell[1] - donor_cell[1],
                acceptor_cell[2] - donor_cell[2],
            ];
            Some(((donor, acceptor, offset), rate / total_rate))
        })
        .collect()
}

fn read_rate_log(path: &Path) -> Result<BTreeMap<HopKey, Moments>> {
    let text: String = fs::read_to_string(path)?;
    let mut moments: BTreeMap<HopKey, Moments> = BTreeMap::new();
    let mut lines = text.lines().enumerate().peekable();
    let mut n_steps: usize = 0;
    while let Some((idx, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_rate_line(line) {
            Some(hops) => {
                for (key, probability) in hops.into_iter() {
                    moments.entry(key).or_default().push(probability);
                }
                n_steps += 1;
            }
            None if lines.peek().is_none() => {
                warn!("ignore the incomplete last line of {:?}", path);
            }
            None => {
                return Err(EkmcError::MalformedRecord {
                    line: idx + 1,
                    reason: format!("unreadable rate constants in {:?}", path),
                })
            }
        }
    }
    debug!("{:?}: {} steps", path, n_steps);
    Ok(moments)
}

/// Mean and spread of k_i / R per kind of hop over all rate constant logs in
/// `paths`. Sorted by donor, acceptor and then by the cell offset, nearest
/// cells first.
pub fn average_hopping_probabilities(paths: &[PathBuf]) -> Result<Vec<HopProbability>> {
    let per_log: Vec<BTreeMap<HopKey, Moments>> = paths
        .par_iter()
        .map(|path| read_rate_log(path))
        .collect::<Result<Vec<BTreeMap<HopKey, Moments>>>>()?;
    let mut total: BTreeMap<HopKey, Moments> = BTreeMap::new();
    for moments in per_log.iter() {
        for (key, value) in moments.iter() {
            total.entry(*key).or_default().merge(value);
        }
    }

    let mut probabilities: Vec<HopProbability> = total
        .into_iter()
        .map(|((donor, acceptor, cell_offset), moments)| {
            let n: f64 = moments.n as f64;
            let mean: f64 = moments.sum / n;
            let standard_deviation: Option<f64> = if moments.n > 1 {
                let variance: f64 = (moments.sum_of_squares - n * mean * mean) / (n - 1.0);
                Some(variance.max(0.0).sqrt())
            } else {
                None
            };
            HopProbability {
                donor,
                acceptor,
                cell_offset,
                mean,
                standard_deviation,
                n_samples: moments.n,
            }
        })
        .collect();
    probabilities.sort_by_key(|hop| {
        let c: CellPoint = hop.cell_offset;
        (
            hop.donor,
            hop.acceptor,
            [c[0].abs(), c[1].abs(), c[2].abs()],
            [-c[0], -c[1], -c[2]],
        )
    });
    Ok(probabilities)
}
