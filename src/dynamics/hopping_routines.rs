use crate::constants::ANGS2_PER_PS_TO_CM2_PER_S;
use crate::error::{EkmcError, Result};
use crate::initialization::{add_cells, Simulation, Site};
use crate::neighbours::{Neighbour, NeighbourCatalogue};
use rand::prelude::*;

impl Simulation<'_> {
    /// Fills `self.rates` with the rate constants (1/s) of all hops out of the
    /// current site and returns their sum. Site energies and couplings are
    /// taken from the disorder cache, so every site and dimer is sampled once.
    pub fn rate_constants(&mut self) -> Result<f64> {
        let catalogue: &NeighbourCatalogue = self.catalogue;
        let neighbours: &[Neighbour] = catalogue.neighbours(self.site.molecule)?;
        let donor: Site = self.site;
        let donor_bandgap: f64 = self.system.bandgap(donor.molecule)?;
        let donor_energy: f64 =
            donor_bandgap + self.disorder.site_energy_shift(donor, donor_bandgap, &mut self.rng);

        self.rates.clear();
        for neighbour in neighbours.iter() {
            let acceptor: Site = Site::new(
                neighbour.molecule,
                add_cells(&donor.cell, &neighbour.cell_offset),
            );
            let acceptor_bandgap: f64 = self.system.bandgap(acceptor.molecule)?;
            let acceptor_energy: f64 = acceptor_bandgap
                + self
                    .disorder
                    .site_energy_shift(acceptor, acceptor_bandgap, &mut self.rng);
            let coupling: f64 =
                self.disorder
                    .coupling(donor, acceptor, neighbour.entry.coupling, &mut self.rng)?;
            self.rates
                .push(neighbour.entry.rate_constant(coupling, acceptor_energy - donor_energy));
        }
        self.site_energy = donor_energy;
        Ok(self.rates.iter().sum())
    }
}

/// Exponentially distributed waiting time in s for the total rate `total_rate` (1/s).
pub fn waiting_time<R: Rng>(total_rate: f64, rng: &mut R) -> f64 {
    // ln(0) is not a valid draw
    let mut u: f64 = rng.gen();
    while u == 0.0 {
        u = rng.gen();
    }
    -u.ln() / total_rate
}

/// Index of the hop chosen with probability `rates[i] / total_rate` for a
/// uniform number `u` in [0, 1). Zero rates are never chosen.
pub fn select_transition(rates: &[f64], total_rate: f64, u: f64) -> Option<usize> {
    let target: f64 = u * total_rate;
    let mut cumulative: f64 = 0.0;
    let mut last_allowed: Option<usize> = None;
    for (idx, rate) in rates.iter().enumerate() {
        if *rate <= 0.0 {
            continue;
        }
        cumulative += rate;
        last_allowed = Some(idx);
        if target < cumulative {
            return Some(idx);
        }
    }
    // rounding can leave the cumulative sum just below the target
    last_allowed
}

/// Stepwise diffusion tensor dr dr^T / (2 tau) of one hop in cm^2/s, ordered
/// xx, yy, zz, xy, xz, yz. `displacement` is in Angstrom and `tau` in ps.
pub fn hop_tensor(displacement: &[f64; 3], tau: f64) -> Result<[f64; 6]> {
    let [x, y, z] = *displacement;
    let scale: f64 = ANGS2_PER_PS_TO_CM2_PER_S / (2.0 * tau);
    let tensor: [f64; 6] = [
        x * x * scale,
        y * y * scale,
        z * z * scale,
        x * y * scale,
        x * z * scale,
        y * z * scale,
    ];
    if tensor.iter().any(|component| !component.is_finite()) {
        return Err(EkmcError::Arithmetic(format!(
            "diffusion tensor of the hop {:?} over {} ps is not finite",
            displacement, tau
        )));
    }
    Ok(tensor)
}
