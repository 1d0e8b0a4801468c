use crate::error::{EkmcError, Result};
use crate::initialization::{Disorder, Site};
use hashbrown::HashMap;
use rand::Rng;
use rand_distr::StandardNormal;

/// Unordered pair of sites, stored with the lower site first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimerKey {
    pub low: Site,
    pub high: Site,
}

/// Orders the two endpoints of a dimer so that both hop directions share one key.
pub fn canonical_dimer_key(a: Site, b: Site) -> Result<DimerKey> {
    if a == b {
        return Err(EkmcError::InvalidDimer(format!(
            "molecule {} in cell {:?} cannot form a dimer with itself",
            a.molecule, a.cell
        )));
    }
    if a < b {
        Ok(DimerKey { low: a, high: b })
    } else {
        Ok(DimerKey { low: b, high: a })
    }
}

/// Lazily sampled site energy and coupling disorder of one walker.
///
/// A site or dimer receives exactly one Gaussian sample the first time it is
/// looked up; later look-ups return the stored value. Different walkers own
/// different caches, so the disorder is a property of the run, not of the crystal.
/// Without disorder nothing is stored.
pub struct DisorderCache {
    energetic_disorder: Disorder,
    coupling_disorder: Disorder,
    site_energies: HashMap<Site, f64>,
    couplings: HashMap<DimerKey, f64>,
}

impl DisorderCache {
    pub fn new(energetic_disorder: Disorder, coupling_disorder: Disorder) -> Self {
        DisorderCache {
            energetic_disorder,
            coupling_disorder,
            site_energies: HashMap::new(),
            couplings: HashMap::new(),
        }
    }

    /// Energy shift (eV) of `site` relative to its bandgap.
    pub fn site_energy_shift<R: Rng>(&mut self, site: Site, bandgap: f64, rng: &mut R) -> f64 {
        if self.energetic_disorder.is_zero() {
            return 0.0;
        }
        let sigma: f64 = self.energetic_disorder.sigma(bandgap);
        *self
            .site_energies
            .entry(site)
            .or_insert_with(|| sample_gaussian(0.0, sigma, rng))
    }

    /// Coupling (eV) of the dimer formed by `a` and `b` whose bare value is `bare_coupling`.
    pub fn coupling<R: Rng>(
        &mut self,
        a: Site,
        b: Site,
        bare_coupling: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let key: DimerKey = canonical_dimer_key(a, b)?;
        if self.coupling_disorder.is_zero() {
            return Ok(bare_coupling);
        }
        let sigma: f64 = self.coupling_disorder.sigma(bare_coupling);
        Ok(*self
            .couplings
            .entry(key)
            .or_insert_with(|| sample_gaussian(bare_coupling, sigma, rng)))
    }

    pub fn n_sites(&self) -> usize {
        self.site_energies.len()
    }

    pub fn n_dimers(&self) -> usize {
        self.couplings.len()
    }
}

fn sample_gaussian<R: Rng>(mean: f64, sigma: f64, rng: &mut R) -> f64 {
    if sigma == 0.0 {
        return mean;
    }
    let z: f64 = rng.sample(StandardNormal);
    mean + sigma * z
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn canonical_key_ignores_direction() {
        let a: Site = Site::new(1, [0, 0, 0]);
        let b: Site = Site::new(0, [1, 0, 0]);
        assert_eq!(
            canonical_dimer_key(a, b).unwrap(),
            canonical_dimer_key(b, a).unwrap()
        );
        assert_eq!(canonical_dimer_key(a, b).unwrap().low, b);
        assert!(canonical_dimer_key(a, a).is_err());
        // same molecule in different cells is a valid dimer
        assert!(canonical_dimer_key(Site::new(0, [0, 0, 0]), Site::new(0, [0, 0, 1])).is_ok());
    }

    #[test]
    fn lookups_are_idempotent() {
        let mut rng: StdRng = StdRng::seed_from_u64(7);
        let mut cache: DisorderCache =
            DisorderCache::new(Disorder::Absolute(0.05), Disorder::Percent(20.0));
        let a: Site = Site::new(0, [0, 0, 0]);
        let b: Site = Site::new(0, [1, 0, 0]);
        let energy: f64 = cache.site_energy_shift(a, 2.0, &mut rng);
        let coupling: f64 = cache.coupling(a, b, 0.01, &mut rng).unwrap();
        for _ in 0..10 {
            assert_eq!(cache.site_energy_shift(a, 2.0, &mut rng), energy);
            assert_eq!(cache.coupling(b, a, 0.01, &mut rng).unwrap(), coupling);
        }
        assert_eq!(cache.n_sites(), 1);
        assert_eq!(cache.n_dimers(), 1);
        assert_ne!(coupling, 0.01);
    }

    #[test]
    fn zero_disorder_returns_bare_values() {
        let mut rng: StdRng = StdRng::seed_from_u64(1);
        let mut cache: DisorderCache =
            DisorderCache::new(Disorder::Absolute(0.0), Disorder::Absolute(0.0));
        let a: Site = Site::new(0, [0, 0, 0]);
        let b: Site = Site::new(1, [0, 0, 0]);
        assert_eq!(cache.site_energy_shift(a, 2.0, &mut rng), 0.0);
        assert_eq!(cache.coupling(a, b, -0.004, &mut rng).unwrap(), -0.004);
        assert_eq!(cache.n_sites(), 0);
        assert_eq!(cache.n_dimers(), 0);
        assert!(cache.coupling(a, a, -0.004, &mut rng).is_err());

        // a zero percentage is no disorder either
        let mut cache: DisorderCache =
            DisorderCache::new(Disorder::Percent(0.0), Disorder::Absolute(0.01));
        assert_eq!(cache.site_energy_shift(a, 2.0, &mut rng), 0.0);
        assert_ne!(cache.coupling(a, b, -0.004, &mut rng).unwrap(), -0.004);
        assert_eq!(cache.n_sites(), 0);
        assert_eq!(cache.n_dimers(), 1);
    }

    #[test]
    fn samples_have_the_requested_width() {
        let mut rng: StdRng = StdRng::seed_from_u64(11);
        let mut cache: DisorderCache =
            DisorderCache::new(Disorder::Percent(2.0), Disorder::Absolute(0.0));
        let n: i32 = 20000;
        let samples: Vec<f64> = (0..n)
            .map(|i| cache.site_energy_shift(Site::new(0, [i, 0, 0]), 2.5, &mut rng))
            .collect();
        let mean: f64 = samples.iter().sum::<f64>() / n as f64;
        let variance: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        // 2 % of 2.5 eV
        assert!((variance.sqrt() - 0.05).abs() < 0.002);
        assert!(mean.abs() < 0.002);
    }
}
