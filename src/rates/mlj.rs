use super::{clamp_rate, RateLaw};
use crate::constants::{HBAR, K_BOLTZMANN};
use crate::error::{EkmcError, Result};
use itertools::iproduct;
use statrs::function::factorial::ln_factorial;
use std::f64::consts::PI;

/// Constants of one (u, v) vibrational channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MljTerm {
    pub u: usize,
    pub v: usize,
    /// Boltzmann population of the donor level times the squared Franck-Condon overlap
    pub n: f64,
    pub y: f64,
    pub z: f64,
}

/// Marcus-Levich-Jortner rate with one effective intramolecular mode
///
///   k = V^2 * M * sum_uv N_uv exp(-(dE^2 * X + dE * Y_uv + Z_uv))
///
/// where the classical reorganisation energy enters M and X as in the
/// Marcus rate and the vibrational quanta shift the driving force.
#[derive(Clone, Debug, PartialEq)]
pub struct MljConstants {
    pub m: f64,
    pub x: f64,
    pub terms: Vec<MljTerm>,
}

impl MljConstants {
    pub fn new(
        reorganisation_energy: f64,
        temperature: f64,
        huang_rhys_factor: f64,
        vibrational_energy: f64,
        u_max: usize,
        v_max: usize,
    ) -> Result<Self> {
        if !(reorganisation_energy > 0.0) || !(temperature > 0.0) {
            return Err(EkmcError::Arithmetic(format!(
                "MLJ constants need a positive reorganisation energy and temperature, \
                 got {} eV and {} K",
                reorganisation_energy, temperature
            )));
        }
        if !(huang_rhys_factor >= 0.0) || !(vibrational_energy > 0.0) {
            return Err(EkmcError::Arithmetic(format!(
                "invalid MLJ mode: Huang-Rhys factor {}, vibrational energy {} eV",
                huang_rhys_factor, vibrational_energy
            )));
        }
        let kbt: f64 = K_BOLTZMANN * temperature;
        let occupations: Vec<f64> = vibrational_occupations(u_max, vibrational_energy, temperature);

        let terms: Vec<MljTerm> = iproduct!(0..=u_max, 0..=v_max)
            .map(|(u, v)| {
                let shifted: f64 =
                    reorganisation_energy + (v as f64 - u as f64) * vibrational_energy;
                MljTerm {
                    u,
                    v,
                    n: occupations[u] * franck_condon_overlap(huang_rhys_factor, u, v).powi(2),
                    y: shifted / (2.0 * reorganisation_energy * kbt),
                    z: shifted * shifted / (4.0 * reorganisation_energy * kbt),
                }
            })
            .filter(|term| term.n > 0.0)
            .collect();

        Ok(MljConstants {
            m: (PI / (reorganisation_energy * kbt)).sqrt() / HBAR,
            x: 1.0 / (4.0 * reorganisation_energy * kbt),
            terms,
        })
    }
}

impl RateLaw for MljConstants {
    fn rate_constant(&self, coupling: f64, delta_e: f64) -> f64 {
        let quadratic: f64 = delta_e * delta_e * self.x;
        let sum: f64 = self
            .terms
            .iter()
            .map(|term| term.n * (-(quadratic + delta_e * term.y + term.z)).exp())
            .sum();
        clamp_rate(coupling * coupling * self.m * sum)
    }
}

/// Franck-Condon overlap <u|v> of two harmonic oscillators displaced by the
/// Huang-Rhys factor `huang_rhys_factor`:
///
///   e^(-S/2) sum_{u-i = v-j = k} (-1)^j S^((i+j)/2) sqrt(u! v!) / (k! i! j!)
pub fn franck_condon_overlap(huang_rhys_factor: f64, u: usize, v: usize) -> f64 {
    let sqrt_s: f64 = huang_rhys_factor.sqrt();
    let log_norm: f64 = 0.5 * (ln_factorial(u as u64) + ln_factorial(v as u64));
    let sum: f64 = (0..=u.min(v))
        .map(|k| {
            let i: usize = u - k;
            let j: usize = v - k;
            let sign: f64 = if j % 2 == 0 { 1.0 } else { -1.0 };
            let log_factorials: f64 =
                ln_factorial(k as u64) + ln_factorial(i as u64) + ln_factorial(j as u64);
            sign * sqrt_s.powi((i + j) as i32) * (log_norm - log_factorials).exp()
        })
        .sum();
    (-huang_rhys_factor / 2.0).exp() * sum
}

/// Boltzmann populations of the vibrational levels 0..=u_max of the donor,
/// normalised over the truncated ladder.
pub fn vibrational_occupations(u_max: usize, vibrational_energy: f64, temperature: f64) -> Vec<f64> {
    let kbt: f64 = K_BOLTZMANN * temperature;
    let weights: Vec<f64> = (0..=u_max)
        .map(|u| (-(u as f64) * vibrational_energy / kbt).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|weight| weight / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::MarcusConstants;
    use approx::assert_relative_eq;

    #[test]
    fn ground_state_overlap_is_poisson() {
        let s: f64 = 1.3;
        for v in 0..6 {
            let expected: f64 =
                (-s).exp() * s.powi(v as i32) / ln_factorial(v as u64).exp();
            assert_relative_eq!(
                franck_condon_overlap(s, 0, v).powi(2),
                expected,
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn overlaps_are_complete() {
        let s: f64 = 1.0;
        for u in 0..4 {
            let total: f64 = (0..60).map(|v| franck_condon_overlap(s, u, v).powi(2)).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn undisplaced_oscillators_are_orthonormal() {
        assert_relative_eq!(franck_condon_overlap(0.0, 2, 2), 1.0, epsilon = 1e-14);
        assert_eq!(franck_condon_overlap(0.0, 1, 2), 0.0);
    }

    #[test]
    fn occupations_are_normalised() {
        let occupations: Vec<f64> = vibrational_occupations(5, 0.17, 300.0);
        assert_relative_eq!(occupations.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(occupations.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn reduces_to_marcus_without_vibrational_channels() {
        let mlj: MljConstants = MljConstants::new(0.25, 300.0, 0.0, 0.15, 0, 0).unwrap();
        let marcus: MarcusConstants = MarcusConstants::new(0.25, 300.0).unwrap();
        for &delta_e in [-0.2, -0.05, 0.0, 0.1].iter() {
            assert_relative_eq!(
                mlj.rate_constant(0.004, delta_e),
                marcus.rate_constant(0.004, delta_e),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn vibrational_channels_speed_up_inverted_region() {
        let lambda: f64 = 0.1;
        let mlj: MljConstants = MljConstants::new(lambda, 300.0, 1.0, 0.17, 3, 6).unwrap();
        let marcus: MarcusConstants = MarcusConstants::new(lambda, 300.0).unwrap();
        // deep in the inverted region the vibronic channels dominate
        assert!(mlj.rate_constant(0.002, -0.6) > marcus.rate_constant(0.002, -0.6));
    }
}
