use super::{clamp_rate, RateLaw};
use crate::constants::{HBAR, K_BOLTZMANN};
use crate::error::{EkmcError, Result};
use std::f64::consts::PI;

/// Pre-factors of the Marcus rate
///
///   k = V^2 * M * exp(-(dE^2 * X + dE * Y + Z))
///
/// with M = sqrt(pi / (lambda kB T)) / hbar, X = 1 / (4 lambda kB T),
/// Y = 1 / (2 kB T) and Z = lambda / (4 kB T).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarcusConstants {
    pub m: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MarcusConstants {
    pub fn new(reorganisation_energy: f64, temperature: f64) -> Result<Self> {
        if !(reorganisation_energy > 0.0) || !(temperature > 0.0) {
            return Err(EkmcError::Arithmetic(format!(
                "Marcus constants need a positive reorganisation energy and temperature, \
                 got {} eV and {} K",
                reorganisation_energy, temperature
            )));
        }
        let kbt: f64 = K_BOLTZMANN * temperature;
        Ok(MarcusConstants {
            m: (PI / (reorganisation_energy * kbt)).sqrt() / HBAR,
            x: 1.0 / (4.0 * reorganisation_energy * kbt),
            y: 1.0 / (2.0 * kbt),
            z: reorganisation_energy / (4.0 * kbt),
        })
    }
}

impl RateLaw for MarcusConstants {
    fn rate_constant(&self, coupling: f64, delta_e: f64) -> f64 {
        let exponent: f64 = delta_e * delta_e * self.x + delta_e * self.y + self.z;
        clamp_rate(coupling * coupling * self.m * (-exponent).exp())
    }
}
