pub use marcus::*;
pub use mlj::*;

pub mod marcus;
pub mod mlj;

use crate::error::Result;
use crate::initialization::{ConstantRateData, KineticModel};
use std::sync::Arc;

/// Rate of a single hop once the disorder of both sites and of the dimer is known.
pub trait RateLaw {
    /// Hop rate in 1/s for a coupling `coupling` (eV) and the energy difference
    /// `delta_e` = E(acceptor) - E(donor) in eV.
    fn rate_constant(&self, coupling: f64, delta_e: f64) -> f64;
}

/// Disorder independent part of the rate law of one ordered dimer.
#[derive(Clone, Debug, PartialEq)]
pub enum RateConstants {
    Marcus(MarcusConstants),
    /// shared between all dimers with the same reorganisation energy
    Mlj(Arc<MljConstants>),
}

impl RateConstants {
    pub fn new(
        model: KineticModel,
        reorganisation_energy: f64,
        rate_data: &ConstantRateData,
    ) -> Result<Self> {
        match model {
            KineticModel::Marcus => Ok(RateConstants::Marcus(MarcusConstants::new(
                reorganisation_energy,
                rate_data.temperature,
            )?)),
            KineticModel::Mlj => Ok(RateConstants::Mlj(Arc::new(MljConstants::new(
                reorganisation_energy,
                rate_data.temperature,
                rate_data.huang_rhys_factor,
                rate_data.vibrational_energy,
                rate_data.u_max,
                rate_data.v_max,
            )?))),
        }
    }
}

impl RateLaw for RateConstants {
    fn rate_constant(&self, coupling: f64, delta_e: f64) -> f64 {
        match self {
            RateConstants::Marcus(constants) => constants.rate_constant(coupling, delta_e),
            RateConstants::Mlj(constants) => constants.rate_constant(coupling, delta_e),
        }
    }
}

/// Underflowing or non-finite rates do not take part in the selection.
pub(crate) fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}
