use crate::dynamics::DisorderCache;
use crate::error::{EkmcError, Result};
use crate::initialization::{
    EkmcConfiguration, MoleculeName, Site, StartingMolecule, SystemData, ORIGIN_CELL,
};
use crate::neighbours::NeighbourCatalogue;
use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Life cycle of one KMC run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    FinishedTimeLimit,
    FinishedStepLimit,
    FailedNoOutgoingRate,
}

/// State of a single exciton walker together with everything it borrows
/// from the immutable crystal description.
pub struct Simulation<'a> {
    pub config: &'a EkmcConfiguration,
    pub system: &'a SystemData,
    pub catalogue: &'a NeighbourCatalogue,
    pub site: Site,
    /// simulated time in ps
    pub time: f64,
    pub step: u64,
    pub state: RunState,
    pub disorder: DisorderCache,
    pub rng: StdRng,
    /// rate constants (1/s) of the hops out of the current site
    pub rates: Vec<f64>,
    /// energy of the current site in eV
    pub site_energy: f64,
    pub time_limit: Option<f64>,
    pub step_limit: Option<u64>,
}

impl<'a> Simulation<'a> {
    /// New walker placed in the origin cell on a molecule chosen by the
    /// starting molecule policy.
    pub fn new(
        config: &'a EkmcConfiguration,
        system: &'a SystemData,
        catalogue: &'a NeighbourCatalogue,
        seed: u64,
    ) -> Result<Self> {
        let mut rng: StdRng = StdRng::seed_from_u64(seed);
        let molecule: MoleculeName =
            choose_starting_molecule(&config.starting_molecule, system, &mut rng)?;
        info!("exciton starts on molecule {}", molecule);
        Ok(Self::from_state(
            config,
            system,
            catalogue,
            Site::new(molecule, ORIGIN_CELL),
            0.0,
            0,
            rng,
        ))
    }

    /// Walker that continues from a previously reached state.
    pub fn from_state(
        config: &'a EkmcConfiguration,
        system: &'a SystemData,
        catalogue: &'a NeighbourCatalogue,
        site: Site,
        time: f64,
        step: u64,
        rng: StdRng,
    ) -> Self {
        debug!(
            "walker on molecule {} in cell {:?} at {} ps, step {}",
            site.molecule, site.cell, time, step
        );
        Simulation {
            config,
            system,
            catalogue,
            site,
            time,
            step,
            state: RunState::Idle,
            disorder: DisorderCache::new(config.energetic_disorder, config.coupling_disorder),
            rng,
            rates: Vec::new(),
            site_energy: 0.0,
            time_limit: config.sim_time_limit.0,
            step_limit: config.max_no_of_steps.0,
        }
    }
}

/// Picks the first molecule of a walk according to the configured policy.
pub fn choose_starting_molecule<R: Rng>(
    policy: &StartingMolecule,
    system: &SystemData,
    rng: &mut R,
) -> Result<MoleculeName> {
    let names: Vec<MoleculeName> = system.molecule_names();
    let candidates: Vec<MoleculeName> = match policy {
        StartingMolecule::Any => names,
        StartingMolecule::Lowest => {
            let mut lowest: Vec<MoleculeName> = Vec::new();
            let mut lowest_bandgap: f64 = f64::INFINITY;
            for name in names {
                let bandgap: f64 = system.bandgap(name)?;
                if bandgap < lowest_bandgap {
                    lowest_bandgap = bandgap;
                    lowest = vec![name];
                } else if bandgap == lowest_bandgap {
                    lowest.push(name);
                }
            }
            lowest
        }
        StartingMolecule::Name(name) => vec![*name],
        StartingMolecule::Choice(choice) => choice.clone(),
    };
    let unknown: Vec<&MoleculeName> = candidates
        .iter()
        .filter(|name| system.molecule(**name).is_err())
        .collect();
    if !unknown.is_empty() {
        return Err(EkmcError::Configuration(format!(
            "starting molecules {:?} are not in the crystal",
            unknown
        )));
    }
    candidates.choose(rng).copied().ok_or_else(|| {
        EkmcError::Configuration(String::from("no molecule to start the walk on"))
    })
}
