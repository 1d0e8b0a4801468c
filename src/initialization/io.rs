use crate::defaults::*;
use crate::error::{EkmcError, Result};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn default_verbose() -> i8 {
    VERBOSE
}
fn default_setup_data_path() -> String {
    String::from(SETUP_DATA_PATH)
}
fn default_short_range_coupling_model() -> CouplingModel {
    CouplingModel::from_str(SHORT_RANGE_COUPLING_MODEL).unwrap_or(CouplingModel::Eet)
}
fn default_long_range_coupling_model() -> CouplingModel {
    CouplingModel::from_str(LONG_RANGE_COUPLING_MODEL).unwrap_or(CouplingModel::Disabled)
}
fn default_short_range_cutoff() -> f64 {
    SHORT_RANGE_CUTOFF
}
fn default_long_range_cutoff() -> f64 {
    LONG_RANGE_CUTOFF
}
fn default_distance_method() -> DistanceMethod {
    DistanceMethod::from_str(DISTANCE_METHOD).unwrap_or(DistanceMethod::CentreOfMass)
}
fn default_kinetic_model() -> KineticModel {
    KineticModel::from_str(KINETIC_MODEL).unwrap_or(KineticModel::Marcus)
}
fn default_temperature() -> f64 {
    TEMPERATURE
}
fn default_relative_permittivity() -> f64 {
    RELATIVE_PERMITTIVITY
}
fn default_huang_rhys_factor() -> f64 {
    HUANG_RHYS_FACTOR
}
fn default_vibrational_energy() -> f64 {
    VIBRATIONAL_ENERGY
}
fn default_u_max() -> usize {
    U_MAX
}
fn default_v_max() -> usize {
    V_MAX
}
fn default_energetic_disorder() -> Disorder {
    Disorder::Absolute(ENERGETIC_DISORDER)
}
fn default_coupling_disorder() -> Disorder {
    Disorder::Absolute(COUPLING_DISORDER)
}
fn default_sim_time_limit() -> TimeLimit {
    TimeLimit::from(SIM_TIME_LIMIT)
}
fn default_max_no_of_steps() -> StepLimit {
    StepLimit::from(MAX_NO_OF_STEPS)
}
fn default_starting_molecule() -> StartingMolecule {
    StartingMolecule::try_from(RawStartingMolecule::Keyword(String::from(STARTING_MOLECULE)))
        .unwrap_or(StartingMolecule::Any)
}
fn default_write_rate_constants() -> bool {
    WRITE_RATE_CONSTANTS
}
fn default_write_first_rate_constants_only() -> bool {
    WRITE_FIRST_RATE_CONSTANTS_ONLY
}
fn default_number_of_simulations() -> usize {
    NUMBER_OF_SIMULATIONS
}
fn default_number_of_cpus() -> usize {
    NUMBER_OF_CPUS
}
fn default_no_of_times_to_sample() -> usize {
    NO_OF_TIMES_TO_SAMPLE
}
fn default_time_average_start() -> f64 {
    TIME_AVERAGE_START
}
fn default_time_average_end() -> f64 {
    TIME_AVERAGE_END
}
fn default_postprocessing_folder() -> String {
    String::from(POSTPROCESSING_FOLDER)
}
fn default_confidence_level() -> f64 {
    CONFIDENCE_LEVEL
}
fn default_constant_rate_data() -> ConstantRateData {
    ConstantRateData {
        temperature: default_temperature(),
        relative_permittivity: default_relative_permittivity(),
        huang_rhys_factor: default_huang_rhys_factor(),
        vibrational_energy: default_vibrational_energy(),
        u_max: default_u_max(),
        v_max: default_v_max(),
    }
}
fn default_postprocessing() -> PostProcessingConfiguration {
    PostProcessingConfiguration {
        no_of_times_to_sample: default_no_of_times_to_sample(),
        time_average_start: default_time_average_start(),
        time_average_end: default_time_average_end(),
        output_folder: default_postprocessing_folder(),
        confidence_level: default_confidence_level(),
    }
}

/// Model used to obtain the bare coupling of a dimer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum CouplingModel {
    /// precomputed excitation energy transfer couplings from the setup data
    Eet,
    /// Coulomb sum over atomic transition charges
    Atc,
    Disabled,
}

impl FromStr for CouplingModel {
    type Err = EkmcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EET" | "eet" => Ok(CouplingModel::Eet),
            "ATC" | "atc" => Ok(CouplingModel::Atc),
            "None" | "none" => Ok(CouplingModel::Disabled),
            other => Err(EkmcError::Configuration(format!(
                "unknown coupling model '{}', expected 'EET', 'ATC' or 'None'",
                other
            ))),
        }
    }
}

impl fmt::Display for CouplingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            CouplingModel::Eet => "EET",
            CouplingModel::Atc => "ATC",
            CouplingModel::Disabled => "None",
        };
        write!(f, "{}", name)
    }
}

impl TryFrom<String> for CouplingModel {
    type Error = EkmcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CouplingModel> for String {
    fn from(model: CouplingModel) -> Self {
        model.to_string()
    }
}

/// How the separation of two molecules is measured against the cutoffs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceMethod {
    CentreOfMass,
    /// centroid of the non-hydrogen atoms
    CentreOfMolecule,
    /// shortest distance between two non-hydrogen atoms
    NearestAtoms,
}

impl FromStr for DistanceMethod {
    type Err = EkmcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "centre_of_mass" => Ok(DistanceMethod::CentreOfMass),
            "centre_of_molecule" => Ok(DistanceMethod::CentreOfMolecule),
            "nearest_atoms_method" => Ok(DistanceMethod::NearestAtoms),
            other => Err(EkmcError::Configuration(format!(
                "unknown distance method '{}', expected 'centre_of_mass', \
                 'centre_of_molecule' or 'nearest_atoms_method'",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            DistanceMethod::CentreOfMass => "centre_of_mass",
            DistanceMethod::CentreOfMolecule => "centre_of_molecule",
            DistanceMethod::NearestAtoms => "nearest_atoms_method",
        };
        write!(f, "{}", name)
    }
}

impl TryFrom<String> for DistanceMethod {
    type Error = EkmcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DistanceMethod> for String {
    fn from(method: DistanceMethod) -> Self {
        method.to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum KineticModel {
    Marcus,
    /// Marcus-Levich-Jortner
    Mlj,
}

impl FromStr for KineticModel {
    type Err = EkmcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "marcus" => Ok(KineticModel::Marcus),
            "mlj" => Ok(KineticModel::Mlj),
            _ => Err(EkmcError::Configuration(format!(
                "unknown kinetic model '{}', expected 'marcus' or 'mlj'",
                s
            ))),
        }
    }
}

impl fmt::Display for KineticModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KineticModel::Marcus => write!(f, "marcus"),
            KineticModel::Mlj => write!(f, "mlj"),
        }
    }
}

impl TryFrom<String> for KineticModel {
    type Error = EkmcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<KineticModel> for String {
    fn from(model: KineticModel) -> Self {
        model.to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum RawDisorder {
    Value(f64),
    Text(String),
}

/// Width of a Gaussian disorder, either in eV or relative to a reference value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "RawDisorder", into = "RawDisorder")]
pub enum Disorder {
    Absolute(f64),
    Percent(f64),
}

impl Disorder {
    /// Standard deviation in eV for a quantity whose undisordered value is `reference`.
    pub fn sigma(&self, reference: f64) -> f64 {
        match *self {
            Disorder::Absolute(sigma) => sigma,
            Disorder::Percent(percent) => reference.abs() * percent / 100.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Disorder::Absolute(sigma) => sigma == 0.0,
            Disorder::Percent(percent) => percent == 0.0,
        }
    }
}

impl TryFrom<RawDisorder> for Disorder {
    type Error = EkmcError;

    fn try_from(raw: RawDisorder) -> Result<Self> {
        let disorder: Disorder = match raw {
            RawDisorder::Value(sigma) => Disorder::Absolute(sigma),
            RawDisorder::Text(text) => {
                let text: &str = text.trim();
                match text.strip_suffix('%') {
                    Some(percent) => Disorder::Percent(percent.trim().parse().map_err(|_| {
                        EkmcError::Configuration(format!("invalid disorder percentage '{}'", text))
                    })?),
                    None => Disorder::Absolute(text.parse().map_err(|_| {
                        EkmcError::Configuration(format!("invalid disorder value '{}'", text))
                    })?),
                }
            }
        };
        let value: f64 = match disorder {
            Disorder::Absolute(value) | Disorder::Percent(value) => value,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(EkmcError::Configuration(format!(
                "disorder must be a finite, non-negative number, got {}",
                value
            )));
        }
        Ok(disorder)
    }
}

impl From<Disorder> for RawDisorder {
    fn from(disorder: Disorder) -> Self {
        match disorder {
            Disorder::Absolute(sigma) => RawDisorder::Value(sigma),
            Disorder::Percent(percent) => RawDisorder::Text(format!("{}%", percent)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum RawTimeLimit {
    Value(f64),
    Text(String),
}

/// Simulated time limit in ps. `None` disables the bound.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "RawTimeLimit", into = "RawTimeLimit")]
pub struct TimeLimit(pub Option<f64>);

impl From<f64> for TimeLimit {
    fn from(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 {
            TimeLimit(Some(value))
        } else {
            TimeLimit(None)
        }
    }
}

impl TryFrom<RawTimeLimit> for TimeLimit {
    type Error = EkmcError;

    fn try_from(raw: RawTimeLimit) -> Result<Self> {
        match raw {
            RawTimeLimit::Value(value) if value.is_nan() => Err(EkmcError::Configuration(
                String::from("the simulation time limit must not be NaN"),
            )),
            RawTimeLimit::Value(value) => Ok(TimeLimit::from(value)),
            RawTimeLimit::Text(text) => match text.trim().to_lowercase().as_str() {
                "inf" | "infinity" | "none" => Ok(TimeLimit(None)),
                other => other.parse::<f64>().map(TimeLimit::from).map_err(|_| {
                    EkmcError::Configuration(format!("invalid simulation time limit '{}'", text))
                }),
            },
        }
    }
}

impl From<TimeLimit> for RawTimeLimit {
    fn from(limit: TimeLimit) -> Self {
        match limit.0 {
            Some(value) => RawTimeLimit::Value(value),
            None => RawTimeLimit::Text(String::from("inf")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum RawStepLimit {
    Value(i64),
    Text(String),
}

/// Maximal number of KMC steps. `None` disables the bound.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "RawStepLimit", into = "RawStepLimit")]
pub struct StepLimit(pub Option<u64>);

impl From<i64> for StepLimit {
    fn from(value: i64) -> Self {
        if value < 0 {
            StepLimit(None)
        } else {
            StepLimit(Some(value as u64))
        }
    }
}

impl TryFrom<RawStepLimit> for StepLimit {
    type Error = EkmcError;

    fn try_from(raw: RawStepLimit) -> Result<Self> {
        match raw {
            RawStepLimit::Value(value) => Ok(StepLimit::from(value)),
            RawStepLimit::Text(text) => match text.trim().to_lowercase().as_str() {
                "inf" | "infinity" | "none" => Ok(StepLimit(None)),
                other => other.parse::<i64>().map(StepLimit::from).map_err(|_| {
                    EkmcError::Configuration(format!("invalid maximal number of steps '{}'", text))
                }),
            },
        }
    }
}

impl From<StepLimit> for RawStepLimit {
    fn from(limit: StepLimit) -> Self {
        match limit.0 {
            Some(value) => RawStepLimit::Value(value as i64),
            None => RawStepLimit::Value(-1),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum RawStartingMolecule {
    Name(i64),
    Names(Vec<i64>),
    Keyword(String),
}

/// Policy that picks the molecule the exciton starts on.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "RawStartingMolecule", into = "RawStartingMolecule")]
pub enum StartingMolecule {
    /// any molecule of the unit cell, uniformly
    Any,
    /// a molecule with the lowest bandgap, ties broken uniformly
    Lowest,
    Name(usize),
    /// uniformly among the given names
    Choice(Vec<usize>),
}

fn molecule_name_from(value: i64) -> Result<usize> {
    if value < 0 {
        return Err(EkmcError::Configuration(format!(
            "molecule names are non-negative integers, got {}",
            value
        )));
    }
    Ok(value as usize)
}

impl TryFrom<RawStartingMolecule> for StartingMolecule {
    type Error = EkmcError;

    fn try_from(raw: RawStartingMolecule) -> Result<Self> {
        match raw {
            RawStartingMolecule::Name(name) => Ok(StartingMolecule::Name(molecule_name_from(name)?)),
            RawStartingMolecule::Names(names) => {
                if names.is_empty() {
                    return Err(EkmcError::Configuration(String::from(
                        "the list of starting molecules is empty",
                    )));
                }
                let names: Vec<usize> = names
                    .into_iter()
                    .map(molecule_name_from)
                    .collect::<Result<Vec<usize>>>()?;
                Ok(StartingMolecule::Choice(names))
            }
            RawStartingMolecule::Keyword(keyword) => match keyword.trim() {
                "any" => Ok(StartingMolecule::Any),
                "lowest" => Ok(StartingMolecule::Lowest),
                other => other
                    .parse::<usize>()
                    .map(StartingMolecule::Name)
                    .map_err(|_| {
                        EkmcError::Configuration(format!(
                            "invalid starting molecule '{}', expected 'any', 'lowest', \
                             a molecule name or a list of names",
                            other
                        ))
                    }),
            },
        }
    }
}

impl From<StartingMolecule> for RawStartingMolecule {
    fn from(policy: StartingMolecule) -> Self {
        match policy {
            StartingMolecule::Any => RawStartingMolecule::Keyword(String::from("any")),
            StartingMolecule::Lowest => RawStartingMolecule::Keyword(String::from("lowest")),
            StartingMolecule::Name(name) => RawStartingMolecule::Name(name as i64),
            StartingMolecule::Choice(names) => {
                RawStartingMolecule::Names(names.into_iter().map(|name| name as i64).collect())
            }
        }
    }
}

/// Scalar parameters of the rate law.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConstantRateData {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_relative_permittivity")]
    pub relative_permittivity: f64,
    #[serde(default = "default_huang_rhys_factor")]
    pub huang_rhys_factor: f64,
    #[serde(default = "default_vibrational_energy")]
    pub vibrational_energy: f64,
    #[serde(default = "default_u_max")]
    pub u_max: usize,
    #[serde(default = "default_v_max")]
    pub v_max: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostProcessingConfiguration {
    #[serde(default = "default_no_of_times_to_sample")]
    pub no_of_times_to_sample: usize,
    #[serde(default = "default_time_average_start")]
    pub time_average_start: f64,
    #[serde(default = "default_time_average_end")]
    pub time_average_end: f64,
    #[serde(default = "default_postprocessing_folder")]
    pub output_folder: String,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EkmcConfiguration {
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_setup_data_path")]
    pub setup_data_path: String,
    #[serde(default = "default_short_range_coupling_model")]
    pub short_range_coupling_model: CouplingModel,
    #[serde(default = "default_long_range_coupling_model")]
    pub long_range_coupling_model: CouplingModel,
    #[serde(default = "default_short_range_cutoff")]
    pub short_range_cutoff: f64,
    #[serde(default = "default_long_range_cutoff")]
    pub long_range_cutoff: f64,
    #[serde(default = "default_distance_method")]
    pub distance_method: DistanceMethod,
    #[serde(default = "default_kinetic_model")]
    pub kinetic_model: KineticModel,
    #[serde(default = "default_energetic_disorder")]
    pub energetic_disorder: Disorder,
    #[serde(default = "default_coupling_disorder")]
    pub coupling_disorder: Disorder,
    #[serde(default = "default_sim_time_limit")]
    pub sim_time_limit: TimeLimit,
    #[serde(default = "default_max_no_of_steps")]
    pub max_no_of_steps: StepLimit,
    #[serde(default = "default_starting_molecule")]
    pub starting_molecule: StartingMolecule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_folder_path: Option<String>,
    #[serde(default = "default_write_rate_constants")]
    pub write_rate_constants_to_file: bool,
    #[serde(default = "default_write_first_rate_constants_only")]
    pub write_first_500_rate_constants_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_number_of_simulations")]
    pub number_of_simulations: usize,
    #[serde(default = "default_number_of_cpus")]
    pub number_of_cpus: usize,
    /// memory request of the whole ensemble, e.g. "16G"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<String>,
    /// memory request per worker thread, excludes `mem`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_per_cpu: Option<String>,
    // tables have to follow the plain values in TOML
    #[serde(default = "default_constant_rate_data")]
    pub constant_rate_data: ConstantRateData,
    #[serde(default = "default_postprocessing")]
    pub postprocessing: PostProcessingConfiguration,
}

impl Default for EkmcConfiguration {
    fn default() -> Self {
        EkmcConfiguration {
            verbose: default_verbose(),
            setup_data_path: default_setup_data_path(),
            short_range_coupling_model: default_short_range_coupling_model(),
            long_range_coupling_model: default_long_range_coupling_model(),
            short_range_cutoff: default_short_range_cutoff(),
            long_range_cutoff: default_long_range_cutoff(),
            distance_method: default_distance_method(),
            kinetic_model: default_kinetic_model(),
            energetic_disorder: default_energetic_disorder(),
            coupling_disorder: default_coupling_disorder(),
            sim_time_limit: default_sim_time_limit(),
            max_no_of_steps: default_max_no_of_steps(),
            starting_molecule: default_starting_molecule(),
            temp_folder_path: None,
            write_rate_constants_to_file: default_write_rate_constants(),
            write_first_500_rate_constants_only: default_write_first_rate_constants_only(),
            seed: None,
            number_of_simulations: default_number_of_simulations(),
            number_of_cpus: default_number_of_cpus(),
            mem: None,
            mem_per_cpu: None,
            constant_rate_data: default_constant_rate_data(),
            postprocessing: default_postprocessing(),
        }
    }
}

impl EkmcConfiguration {
    /// Reads the settings from `config_file_path`. If the file does not exist
    /// the default settings are used and written there.
    pub fn from_path(config_file_path: &Path) -> Result<Self> {
        let config_string: String = if config_file_path.exists() {
            fs::read_to_string(config_file_path)?
        } else {
            String::from("")
        };
        // load the configration settings
        let config: Self = Self::from_toml(&config_string)?;
        // save the configuration file if it does not exist already so that the user can see
        // all the used options
        if !config_file_path.exists() {
            fs::write(config_file_path, toml::to_string(&config)?)?;
        }
        Ok(config)
    }

    pub fn from_toml(config_string: &str) -> Result<Self> {
        let config: Self = toml::from_str(config_string)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that cannot describe a valid simulation.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();
        if !(self.short_range_cutoff > 0.0) || !(self.long_range_cutoff > 0.0) {
            errors.push(String::from("cutoff radii must be positive"));
        }
        if self.short_range_cutoff > self.long_range_cutoff {
            errors.push(format!(
                "short range cutoff ({} A) exceeds long range cutoff ({} A)",
                self.short_range_cutoff, self.long_range_cutoff
            ));
        }
        if self.long_range_coupling_model == CouplingModel::Eet {
            errors.push(String::from(
                "EET couplings can only be used as the short range coupling model",
            ));
        }
        let rate_data: &ConstantRateData = &self.constant_rate_data;
        if !(rate_data.temperature > 0.0) {
            errors.push(format!(
                "temperature must be positive, got {} K",
                rate_data.temperature
            ));
        }
        if !(rate_data.relative_permittivity > 0.0) {
            errors.push(format!(
                "relative permittivity must be positive, got {}",
                rate_data.relative_permittivity
            ));
        }
        if self.kinetic_model == KineticModel::Mlj {
            if !(rate_data.vibrational_energy > 0.0) {
                errors.push(String::from(
                    "the MLJ vibrational energy must be positive",
                ));
            }
            if !(rate_data.huang_rhys_factor >= 0.0) {
                errors.push(String::from("the Huang-Rhys factor must not be negative"));
            }
        }
        if self.mem.is_some() && self.mem_per_cpu.is_some() {
            errors.push(String::from("set either mem or mem_per_cpu, not both"));
        }
        if self.number_of_simulations == 0 {
            errors.push(String::from("number_of_simulations must be at least 1"));
        }
        let post: &PostProcessingConfiguration = &self.postprocessing;
        if post.no_of_times_to_sample == 0 {
            errors.push(String::from("no_of_times_to_sample must be at least 1"));
        }
        if !(post.confidence_level > 0.0 && post.confidence_level < 1.0) {
            errors.push(format!(
                "confidence level must lie in (0, 1), got {}",
                post.confidence_level
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EkmcError::Configuration(errors.join("; ")))
        }
    }

    /// Temperature times the Boltzmann constant, in eV.
    pub fn thermal_energy(&self) -> f64 {
        crate::constants::K_BOLTZMANN * self.constant_rate_data.temperature
    }
}
