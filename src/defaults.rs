// config file
pub const CONFIG_FILE_NAME: &str = "ekmc.toml";
// setup data file holding molecules, lattice and the energy tables
pub const SETUP_DATA_PATH: &str = "KMC_setup_data.yaml";
// trajectory log
pub const TRAJECTORY_FILE_NAME: &str = "kMC_sim.txt";
// rate constant log
pub const RATE_CONSTANTS_FILE_NAME: &str = "kMC_sim_rate_constants.txt";
// print level
pub const VERBOSE: i8 = 0;
// short range coupling model: "EET", "ATC" or "None"
pub const SHORT_RANGE_COUPLING_MODEL: &str = "EET";
// long range coupling model: "ATC" or "None"
pub const LONG_RANGE_COUPLING_MODEL: &str = "None";
// short range cutoff (Angstrom)
pub const SHORT_RANGE_CUTOFF: f64 = 10.0;
// long range cutoff (Angstrom)
pub const LONG_RANGE_CUTOFF: f64 = 10.0;
// distance between molecules: "centre_of_mass", "centre_of_molecule"
// or "nearest_atoms_method"
pub const DISTANCE_METHOD: &str = "centre_of_mass";
// rate law: "marcus" or "mlj"
pub const KINETIC_MODEL: &str = "marcus";
// temperature (K)
pub const TEMPERATURE: f64 = 300.0;
// relative permittivity used by the transition charge coupling
pub const RELATIVE_PERMITTIVITY: f64 = 1.0;
// Huang-Rhys factor of the effective MLJ mode
pub const HUANG_RHYS_FACTOR: f64 = 1.0;
// energy of the effective MLJ vibrational quantum (eV)
pub const VIBRATIONAL_ENERGY: f64 = 0.17;
// highest vibrational level of the donor
pub const U_MAX: usize = 5;
// highest vibrational level of the acceptor
pub const V_MAX: usize = 5;
// energetic disorder (eV)
pub const ENERGETIC_DISORDER: f64 = 0.0;
// coupling disorder (eV)
pub const COUPLING_DISORDER: f64 = 0.0;
// simulated time limit (ps), negative or infinite for no limit
pub const SIM_TIME_LIMIT: f64 = 1000.0;
// maximal number of KMC steps, -1 for no limit
pub const MAX_NO_OF_STEPS: i64 = -1;
// starting molecule: "any", "lowest", a molecule name or a list of names
pub const STARTING_MOLECULE: &str = "any";
// write the rate constants of every step
pub const WRITE_RATE_CONSTANTS: bool = false;
// only write the rate constants of the first steps
pub const WRITE_FIRST_RATE_CONSTANTS_ONLY: bool = false;
// number of steps written if only the first rate constants are requested
pub const FIRST_RATE_CONSTANTS: u64 = 500;
// number of independent walkers of an ensemble
pub const NUMBER_OF_SIMULATIONS: usize = 1;
// number of worker threads, 0 uses every core
pub const NUMBER_OF_CPUS: usize = 0;
// prefix of the folder of one ensemble member
pub const SIMULATION_FOLDER_PREFIX: &str = "Simulation_";
// number of intervals of the post-processing time grid
pub const NO_OF_TIMES_TO_SAMPLE: usize = 1000;
// start of the time averaging window (ps)
pub const TIME_AVERAGE_START: f64 = 0.0;
// end of the time averaging window (ps), negative for the end of the grid
pub const TIME_AVERAGE_END: f64 = -1.0;
// output folder of the post-processing
pub const POSTPROCESSING_FOLDER: &str = "EKMC_Results";
// confidence level of the time averaged summaries
pub const CONFIDENCE_LEVEL: f64 = 0.95;
