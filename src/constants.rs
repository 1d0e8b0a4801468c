use phf::phf_map;

// Boltzmann constant in eV/K
pub const K_BOLTZMANN: f64 = 8.617333262145e-5;
// reduced Planck constant in eV*s
pub const HBAR: f64 = 6.582119569e-16;
// Coulomb constant in eV*Angstrom/e^2
pub const COULOMB_CONSTANT: f64 = 14.3996454784878811182;

// seconds -> picoseconds
pub const S_TO_PS: f64 = 1.0e12;
// picoseconds -> femtoseconds
pub const PS_TO_FS: f64 = 1.0e3;
// rates in 1/s -> 1/ps
pub const PER_S_TO_PER_PS: f64 = 1.0e-12;
// diffusion coefficients: Angstrom^2/ps -> cm^2/s, (1e-8)^2 / 1e-12
pub const ANGS2_PER_PS_TO_CM2_PER_S: f64 = 1.0e-4;

// number of decimals kept for intermolecular distances
pub const DISTANCE_DECIMALS: i32 = 4;

// atomic masses in amu, keyed by element symbol
pub static ATOMIC_MASSES: phf::Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "D" => 2.014,
    "T" => 3.016,
    "He" => 4.002602,
    "Li" => 6.94,
    "Be" => 9.0121831,
    "B" => 10.81,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "F" => 18.998403163,
    "Ne" => 20.1797,
    "Na" => 22.98976928,
    "Mg" => 24.305,
    "Al" => 26.9815385,
    "Si" => 28.085,
    "P" => 30.973761998,
    "S" => 32.06,
    "Cl" => 35.45,
    "Ar" => 39.948,
    "K" => 39.0983,
    "Ca" => 40.078,
    "Ti" => 47.867,
    "Fe" => 55.845,
    "Co" => 58.933194,
    "Ni" => 58.6934,
    "Cu" => 63.546,
    "Zn" => 65.38,
    "Ga" => 69.723,
    "Ge" => 72.630,
    "As" => 74.921595,
    "Se" => 78.971,
    "Br" => 79.904,
    "Kr" => 83.798,
    "Ru" => 101.07,
    "Pd" => 106.42,
    "Ag" => 107.8682,
    "Sn" => 118.710,
    "Te" => 127.60,
    "I" => 126.90447,
    "Xe" => 131.293,
    "Ir" => 192.217,
    "Pt" => 195.084,
    "Au" => 196.966569,
};

// element symbols that are treated as hydrogen by the distance policies
pub const HYDROGEN_SYMBOLS: [&str; 3] = ["H", "D", "T"];
