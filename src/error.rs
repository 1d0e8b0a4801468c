use crate::initialization::CellPoint;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EkmcError>;

/// Every fatal condition of the catalogue builder, the KMC engine and the
/// post-processor. None of them is retried inside the library.
#[derive(thiserror::Error, Debug)]
pub enum EkmcError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write configuration file: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("failed to parse setup data: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse setup data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no EET coupling given for dimer ({molecule1}, {molecule2}) in cell {cell:?}")]
    MissingCoupling {
        molecule1: usize,
        molecule2: usize,
        cell: CellPoint,
    },

    #[error("missing datum: {0}")]
    MissingDatum(String),

    #[error("inconsistent input data: {0}")]
    Inconsistent(String),

    #[error("no outgoing rate from molecule {molecule} in cell {cell:?}")]
    NoOutgoingRate { molecule: usize, cell: CellPoint },

    #[error("arithmetic failure: {0}")]
    Arithmetic(String),

    #[error("invalid dimer: {0}")]
    InvalidDimer(String),

    #[error("malformed trajectory record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("scratch directory {0:?} already exists")]
    ScratchDirectoryExists(PathBuf),

    #[error("diagonalisation of the diffusion tensor failed: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error("statistics error: {0}")]
    Statistics(String),
}
