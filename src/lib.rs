pub mod constants;
pub mod defaults;
pub mod dynamics;
pub mod error;
pub mod initialization;
pub mod neighbours;
pub mod output;
pub mod postprocessing;
pub mod rates;

pub use error::{EkmcError, Result};
