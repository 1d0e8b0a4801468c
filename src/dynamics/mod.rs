pub use disorder::*;
pub use ensemble::*;
pub use hopping_routines::*;
pub use simulation::*;

pub mod disorder;
pub mod ensemble;
pub mod hopping_routines;
pub mod simulation;
