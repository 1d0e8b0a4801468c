pub use catalogue::*;
pub use cells::*;
pub use coulomb::*;
pub use distance::*;

pub mod catalogue;
pub mod cells;
pub mod coulomb;
pub mod distance;
