pub use summary::*;
pub use write_data::*;

pub mod summary;
pub mod write_data;
