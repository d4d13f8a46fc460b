//! Records the engine reads from the reference data store, and the usage profile it is asked to price.

pub mod capacity;
pub mod grid;
pub mod offer;
pub mod price;
pub mod tax;
pub mod usage;
