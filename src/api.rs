pub mod client;
pub mod energy_zero;
pub mod entsoe;
pub mod provider;
