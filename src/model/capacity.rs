use serde::{Deserialize, Serialize};

use crate::quantity::{energy::KilowattHours, volume::CubicMeters};

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Commodity {
    #[display("electricity")]
    Electricity,

    #[display("gas")]
    Gas,
}

/// Internal identifier of a connection capacity within its commodity catalogue.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct CapacityId(pub u32);

/// Connection capacity class, such as `3x25A` or `G6`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCapacity {
    pub id: CapacityId,
    pub code: String,

    /// Small-consumer («kleinverbruik») connections get the tax rebate and pay the regulated grid fee.
    pub is_small_consumer: bool,
}

/// Estimate the electricity connection capacity code from the yearly consumption.
#[must_use]
pub fn estimate_electricity_capacity(yearly: KilowattHours) -> &'static str {
    match yearly.0 {
        kwh if kwh <= 5_000.0 => "3x25A",
        kwh if kwh <= 15_000.0 => "3x35A",
        kwh if kwh <= 30_000.0 => "3x50A",
        kwh if kwh <= 50_000.0 => "3x63A",
        _ => "3x80A",
    }
}

/// Estimate the gas connection capacity code from the yearly consumption.
///
/// Households without gas still get the smallest household meter, so that a quote can be made.
#[must_use]
pub fn estimate_gas_capacity(yearly: Option<CubicMeters>) -> &'static str {
    match yearly.map(|volume| volume.0) {
        Some(m3) if m3 > 25_000.0 => "G25",
        Some(m3) if m3 > 10_000.0 => "G16",
        Some(m3) if m3 > 2_500.0 => "G10",
        _ => "G6",
    }
}
