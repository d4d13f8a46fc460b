use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::quantity::rate::{CubicMeterRate, KilowattHourRate};

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum PriceSource {
    #[serde(rename = "ENERGYZERO")]
    #[display("EnergyZero")]
    EnergyZero,

    #[serde(rename = "ENTSOE")]
    #[display("ENTSO-E")]
    Entsoe,
}

/// Aggregated market prices of one day, excluding VAT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicPriceRecord {
    pub date: NaiveDate,

    /// Average day-time electricity price.
    pub electricity_day: KilowattHourRate,

    #[serde(default)]
    pub electricity_night: Option<KilowattHourRate>,

    #[serde(default)]
    pub electricity_min: Option<KilowattHourRate>,

    #[serde(default)]
    pub electricity_max: Option<KilowattHourRate>,

    pub gas_average: CubicMeterRate,

    #[serde(default)]
    pub gas_min: Option<CubicMeterRate>,

    #[serde(default)]
    pub gas_max: Option<CubicMeterRate>,

    pub source: PriceSource,
    pub updated_at: DateTime<Utc>,

    /// Day-ahead prices of a date that has not started yet.
    #[serde(default)]
    pub is_forecast: bool,
}
