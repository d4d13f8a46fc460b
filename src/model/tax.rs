use serde::{Deserialize, Serialize};

use crate::quantity::{
    cost::Cost,
    energy::KilowattHours,
    percentage::Percentage,
    rate::{CubicMeterRate, KilowattHourRate},
    volume::CubicMeters,
};

/// Bracket that applies up to the specified cumulative volume.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bracket<Q, R> {
    pub up_to: Q,
    pub rate: R,
}

/// Ascending tax brackets, the last one open-ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brackets<Q, R> {
    pub steps: Vec<Bracket<Q, R>>,
    pub top_rate: R,
}

impl<Q: Copy + PartialOrd + Default, R> Brackets<Q, R> {
    /// Check that the thresholds are positive and strictly ascending.
    pub fn validate(&self) -> Result<(), String> {
        let mut previous = Q::default();
        for (index, step) in self.steps.iter().enumerate() {
            if step.up_to <= previous {
                return Err(format!("bracket #{} does not go above the previous threshold", index + 1));
            }
            previous = step.up_to;
        }
        Ok(())
    }
}

/// Government tax tariff of one calendar year.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernmentTaxTariff {
    pub year: i32,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Energy tax on electricity, by default 2 900 / 10 000 / 50 000 / ∞.
    pub electricity: Brackets<KilowattHours, KilowattHourRate>,

    /// Energy tax on gas, by default 1 000 / ∞.
    pub gas: Brackets<CubicMeters, CubicMeterRate>,

    /// Yearly tax rebate («vermindering energiebelasting»), small consumers only.
    pub rebate: Cost,

    pub vat: Percentage,
}

const fn default_active() -> bool {
    true
}

impl GovernmentTaxTariff {
    pub fn validate(&self) -> Result<(), String> {
        self.electricity.validate().map_err(|error| format!("electricity: {error}"))?;
        self.gas.validate().map_err(|error| format!("gas: {error}"))?;
        Ok(())
    }
}
