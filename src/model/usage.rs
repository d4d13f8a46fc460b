use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    model::capacity::{estimate_electricity_capacity, estimate_gas_capacity},
    quantity::{energy::KilowattHours, volume::CubicMeters},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum MeterType {
    #[display("single")]
    Single,

    /// Two-rate meter with separate normal and off-peak («dal») registers.
    #[display("dual")]
    Dual,
}

/// Yearly consumption of one connection.
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct UsageProfile {
    pub normal: KilowattHours,

    /// Off-peak consumption, only known for dual meters.
    pub off_peak: Option<KilowattHours>,

    /// Gas consumption, absent without a gas connection.
    pub gas: Option<CubicMeters>,

    /// Solar feed-in («teruglevering»).
    pub feed_in: Option<KilowattHours>,

    #[serde(default)]
    #[builder(default)]
    pub has_dual_meter: bool,

    #[builder(into)]
    pub electricity_capacity: Option<String>,

    #[builder(into)]
    pub gas_capacity: Option<String>,
}

impl UsageProfile {
    #[must_use]
    pub const fn meter(&self) -> MeterType {
        if self.has_dual_meter || self.off_peak.is_some() { MeterType::Dual } else { MeterType::Single }
    }

    #[must_use]
    pub fn off_peak(&self) -> KilowattHours {
        self.off_peak.unwrap_or_default()
    }

    /// Total electricity consumption before netting.
    #[must_use]
    pub fn consumption(&self) -> KilowattHours {
        self.normal + self.off_peak()
    }

    #[must_use]
    pub fn gas(&self) -> CubicMeters {
        self.gas.unwrap_or_default()
    }

    #[must_use]
    pub fn consumes_gas(&self) -> bool {
        self.gas().is_positive()
    }

    #[must_use]
    pub fn feed_in(&self) -> KilowattHours {
        self.feed_in.unwrap_or_default()
    }

    /// Electricity capacity code, estimated from the consumption when not specified.
    #[must_use]
    pub fn electricity_capacity(&self) -> &str {
        self.electricity_capacity
            .as_deref()
            .unwrap_or_else(|| estimate_electricity_capacity(self.consumption()))
    }

    /// Gas capacity code, estimated from the consumption when not specified.
    #[must_use]
    pub fn gas_capacity(&self) -> &str {
        self.gas_capacity.as_deref().unwrap_or_else(|| estimate_gas_capacity(self.gas))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let check = |field: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidProfile(format!("{field} must be a non-negative number, got {value}")))
            }
        };
        check("normal consumption", self.normal.0)?;
        check("off-peak consumption", self.off_peak().0)?;
        check("gas consumption", self.gas().0)?;
        check("feed-in", self.feed_in().0)?;
        Ok(())
    }
}
