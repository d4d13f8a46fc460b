use serde::{Deserialize, Serialize};

use crate::quantity::{
    cost::Cost,
    rate::{CubicMeterRate, KilowattHourRate},
};

#[derive(
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
#[from(forward)]
pub struct OfferId(pub String);

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
pub enum ContractKind {
    #[display("fixed")]
    Fixed,

    /// Dynamic contract: market price plus the supplier's markup.
    #[display("variable")]
    Variable,

    /// Individually negotiated contract, priced like a fixed one.
    #[display("custom")]
    Custom,
}

/// Supplier contract offer as listed in the catalogue.
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct ContractOffer {
    #[builder(into)]
    pub id: OfferId,

    #[builder(into)]
    pub supplier: String,

    #[builder(into)]
    pub name: String,

    pub kind: ContractKind,

    #[serde(default)]
    #[builder(default)]
    pub recommended: bool,

    /// Customer rating, usually 0 to 5.
    #[serde(default)]
    #[builder(default)]
    pub rating: f64,

    #[serde(default = "default_active")]
    #[builder(default = true)]
    pub active: bool,

    /// Display order within the catalogue.
    #[serde(default)]
    #[builder(default)]
    pub order: u32,

    /// Tariff details, which may be missing for incomplete catalogue entries.
    pub terms: Option<ContractTerms>,
}

const fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractTerms {
    /// Terms of fixed-rate and custom contracts.
    Fixed(FixedTerms),

    Variable(VariableTerms),
}

/// Monthly standing charges («vaste leveringskosten»).
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonthlyFees {
    pub electricity: Cost,
    pub gas: Cost,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FixedTerms {
    #[serde(default)]
    pub electricity_single: Option<KilowattHourRate>,

    #[serde(default)]
    pub electricity_normal: Option<KilowattHourRate>,

    #[serde(default)]
    pub electricity_off_peak: Option<KilowattHourRate>,

    #[serde(default)]
    pub gas: Option<CubicMeterRate>,

    /// Feed-in costs («terugleverkosten») charged on the full feed-in volume.
    #[serde(default)]
    pub feed_in: Option<KilowattHourRate>,

    pub fixed_fees: MonthlyFees,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariableTerms {
    /// Surcharge on top of the market electricity price.
    pub electricity_markup: KilowattHourRate,

    #[serde(default)]
    pub gas_markup: CubicMeterRate,

    /// Deducted from the market price when valuing surplus feed-in.
    #[serde(default)]
    pub feed_in_markup: KilowattHourRate,

    pub fixed_fees: MonthlyFees,
}
