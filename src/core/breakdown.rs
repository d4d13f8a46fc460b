//! Auditable cost breakdown of a single offer.

use serde::Serialize;

use crate::{
    core::{aggregator::AveragePrice, netting::Netting, tax::TaxBreakdown},
    model::offer::{ContractKind, ContractOffer, OfferId},
    quantity::{
        cost::Cost,
        energy::KilowattHours,
        percentage::Percentage,
        rate::{CubicMeterRate, KilowattHourRate},
        volume::CubicMeters,
    },
};

/// Quantity charged at a rate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Charge<Q, R> {
    pub quantity: Q,
    pub rate: R,
    pub amount: Cost,
}

impl<Q: Copy + std::ops::Mul<R, Output = Cost>, R: Copy> Charge<Q, R> {
    pub fn new(quantity: Q, rate: R) -> Self {
        Self { quantity, rate, amount: quantity * rate }
    }
}

pub type ElectricityCharge = Charge<KilowattHours, KilowattHourRate>;
pub type GasCharge = Charge<CubicMeters, CubicMeterRate>;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "meter", rename_all = "snake_case")]
pub enum ElectricityCharges {
    Single { single: ElectricityCharge },
    Dual { normal: ElectricityCharge, off_peak: ElectricityCharge },
}

impl ElectricityCharges {
    pub fn total(&self) -> Cost {
        match self {
            Self::Single { single } => single.amount,
            Self::Dual { normal, off_peak } => normal.amount + off_peak.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixedSupplierCost {
    pub electricity: ElectricityCharges,
    pub gas: Option<GasCharge>,

    /// Feed-in costs on the full feed-in volume.
    pub feed_in_costs: Option<ElectricityCharge>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableSupplierCost {
    /// Market prices the rates are based upon.
    pub market: AveragePrice,

    pub electricity: ElectricityCharges,
    pub gas: Option<GasCharge>,

    /// Compensation for the surplus feed-in, subtracted from the supplier cost.
    pub surplus_compensation: Option<ElectricityCharge>,
}

/// Energy cost charged by the supplier, excluding the standing charges.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupplierBreakdown {
    Fixed(FixedSupplierCost),
    Variable(VariableSupplierCost),
}

impl SupplierBreakdown {
    pub fn total(&self) -> Cost {
        match self {
            Self::Fixed(cost) => {
                cost.electricity.total()
                    + cost.gas.map_or(Cost::ZERO, |gas| gas.amount)
                    + cost.feed_in_costs.map_or(Cost::ZERO, |feed_in| feed_in.amount)
            }
            Self::Variable(cost) => {
                cost.electricity.total() + cost.gas.map_or(Cost::ZERO, |gas| gas.amount)
                    - cost.surplus_compensation.map_or(Cost::ZERO, |surplus| surplus.amount)
            }
        }
    }

    /// Net effect of the feed-in terms: positive for costs, negative for compensation.
    pub fn feed_in(&self) -> Cost {
        match self {
            Self::Fixed(cost) => cost.feed_in_costs.map_or(Cost::ZERO, |feed_in| feed_in.amount),
            Self::Variable(cost) => {
                -cost.surplus_compensation.map_or(Cost::ZERO, |surplus| surplus.amount)
            }
        }
    }
}

/// Yearly amounts of a commodity pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct YearlyFees {
    pub electricity: Cost,
    pub gas: Cost,
}

impl YearlyFees {
    pub fn total(&self) -> Cost {
        self.electricity + self.gas
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub supplier: Cost,
    pub tax: Cost,
    pub grid_fees: Cost,
    pub fixed_fees: Cost,

    /// Feed-in terms, already included in the supplier cost.
    pub feed_in: Cost,

    pub pre_vat: Cost,
    pub vat_percentage: Percentage,
    pub vat: Cost,

    /// Yearly total including VAT.
    pub yearly: Cost,

    pub monthly: Cost,
}

impl Totals {
    pub fn new(
        supplier: &SupplierBreakdown,
        tax: &TaxBreakdown,
        grid_fees: YearlyFees,
        fixed_fees: YearlyFees,
        vat_percentage: Percentage,
    ) -> Self {
        let pre_vat = supplier.total() + tax.total() + grid_fees.total() + fixed_fees.total();
        let vat = pre_vat * vat_percentage.to_proportion();
        let yearly = pre_vat + vat;
        Self {
            supplier: supplier.total(),
            tax: tax.total(),
            grid_fees: grid_fees.total(),
            fixed_fees: fixed_fees.total(),
            feed_in: supplier.feed_in(),
            pre_vat,
            vat_percentage,
            vat,
            yearly,
            monthly: yearly.monthly(),
        }
    }

    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.pre_vat.is_finite() && self.vat.is_finite() && self.yearly.is_finite()
    }
}

/// Offer identity as shown next to its costs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OfferSummary {
    pub id: OfferId,
    pub supplier: String,
    pub name: String,
    pub kind: ContractKind,
    pub recommended: bool,
    pub rating: f64,
}

impl From<&ContractOffer> for OfferSummary {
    fn from(offer: &ContractOffer) -> Self {
        Self {
            id: offer.id.clone(),
            supplier: offer.supplier.clone(),
            name: offer.name.clone(),
            kind: offer.kind,
            recommended: offer.recommended,
            rating: offer.rating,
        }
    }
}

/// Yearly cost of an offer for a usage profile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub offer: OfferSummary,
    pub netting: Netting,
    pub supplier: SupplierBreakdown,
    pub tax: TaxBreakdown,
    pub grid_fees: YearlyFees,

    /// Standing charges, twelve times the monthly fees.
    pub fixed_fees: YearlyFees,

    pub totals: Totals,
}
