//! Tiered energy tax («energiebelasting»).

use std::ops::{Mul, Sub};

use serde::Serialize;

use crate::{
    model::tax::{Brackets, GovernmentTaxTariff},
    quantity::{
        cost::Cost,
        energy::KilowattHours,
        rate::{CubicMeterRate, KilowattHourRate},
        volume::CubicMeters,
    },
};

/// Tax levied within a single bracket.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct BracketCharge<Q, R> {
    /// Zero-based bracket index, the open-ended bracket being the last one.
    pub index: usize,
    pub quantity: Q,
    pub rate: R,
    pub amount: Cost,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub electricity: Vec<BracketCharge<KilowattHours, KilowattHourRate>>,
    pub gas: Vec<BracketCharge<CubicMeters, CubicMeterRate>>,

    /// Rebate subtracted from the total, zero for large consumers.
    pub rebate: Cost,
}

impl TaxBreakdown {
    pub fn electricity_total(&self) -> Cost {
        self.electricity.iter().map(|charge| charge.amount).sum()
    }

    pub fn gas_total(&self) -> Cost {
        self.gas.iter().map(|charge| charge.amount).sum()
    }

    /// Total tax, which is negative when the rebate exceeds the levies.
    pub fn total(&self) -> Cost {
        self.electricity_total() + self.gas_total() - self.rebate
    }
}

/// Calculate the yearly energy tax on the net consumption.
#[must_use]
pub fn calculate(
    tariff: &GovernmentTaxTariff,
    electricity: KilowattHours,
    gas: CubicMeters,
    is_small_consumer: bool,
) -> TaxBreakdown {
    TaxBreakdown {
        electricity: tiered(&tariff.electricity, electricity),
        gas: tiered(&tariff.gas, gas),
        rebate: if is_small_consumer { tariff.rebate } else { Cost::ZERO },
    }
}

/// Split the volume over the brackets, charging each part at its bracket rate.
pub fn tiered<Q, R>(brackets: &Brackets<Q, R>, volume: Q) -> Vec<BracketCharge<Q, R>>
where
    Q: Copy + Default + PartialOrd + Sub<Output = Q> + Mul<R, Output = Cost>,
    R: Copy,
{
    let mut charges = Vec::with_capacity(brackets.steps.len() + 1);
    let mut lower = Q::default();
    for (index, step) in brackets.steps.iter().enumerate() {
        if volume <= lower {
            return charges;
        }
        let upper = if volume < step.up_to { volume } else { step.up_to };
        let quantity = upper - lower;
        charges.push(BracketCharge { index, quantity, rate: step.rate, amount: quantity * step.rate });
        lower = step.up_to;
    }
    if volume > lower {
        let quantity = volume - lower;
        charges.push(BracketCharge {
            index: brackets.steps.len(),
            quantity,
            rate: brackets.top_rate,
            amount: quantity * brackets.top_rate,
        });
    }
    charges
}
