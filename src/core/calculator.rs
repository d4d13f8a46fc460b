//! Yearly cost of a single contract offer.

use crate::{
    core::{
        aggregator::AveragePrice,
        breakdown::{
            Charge,
            CostBreakdown,
            ElectricityCharges,
            FixedSupplierCost,
            OfferSummary,
            SupplierBreakdown,
            Totals,
            VariableSupplierCost,
            YearlyFees,
        },
        netting::Netting,
        resolver::TariffBundle,
        tax,
    },
    error::EngineError,
    model::{
        offer::{ContractKind, ContractOffer, ContractTerms, FixedTerms, MonthlyFees, VariableTerms},
        usage::{MeterType, UsageProfile},
    },
    prelude::*,
    quantity::{cost::Cost, rate::KilowattHourRate},
};

/// Calculate the yearly cost of the offer.
///
/// Variable offers need the market prices, fixed and custom offers ignore them.
pub fn calculate(
    offer: &ContractOffer,
    profile: &UsageProfile,
    bundle: &TariffBundle,
    market: Option<&AveragePrice>,
) -> Result<CostBreakdown, EngineError> {
    let terms = offer.terms.as_ref().ok_or_else(|| EngineError::OfferDetailsMissing(offer.id.clone()))?;
    let netting = Netting::of(profile);

    let (supplier, monthly_fees) = match (offer.kind, terms) {
        (ContractKind::Fixed | ContractKind::Custom, ContractTerms::Fixed(terms)) => {
            (SupplierBreakdown::Fixed(fixed(offer, terms, profile, &netting)?), terms.fixed_fees)
        }
        (ContractKind::Variable, ContractTerms::Variable(terms)) => {
            let market = market.ok_or_else(|| EngineError::CalculationFailure {
                offer: offer.id.clone(),
                reason: "market prices are not available".to_string(),
            })?;
            (SupplierBreakdown::Variable(variable(terms, profile, &netting, market)), terms.fixed_fees)
        }
        (kind, _) => {
            return Err(EngineError::CalculationFailure {
                offer: offer.id.clone(),
                reason: format!("terms do not match the {kind} contract kind"),
            });
        }
    };

    let tax = tax::calculate(&bundle.tax, netting.total(), profile.gas(), bundle.is_small_consumer());
    let grid_fees = YearlyFees {
        electricity: bundle.electricity_grid_fee,
        gas: if profile.consumes_gas() { bundle.gas_grid_fee } else { Cost::ZERO },
    };
    let fixed_fees = yearly_fees(monthly_fees, profile);
    let totals = Totals::new(&supplier, &tax, grid_fees, fixed_fees, bundle.tax.vat);
    if !totals.is_finite() {
        return Err(EngineError::CalculationFailure {
            offer: offer.id.clone(),
            reason: format!("non-finite total: {:?}", totals.yearly),
        });
    }
    debug!(offer = %offer.id, yearly = %totals.yearly, monthly = %totals.monthly, "calculated");

    Ok(CostBreakdown {
        offer: OfferSummary::from(offer),
        netting,
        supplier,
        tax,
        grid_fees,
        fixed_fees,
        totals,
    })
}

fn fixed(
    offer: &ContractOffer,
    terms: &FixedTerms,
    profile: &UsageProfile,
    netting: &Netting,
) -> Result<FixedSupplierCost, EngineError> {
    let required = |rate: Option<KilowattHourRate>, tariff: &'static str| {
        rate.ok_or_else(|| EngineError::MissingTariff { offer: offer.id.clone(), tariff })
    };
    let electricity = match profile.meter() {
        MeterType::Single => ElectricityCharges::Single {
            single: Charge::new(netting.normal, required(terms.electricity_single, "single-rate")?),
        },
        MeterType::Dual => ElectricityCharges::Dual {
            normal: Charge::new(netting.normal, required(terms.electricity_normal, "normal-rate")?),
            off_peak: Charge::new(
                netting.off_peak,
                required(terms.electricity_off_peak, "off-peak")?,
            ),
        },
    };
    let gas = if profile.consumes_gas() {
        let rate = terms
            .gas
            .ok_or_else(|| EngineError::MissingTariff { offer: offer.id.clone(), tariff: "gas" })?;
        Some(Charge::new(profile.gas(), rate))
    } else {
        None
    };
    let feed_in_costs = terms
        .feed_in
        .filter(|_| profile.feed_in().is_positive())
        .map(|rate| Charge::new(profile.feed_in(), rate));
    Ok(FixedSupplierCost { electricity, gas, feed_in_costs })
}

fn variable(
    terms: &VariableTerms,
    profile: &UsageProfile,
    netting: &Netting,
    market: &AveragePrice,
) -> VariableSupplierCost {
    let markup = terms.electricity_markup;
    let electricity = match profile.meter() {
        MeterType::Single => ElectricityCharges::Single {
            single: Charge::new(netting.normal, market.electricity_single + markup),
        },
        MeterType::Dual => ElectricityCharges::Dual {
            normal: Charge::new(netting.normal, market.electricity_day + markup),
            off_peak: Charge::new(netting.off_peak, market.electricity_night + markup),
        },
    };
    let gas = profile.consumes_gas().then(|| Charge::new(profile.gas(), market.gas + terms.gas_markup));
    let surplus_compensation = netting.surplus.is_positive().then(|| {
        Charge::new(netting.surplus, market.electricity_single - terms.feed_in_markup)
    });
    VariableSupplierCost { market: *market, electricity, gas, surplus_compensation }
}

fn yearly_fees(monthly: MonthlyFees, profile: &UsageProfile) -> YearlyFees {
    YearlyFees {
        electricity: monthly.electricity * 12.0,
        gas: if profile.consumes_gas() { monthly.gas * 12.0 } else { Cost::ZERO },
    }
}

#[cfg(test)]
pub mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{aggregator::PriceBasis, tax::tests::tariff},
        model::{
            capacity::{CapacityId, ConnectionCapacity},
            grid::{GridOperator, GridOperatorId},
        },
        quantity::{energy::KilowattHours, rate::CubicMeterRate, volume::CubicMeters},
    };

    pub fn bundle(is_small_consumer: bool) -> TariffBundle {
        TariffBundle {
            year: 2025,
            postcode: "1012AB".parse().unwrap(),
            grid_operator: GridOperator { id: GridOperatorId(1), name: "Liander".into() },
            electricity_capacity: ConnectionCapacity {
                id: CapacityId(1),
                code: "3x25A".into(),
                is_small_consumer,
            },
            gas_capacity: Some(ConnectionCapacity {
                id: CapacityId(1),
                code: "G6".into(),
                is_small_consumer,
            }),
            tax: tariff(),
            electricity_grid_fee: Cost::from(400.0),
            gas_grid_fee: Cost::from(250.0),
        }
    }

    pub fn market() -> AveragePrice {
        AveragePrice {
            electricity_day: KilowattHourRate::from(0.10),
            electricity_night: KilowattHourRate::from(0.08),
            electricity_single: KilowattHourRate::from(0.09),
            gas: CubicMeterRate::from(0.60),
            basis: PriceBasis::RollingAverage { n_days: 30 },
        }
    }

    pub fn fixed_offer() -> ContractOffer {
        ContractOffer::builder()
            .id("fixed")
            .supplier("Vattenfall")
            .name("Vast 1 jaar")
            .kind(ContractKind::Fixed)
            .terms(ContractTerms::Fixed(FixedTerms {
                electricity_single: Some(KilowattHourRate::from(0.25)),
                electricity_normal: Some(KilowattHourRate::from(0.27)),
                electricity_off_peak: Some(KilowattHourRate::from(0.22)),
                gas: Some(CubicMeterRate::from(1.10)),
                feed_in: Some(KilowattHourRate::from(0.02)),
                fixed_fees: MonthlyFees { electricity: Cost::from(6.0), gas: Cost::from(6.0) },
            }))
            .build()
    }

    pub fn variable_offer() -> ContractOffer {
        ContractOffer::builder()
            .id("variable")
            .supplier("Tibber")
            .name("Dynamisch")
            .kind(ContractKind::Variable)
            .terms(ContractTerms::Variable(VariableTerms {
                electricity_markup: KilowattHourRate::from(0.02),
                gas_markup: CubicMeterRate::from(0.05),
                feed_in_markup: KilowattHourRate::from(0.01),
                fixed_fees: MonthlyFees { electricity: Cost::from(5.0), gas: Cost::from(5.0) },
            }))
            .build()
    }

    fn dual_profile() -> UsageProfile {
        UsageProfile::builder()
            .normal(KilowattHours::from(2_000.0))
            .off_peak(KilowattHours::from(1_000.0))
            .gas(CubicMeters::from(1_000.0))
            .build()
    }

    #[test]
    fn test_fixed_dual_meter() -> Result {
        let breakdown = calculate(&fixed_offer(), &dual_profile(), &bundle(true), None)?;
        assert_abs_diff_eq!(
            breakdown.totals.supplier.0,
            2_000.0 * 0.27 + 1_000.0 * 0.22 + 1_000.0 * 1.10,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(breakdown.totals.fixed_fees.0, 144.0, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.totals.grid_fees.0, 650.0, epsilon = 1e-9);
        assert_eq!(breakdown.totals.feed_in, Cost::ZERO);
        Ok(())
    }

    #[test]
    fn test_vat_inclusive_total() -> Result {
        let breakdown = calculate(&fixed_offer(), &dual_profile(), &bundle(true), None)?;
        let totals = breakdown.totals;
        assert_abs_diff_eq!(
            totals.pre_vat.0,
            (totals.supplier + totals.tax + totals.grid_fees + totals.fixed_fees).0,
            epsilon = 1e-9
        );
        assert_eq!(totals.yearly.round_to_cents(), (totals.pre_vat * 1.21).round_to_cents());
        assert_abs_diff_eq!(totals.monthly.0, totals.yearly.0 / 12.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fixed_single_meter_with_feed_in() -> Result {
        let profile = UsageProfile::builder()
            .normal(KilowattHours::from(3_000.0))
            .feed_in(KilowattHours::from(4_000.0))
            .build();
        let breakdown = calculate(&fixed_offer(), &profile, &bundle(true), None)?;
        assert_eq!(breakdown.netting.total(), KilowattHours::ZERO);
        assert_eq!(breakdown.netting.surplus, KilowattHours::from(1_000.0));
        // Fixed offers only charge feed-in costs, the surplus is not valued.
        assert_abs_diff_eq!(breakdown.totals.supplier.0, 4_000.0 * 0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.totals.feed_in.0, 80.0, epsilon = 1e-9);
        // No gas: neither the gas standing charge nor the gas grid fee.
        assert_abs_diff_eq!(breakdown.totals.fixed_fees.0, 72.0, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.totals.grid_fees.0, 400.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fixed_missing_tariff() {
        let mut offer = fixed_offer();
        if let Some(ContractTerms::Fixed(terms)) = &mut offer.terms {
            terms.electricity_off_peak = None;
        }
        let error = calculate(&offer, &dual_profile(), &bundle(true), None).unwrap_err();
        assert!(matches!(error, EngineError::MissingTariff { tariff: "off-peak", .. }));
        assert!(error.is_invalid_input());
    }

    #[test]
    fn test_fixed_missing_gas_tariff_without_gas() -> Result {
        let mut offer = fixed_offer();
        if let Some(ContractTerms::Fixed(terms)) = &mut offer.terms {
            terms.gas = None;
        }
        let profile = UsageProfile::builder().normal(KilowattHours::from(3_000.0)).build();
        assert!(calculate(&offer, &profile, &bundle(true), None).is_ok());
        assert!(calculate(&offer, &dual_profile(), &bundle(true), None).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_details() {
        let mut offer = fixed_offer();
        offer.terms = None;
        let error = calculate(&offer, &dual_profile(), &bundle(true), None).unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_variable_dual_meter() -> Result {
        let breakdown =
            calculate(&variable_offer(), &dual_profile(), &bundle(true), Some(&market()))?;
        assert!(matches!(breakdown.supplier, SupplierBreakdown::Variable(_)));
        assert_abs_diff_eq!(
            breakdown.totals.supplier.0,
            2_000.0 * 0.12 + 1_000.0 * 0.10 + 1_000.0 * 0.65,
            epsilon = 1e-9
        );
        Ok(())
    }

    #[test]
    fn test_variable_surplus_compensation() -> Result {
        let profile = UsageProfile::builder()
            .normal(KilowattHours::from(100.0))
            .off_peak(KilowattHours::from(2_000.0))
            .feed_in(KilowattHours::from(2_200.0))
            .build();
        let breakdown = calculate(&variable_offer(), &profile, &bundle(true), Some(&market()))?;
        assert_eq!(breakdown.netting.surplus, KilowattHours::from(100.0));
        assert_abs_diff_eq!(breakdown.totals.supplier.0, -100.0 * (0.09 - 0.01), epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.totals.feed_in.0, -8.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_variable_without_market() {
        let error = calculate(&variable_offer(), &dual_profile(), &bundle(true), None).unwrap_err();
        assert!(error.is_calculation_failure());
    }

    #[test]
    fn test_mismatching_terms() {
        let mut offer = fixed_offer();
        offer.kind = ContractKind::Variable;
        let error = calculate(&offer, &dual_profile(), &bundle(true), Some(&market())).unwrap_err();
        assert!(error.is_calculation_failure());
    }

    #[test]
    fn test_large_consumer_pays_rebate_difference() -> Result {
        let small = calculate(&fixed_offer(), &dual_profile(), &bundle(true), None)?;
        let large = calculate(&fixed_offer(), &dual_profile(), &bundle(false), None)?;
        assert_abs_diff_eq!((large.totals.tax - small.totals.tax).0, 524.95, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_non_finite() {
        let profile = UsageProfile::builder().normal(KilowattHours::from(f64::INFINITY)).build();
        let error = calculate(&fixed_offer(), &profile, &bundle(true), None).unwrap_err();
        assert!(error.is_calculation_failure());
    }
}
