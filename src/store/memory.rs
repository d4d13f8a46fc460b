use std::{collections::HashSet, fmt::Debug, fs, path::Path};

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        capacity::{CapacityId, Commodity, ConnectionCapacity},
        grid::{GridOperator, GridOperatorId, GridOperatorTariff, Postcode, PostcodeRange},
        offer::{ContractOffer, OfferId},
        tax::GovernmentTaxTariff,
    },
    prelude::*,
    quantity::cost::Cost,
    store::ReferenceData,
};

/// Reference data held in memory, loaded from a TOML document.
#[derive(Default, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Offer that serves as the savings baseline.
    #[serde(default)]
    pub reference_offer: Option<OfferId>,

    #[serde(default)]
    pub grid_operators: Vec<GridOperator>,

    #[serde(default)]
    pub postcode_ranges: Vec<PostcodeRange>,

    #[serde(default)]
    pub tax_tariffs: Vec<GovernmentTaxTariff>,

    #[serde(default)]
    pub capacities: Capacities,

    #[serde(default)]
    pub grid_fees: Vec<GridOperatorTariff>,

    #[serde(default)]
    pub offers: Vec<ContractOffer>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Capacities {
    #[serde(default)]
    pub electricity: Vec<ConnectionCapacity>,

    #[serde(default)]
    pub gas: Vec<ConnectionCapacity>,
}

impl MemoryStore {
    #[instrument(name = "reading the reference data…")]
    pub fn read_from<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let store: Self = toml::from_slice(
            &fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?,
        )
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
        store.validate()?;
        info!(
            n_tax_tariffs = store.tax_tariffs.len(),
            n_postcode_ranges = store.postcode_ranges.len(),
            n_offers = store.offers.len(),
            "loaded",
        );
        Ok(store)
    }

    /// Check the invariants the engine relies upon.
    pub fn validate(&self) -> Result {
        for tariff in &self.tax_tariffs {
            tariff
                .validate()
                .map_err(Error::msg)
                .with_context(|| format!("invalid tax tariff of {}", tariff.year))?;
        }
        if let Some(year) = self
            .tax_tariffs
            .iter()
            .filter(|tariff| tariff.active)
            .map(|tariff| tariff.year)
            .duplicates()
            .next()
        {
            bail!("more than one active tax tariff for {year}");
        }
        for (lhs, rhs) in self.postcode_ranges.iter().tuple_combinations() {
            ensure!(
                !lhs.overlaps(rhs),
                "postcode ranges {}-{} and {}-{} overlap",
                lhs.from,
                lhs.to,
                rhs.from,
                rhs.to,
            );
        }
        let mut offer_ids = HashSet::new();
        for offer in &self.offers {
            ensure!(offer_ids.insert(&offer.id), "duplicate offer `{}`", offer.id);
        }
        if let Some(reference) = &self.reference_offer {
            ensure!(offer_ids.contains(reference), "reference offer `{reference}` does not exist");
        }
        Ok(())
    }

    fn capacities(&self, commodity: Commodity) -> &[ConnectionCapacity] {
        match commodity {
            Commodity::Electricity => &self.capacities.electricity,
            Commodity::Gas => &self.capacities.gas,
        }
    }
}

impl std::str::FromStr for MemoryStore {
    type Err = Error;

    fn from_str(document: &str) -> Result<Self> {
        let store: Self = toml::from_str(document)?;
        store.validate()?;
        Ok(store)
    }
}

#[async_trait]
impl ReferenceData for MemoryStore {
    async fn grid_operator_for(&self, postcode: &Postcode) -> Result<Option<GridOperator>> {
        let Some(range) = self.postcode_ranges.iter().find(|range| range.contains(postcode)) else {
            return Ok(None);
        };
        let operator = self
            .grid_operators
            .iter()
            .find(|operator| operator.id == range.operator)
            .cloned()
            .with_context(|| format!("grid operator {} is not listed", range.operator))?;
        Ok(Some(operator))
    }

    async fn tax_tariff(&self, year: i32) -> Result<Option<GovernmentTaxTariff>> {
        Ok(self.tax_tariffs.iter().find(|tariff| tariff.active && tariff.year == year).cloned())
    }

    async fn capacity(
        &self,
        commodity: Commodity,
        code: &str,
    ) -> Result<Option<ConnectionCapacity>> {
        Ok(self
            .capacities(commodity)
            .iter()
            .find(|capacity| capacity.code.eq_ignore_ascii_case(code.trim()))
            .cloned())
    }

    async fn grid_fee(
        &self,
        operator: GridOperatorId,
        year: i32,
        commodity: Commodity,
        capacity: CapacityId,
    ) -> Result<Option<Cost>> {
        Ok(self
            .grid_fees
            .iter()
            .find(|fee| {
                fee.operator == operator
                    && fee.year == year
                    && fee.commodity == commodity
                    && fee.capacity == capacity
            })
            .map(|fee| fee.annual_fee))
    }

    async fn active_offers(&self) -> Result<Vec<ContractOffer>> {
        Ok(self
            .offers
            .iter()
            .filter(|offer| offer.active)
            .sorted_by_key(|offer| offer.order)
            .cloned()
            .collect())
    }

    async fn offer(&self, id: &OfferId) -> Result<Option<ContractOffer>> {
        Ok(self.offers.iter().find(|offer| &offer.id == id).cloned())
    }

    async fn reference_offer(&self) -> Result<Option<ContractOffer>> {
        match &self.reference_offer {
            Some(id) => self.offer(id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::model::offer::ContractKind;

    pub const SAMPLE: &str = include_str!("../../data/reference.toml");

    pub fn sample() -> Result<MemoryStore> {
        SAMPLE.parse()
    }

    #[tokio::test]
    async fn test_sample_lookups() -> Result {
        let store = sample()?;

        let operator = store.grid_operator_for(&"1012AB".parse()?).await?.context("no operator")?;
        assert_eq!(operator.name, "Liander");
        assert!(store.grid_operator_for(&"9999ZZ".parse()?).await?.is_none());

        assert!(store.tax_tariff(2025).await?.is_some());
        assert!(store.tax_tariff(1999).await?.is_none());

        let capacity =
            store.capacity(Commodity::Electricity, "3x25a").await?.context("no capacity")?;
        assert!(capacity.is_small_consumer);
        assert!(store.capacity(Commodity::Gas, "G2000").await?.is_none());

        let fee = store.grid_fee(operator.id, 2025, Commodity::Gas, CapacityId(1)).await?;
        assert!(fee.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_active_offers_ordered() -> Result {
        let offers = sample()?.active_offers().await?;
        assert!(!offers.is_empty());
        assert!(offers.iter().all(|offer| offer.active));
        assert!(offers.iter().tuple_windows().all(|(lhs, rhs)| lhs.order <= rhs.order));
        assert!(offers.iter().any(|offer| offer.kind == ContractKind::Variable));
        Ok(())
    }

    #[tokio::test]
    async fn test_reference_offer() -> Result {
        let reference = sample()?.reference_offer().await?;
        assert!(reference.is_some());
        Ok(())
    }

    #[test]
    fn test_reject_overlapping_ranges() {
        let document = r#"
            [[grid_operators]]
            id = 1
            name = "Liander"

            [[postcode_ranges]]
            from = "1000AA"
            to = "1999ZZ"
            operator = 1

            [[postcode_ranges]]
            from = "1500AA"
            to = "2999ZZ"
            operator = 1
        "#;
        assert!(document.parse::<MemoryStore>().is_err());
    }

    #[test]
    fn test_reject_duplicate_active_tariff() {
        let tariff = r"
            [[tax_tariffs]]
            year = 2025
            rebate = 524.95
            vat = 21.0
            electricity = { steps = [], top_rate = 0.1 }
            gas = { steps = [], top_rate = 0.5 }
        ";
        assert!(tariff.parse::<MemoryStore>().is_ok());
        assert!(format!("{tariff}\n{tariff}").parse::<MemoryStore>().is_err());
    }
}
