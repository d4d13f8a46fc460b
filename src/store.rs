//! Narrow query and command interfaces to the reference data store and the daily price table.

pub mod memory;
pub mod price_file;

use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    model::{
        capacity::{CapacityId, Commodity, ConnectionCapacity},
        grid::{GridOperator, GridOperatorId, Postcode},
        offer::{ContractOffer, OfferId},
        price::DynamicPriceRecord,
        tax::GovernmentTaxTariff,
    },
    prelude::*,
    quantity::cost::Cost,
};

#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Grid operator whose postcode range contains the postcode.
    async fn grid_operator_for(&self, postcode: &Postcode) -> Result<Option<GridOperator>>;

    /// Active government tax tariff of the year.
    async fn tax_tariff(&self, year: i32) -> Result<Option<GovernmentTaxTariff>>;

    async fn capacity(
        &self,
        commodity: Commodity,
        code: &str,
    ) -> Result<Option<ConnectionCapacity>>;

    async fn grid_fee(
        &self,
        operator: GridOperatorId,
        year: i32,
        commodity: Commodity,
        capacity: CapacityId,
    ) -> Result<Option<Cost>>;

    /// Active offers in display order.
    async fn active_offers(&self) -> Result<Vec<ContractOffer>>;

    async fn offer(&self, id: &OfferId) -> Result<Option<ContractOffer>>;

    /// Offer that serves as the savings baseline.
    async fn reference_offer(&self) -> Result<Option<ContractOffer>>;
}

/// Daily market price table, one row per date.
#[async_trait]
pub trait PriceTable: Send + Sync {
    /// Insert or replace the record of its date.
    async fn upsert(&self, record: DynamicPriceRecord) -> Result;

    async fn get(&self, date: NaiveDate) -> Result<Option<DynamicPriceRecord>>;

    /// Records within the date range, in ascending date order.
    async fn range(&self, dates: RangeInclusive<NaiveDate>) -> Result<Vec<DynamicPriceRecord>>;

    /// Record with the highest date.
    async fn latest(&self) -> Result<Option<DynamicPriceRecord>>;
}
