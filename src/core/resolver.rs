//! Reference tariffs shared by every offer of a quote.

use serde::Serialize;

use crate::{
    error::EngineError,
    model::{
        capacity::{Commodity, ConnectionCapacity},
        grid::{GridOperator, Postcode},
        tax::GovernmentTaxTariff,
    },
    prelude::*,
    quantity::cost::Cost,
    store::ReferenceData,
};

/// Fallback grid fees for small-consumer capacities missing from the fee table.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct GridFeeDefaults {
    pub electricity: Option<Cost>,
    pub gas: Option<Cost>,
}

impl Default for GridFeeDefaults {
    fn default() -> Self {
        Self { electricity: Some(Cost::from(430.0)), gas: Some(Cost::from(245.0)) }
    }
}

impl GridFeeDefaults {
    /// No defaults: a missing fee is an error.
    pub const STRICT: Self = Self { electricity: None, gas: None };

    const fn get(&self, commodity: Commodity) -> Option<Cost> {
        match commodity {
            Commodity::Electricity => self.electricity,
            Commodity::Gas => self.gas,
        }
    }
}

/// Reference tariffs of one connection address.
#[derive(Clone, Debug, Serialize)]
pub struct TariffBundle {
    pub year: i32,
    pub postcode: Postcode,
    pub grid_operator: GridOperator,
    pub electricity_capacity: ConnectionCapacity,

    /// Gas capacity, absent without a gas connection.
    pub gas_capacity: Option<ConnectionCapacity>,

    #[serde(skip)]
    pub tax: GovernmentTaxTariff,

    pub electricity_grid_fee: Cost,

    /// Gas grid fee, zero without a gas connection.
    pub gas_grid_fee: Cost,
}

impl TariffBundle {
    /// The tax rebate and regulated grid fees only apply to small consumers.
    #[must_use]
    pub const fn is_small_consumer(&self) -> bool {
        self.electricity_capacity.is_small_consumer
    }
}

pub struct Resolver<'a> {
    store: &'a dyn ReferenceData,
    defaults: GridFeeDefaults,
}

impl<'a> Resolver<'a> {
    pub const fn new(store: &'a dyn ReferenceData, defaults: GridFeeDefaults) -> Self {
        Self { store, defaults }
    }

    #[instrument(skip_all, fields(postcode = %postcode, year = year))]
    pub async fn resolve(
        &self,
        postcode: &Postcode,
        electricity_capacity: &str,
        gas_capacity: Option<&str>,
        year: i32,
    ) -> Result<TariffBundle, EngineError> {
        let (grid_operator, tax, electricity_capacity, gas_capacity) = tokio::try_join!(
            self.grid_operator(postcode),
            self.tax_tariff(year),
            self.capacity(Commodity::Electricity, electricity_capacity),
            async {
                match gas_capacity {
                    Some(code) => self.capacity(Commodity::Gas, code).await.map(Some),
                    None => Ok(None),
                }
            },
        )?;
        let (electricity_grid_fee, gas_grid_fee) = tokio::try_join!(
            self.grid_fee(&grid_operator, year, Commodity::Electricity, &electricity_capacity),
            async {
                match &gas_capacity {
                    Some(capacity) => {
                        self.grid_fee(&grid_operator, year, Commodity::Gas, capacity).await
                    }
                    None => Ok(Cost::ZERO),
                }
            },
        )?;
        info!(
            grid_operator = %grid_operator.name,
            electricity_grid_fee = %electricity_grid_fee,
            gas_grid_fee = %gas_grid_fee,
            "resolved",
        );
        Ok(TariffBundle {
            year,
            postcode: postcode.clone(),
            grid_operator,
            electricity_capacity,
            gas_capacity,
            tax,
            electricity_grid_fee,
            gas_grid_fee,
        })
    }

    async fn grid_operator(&self, postcode: &Postcode) -> Result<GridOperator, EngineError> {
        self.store
            .grid_operator_for(postcode)
            .await?
            .ok_or_else(|| EngineError::PostcodeNotMapped(postcode.clone()))
    }

    async fn tax_tariff(&self, year: i32) -> Result<GovernmentTaxTariff, EngineError> {
        self.store.tax_tariff(year).await?.ok_or(EngineError::TaxTariffNotFound(year))
    }

    async fn capacity(
        &self,
        commodity: Commodity,
        code: &str,
    ) -> Result<ConnectionCapacity, EngineError> {
        self.store.capacity(commodity, code).await?.ok_or_else(|| {
            EngineError::UnsupportedCapacity { commodity, code: code.to_string() }
        })
    }

    async fn grid_fee(
        &self,
        operator: &GridOperator,
        year: i32,
        commodity: Commodity,
        capacity: &ConnectionCapacity,
    ) -> Result<Cost, EngineError> {
        if !capacity.is_small_consumer {
            return Ok(Cost::ZERO);
        }
        if let Some(fee) = self.store.grid_fee(operator.id, year, commodity, capacity.id).await? {
            return Ok(fee);
        }
        let fee = self.defaults.get(commodity).ok_or_else(|| EngineError::GridFeeNotFound {
            operator: operator.id,
            year,
            commodity,
            capacity: capacity.code.clone(),
        })?;
        warn!(%commodity, capacity = %capacity.code, %fee, "grid fee is missing, using the default");
        Ok(fee)
    }
}
