use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};

use crate::{
    model::price::PriceSource,
    prelude::*,
    quantity::rate::{CubicMeterRate, KilowattHourRate},
};

/// Day-ahead market price source.
#[async_trait]
pub trait MarketPriceProvider: Send + Sync {
    fn source(&self) -> PriceSource;

    /// Fetch the prices of the specified day, excluding VAT and energy tax.
    async fn fetch_day(&self, on: NaiveDate) -> Result<DailyPrices>;
}

/// Prices of one day as reported by a single provider.
#[derive(Copy, Clone, Debug)]
pub struct DailyPrices {
    pub source: PriceSource,
    pub electricity: ElectricityPrices,

    /// Gas prices, when the provider has them.
    pub gas: Option<Summary<CubicMeterRate>>,
}

#[derive(Copy, Clone, Debug)]
pub struct ElectricityPrices {
    pub overall: Summary<KilowattHourRate>,

    /// Average over 06:00–23:00, when the provider reports hourly points.
    pub day: Option<KilowattHourRate>,

    /// Average over 23:00–06:00, when the provider reports hourly points.
    pub night: Option<KilowattHourRate>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Summary<R> {
    pub average: R,
    pub min: R,
    pub max: R,
}

impl<R: From<f64>> Summary<R> {
    /// Summarise the points, if any.
    pub fn of(points: &[f64]) -> Option<Self> {
        let (min, max) = match points.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let average = mean(points)?;
        Some(Self { average: R::from(average), min: R::from(min), max: R::from(max) })
    }
}

/// Mean of the points, if any.
#[expect(clippy::cast_precision_loss)]
pub fn mean(points: &[f64]) -> Option<f64> {
    (!points.is_empty()).then(|| points.iter().sum::<f64>() / points.len() as f64)
}
