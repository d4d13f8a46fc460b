//! Market prices for variable contracts: provider fallback, persistence, and the rolling average.

use std::sync::Arc;

use chrono::{Days, Local, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    api::provider::{DailyPrices, MarketPriceProvider, mean},
    error::{EngineError, ProviderFailure},
    model::price::DynamicPriceRecord,
    prelude::*,
    quantity::rate::{CubicMeterRate, KilowattHourRate},
    store::PriceTable,
};

/// Estimates used where the market data has gaps.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct PricePolicy {
    /// Gas price used when a provider has no gas prices.
    #[builder(default = CubicMeterRate::from(0.80))]
    pub gas_estimate: CubicMeterRate,

    /// Night price as a fraction of the day price, when there is no day/night split.
    #[builder(default = 0.8)]
    pub night_factor: f64,

    /// Number of trailing days in the rolling average.
    #[builder(default = 30)]
    pub window_days: u64,

    /// Day-over-day changes within this band are reported as stable.
    #[builder(default = 0.001)]
    pub trend_dead_band: f64,
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Averaged market price, excluding VAT and markups.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct AveragePrice {
    pub electricity_day: KilowattHourRate,
    pub electricity_night: KilowattHourRate,

    /// Single-rate price, the mean of the day and night prices.
    pub electricity_single: KilowattHourRate,

    pub gas: CubicMeterRate,
    pub basis: PriceBasis,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceBasis {
    #[display("{n_days}-day average")]
    RollingAverage { n_days: usize },

    #[display("latest record of {date}")]
    LatestRecord { date: NaiveDate },

    #[display("fresh prices of {date}")]
    FreshFetch { date: NaiveDate },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    #[display("↑")]
    Up,

    #[display("↓")]
    Down,

    #[display("=")]
    Stable,
}

impl Trend {
    fn between(previous: f64, current: f64, dead_band: f64) -> Self {
        let difference = current - previous;
        if difference > dead_band {
            Self::Up
        } else if difference < -dead_band {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

/// Current market prices at a glance.
#[derive(Clone, Debug, Serialize)]
pub struct PriceSnapshot {
    /// Record of today, or tomorrow's day-ahead record when today's is not there yet.
    pub current: Option<DynamicPriceRecord>,

    pub yesterday: Option<DynamicPriceRecord>,
    pub electricity_trend: Trend,
    pub gas_trend: Trend,
    pub average: AveragePrice,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Days that already had a record.
    pub n_present: usize,

    pub n_fetched: usize,
    pub n_failed: usize,
}

pub struct PriceAggregator {
    /// Providers in the order of preference.
    providers: Vec<Box<dyn MarketPriceProvider>>,

    table: Arc<dyn PriceTable>,
    policy: PricePolicy,
}

impl PriceAggregator {
    pub fn new(
        providers: Vec<Box<dyn MarketPriceProvider>>,
        table: Arc<dyn PriceTable>,
        policy: PricePolicy,
    ) -> Self {
        Self { providers, table, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &PricePolicy {
        &self.policy
    }

    /// Fetch the prices of the day from the first provider that delivers.
    ///
    /// Nothing gets persisted.
    #[instrument(skip_all, fields(on = %on))]
    pub async fn fetch(&self, on: NaiveDate) -> Result<DynamicPriceRecord, EngineError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.fetch_day(on).await {
                Ok(prices) => {
                    info!(source = %prices.source, "fetched");
                    return Ok(self.to_record(on, &prices));
                }
                Err(error) => {
                    warn!(source = %provider.source(), "provider failed: {error:#}");
                    failures.push(ProviderFailure {
                        provider: provider.source(),
                        reason: format!("{error:#}"),
                    });
                }
            }
        }
        Err(EngineError::UpstreamUnavailable { date: on, failures })
    }

    /// Fetch and persist the prices of the day.
    #[instrument(skip_all, fields(on = %on))]
    pub async fn refresh(&self, on: NaiveDate) -> Result<DynamicPriceRecord, EngineError> {
        let record = self.fetch(on).await?;
        self.table.upsert(record.clone()).await?;
        Ok(record)
    }

    /// Average price for variable contracts.
    ///
    /// Falls back to the most recent record when the trailing window is empty,
    /// and to fresh prices of today when there is no history at all.
    #[instrument(skip_all, fields(today = %today))]
    pub async fn average(&self, today: NaiveDate) -> Result<AveragePrice, EngineError> {
        let since = today
            .checked_sub_days(Days::new(self.policy.window_days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        let records = self.table.range(since..=today).await?;
        if let Some(average) = self.rolling_average(&records) {
            debug!(n_records = records.len(), single = ?average.electricity_single, "averaged");
            return Ok(average);
        }

        if let Some(record) = self.table.latest().await? {
            warn!(date = %record.date, "no prices in the window, using the latest record");
            return Ok(self.to_average(&record, PriceBasis::LatestRecord { date: record.date }));
        }

        warn!("no price history, fetching fresh prices");
        let record = self.refresh(today).await?;
        Ok(self.to_average(&record, PriceBasis::FreshFetch { date: record.date }))
    }

    /// Fetch and persist every missing day of the trailing window that ends on `until`.
    #[instrument(skip_all, fields(until = %until, n_days = n_days))]
    pub async fn backfill(&self, until: NaiveDate, n_days: u64) -> Result<BackfillReport, EngineError> {
        let mut report = BackfillReport::default();
        for offset in (0..n_days).rev() {
            let Some(date) = until.checked_sub_days(Days::new(offset)) else {
                continue;
            };
            if self.table.get(date).await?.is_some() {
                report.n_present += 1;
                continue;
            }
            match self.refresh(date).await {
                Ok(_) => {
                    report.n_fetched += 1;
                }
                Err(error @ EngineError::UpstreamUnavailable { .. }) => {
                    warn!(%date, "skipped: {error}");
                    report.n_failed += 1;
                }
                Err(error) => return Err(error),
            }
        }
        info!(
            n_present = report.n_present,
            n_fetched = report.n_fetched,
            n_failed = report.n_failed,
            "backfilled",
        );
        Ok(report)
    }

    /// Today's prices, compared to yesterday.
    #[instrument(skip_all, fields(today = %today))]
    pub async fn snapshot(&self, today: NaiveDate) -> Result<PriceSnapshot, EngineError> {
        let current = match self.table.get(today).await? {
            Some(record) => Some(record),
            None => match today.checked_add_days(Days::new(1)) {
                Some(tomorrow) => self.table.get(tomorrow).await?,
                None => None,
            },
        };
        let yesterday = match today.checked_sub_days(Days::new(1)) {
            Some(date) => self.table.get(date).await?,
            None => None,
        };
        let dead_band = self.policy.trend_dead_band;
        let (electricity_trend, gas_trend) = match (&current, &yesterday) {
            (Some(current), Some(yesterday)) => (
                Trend::between(yesterday.electricity_day.0, current.electricity_day.0, dead_band),
                Trend::between(yesterday.gas_average.0, current.gas_average.0, dead_band),
            ),
            _ => (Trend::Stable, Trend::Stable),
        };
        let average = self.average(today).await?;
        Ok(PriceSnapshot { current, yesterday, electricity_trend, gas_trend, average })
    }

    fn to_record(&self, on: NaiveDate, prices: &DailyPrices) -> DynamicPriceRecord {
        let electricity = &prices.electricity;
        let gas = prices.gas;
        DynamicPriceRecord {
            date: on,
            electricity_day: electricity.day.unwrap_or(electricity.overall.average),
            electricity_night: Some(
                electricity
                    .night
                    .unwrap_or(electricity.overall.average * self.policy.night_factor),
            ),
            electricity_min: Some(electricity.overall.min),
            electricity_max: Some(electricity.overall.max),
            gas_average: gas.map_or(self.policy.gas_estimate, |gas| gas.average),
            gas_min: Some(gas.map_or(self.policy.gas_estimate, |gas| gas.min)),
            gas_max: Some(gas.map_or(self.policy.gas_estimate, |gas| gas.max)),
            source: prices.source,
            updated_at: Utc::now(),
            is_forecast: on > Local::now().date_naive(),
        }
    }

    fn night_of(&self, record: &DynamicPriceRecord) -> KilowattHourRate {
        record.electricity_night.unwrap_or(record.electricity_day * self.policy.night_factor)
    }

    fn to_average(&self, record: &DynamicPriceRecord, basis: PriceBasis) -> AveragePrice {
        let night = self.night_of(record);
        AveragePrice {
            electricity_day: record.electricity_day,
            electricity_night: night,
            electricity_single: (record.electricity_day + night) / 2.0,
            gas: record.gas_average,
            basis,
        }
    }

    fn rolling_average(&self, records: &[DynamicPriceRecord]) -> Option<AveragePrice> {
        let day = mean(&records.iter().map(|record| record.electricity_day.0).collect_vec())?;
        let night = mean(&records.iter().map(|record| self.night_of(record).0).collect_vec())?;
        let gas = mean(&records.iter().map(|record| record.gas_average.0).collect_vec())?;
        Some(AveragePrice {
            electricity_day: KilowattHourRate::from(day),
            electricity_night: KilowattHourRate::from(night),
            electricity_single: KilowattHourRate::from((day + night) / 2.0),
            gas: CubicMeterRate::from(gas),
            basis: PriceBasis::RollingAverage { n_days: records.len() },
        })
    }
}
