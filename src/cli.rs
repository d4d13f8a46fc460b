use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use reqwest::Url;
use tariefwijzer::{
    api::{energy_zero, entsoe, provider::MarketPriceProvider},
    core::{
        aggregator::{PriceAggregator, PricePolicy},
        engine::Engine,
        ranker::OfferFilter,
        resolver::GridFeeDefaults,
    },
    model::{grid::Postcode, usage::UsageProfile},
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, rate::CubicMeterRate, volume::CubicMeters},
    store::{memory::MemoryStore, price_file::PriceFile},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Quote one offer, or all active offers, for a usage profile.
    Quote(Box<QuoteArgs>),

    /// Rank the active offers for the reference basket.
    Rank(Box<RankArgs>),

    /// Show today's market prices, the trend, and the rolling average.
    Prices(Box<PricesArgs>),

    /// Fetch and store the market prices of one day.
    Refresh(Box<RefreshArgs>),

    /// Fetch the market prices of the days missing from the price table.
    Backfill(Box<BackfillArgs>),
}

#[derive(Parser)]
pub struct PriceArgs {
    /// Daily market price table.
    #[clap(long = "price-table", env = "PRICE_TABLE_PATH", default_value = "prices.toml")]
    pub table_path: PathBuf,

    #[clap(
        long = "energy-zero-base-url",
        env = "ENERGY_ZERO_BASE_URL",
        default_value = energy_zero::DEFAULT_BASE_URL,
    )]
    pub energy_zero_base_url: Url,

    /// ENTSO-E Transparency Platform security token, enables the fallback provider.
    #[clap(long = "entsoe-api-key", env = "ENTSOE_API_KEY")]
    pub entsoe_api_key: Option<String>,

    #[clap(long = "entsoe-base-url", env = "ENTSOE_BASE_URL", default_value = entsoe::DEFAULT_BASE_URL)]
    pub entsoe_base_url: Url,

    /// Gas price per m³ when the provider has none.
    #[clap(long = "gas-price-estimate", env = "GAS_PRICE_ESTIMATE", default_value = "0.80")]
    pub gas_estimate: CubicMeterRate,

    /// Night price as a fraction of the day price, when there is no day/night split.
    #[clap(long = "night-factor", env = "NIGHT_FACTOR", default_value = "0.8")]
    pub night_factor: f64,

    #[clap(long = "price-window-days", env = "PRICE_WINDOW_DAYS", default_value = "30")]
    pub window_days: u64,
}

impl PriceArgs {
    pub fn try_new_aggregator(&self) -> Result<PriceAggregator> {
        let mut providers: Vec<Box<dyn MarketPriceProvider>> =
            vec![Box::new(energy_zero::Api::try_new(self.energy_zero_base_url.clone())?)];
        match &self.entsoe_api_key {
            Some(api_key) => {
                providers.push(Box::new(entsoe::Api::try_new(
                    self.entsoe_base_url.clone(),
                    api_key.clone(),
                )?));
            }
            None => {
                warn!("ENTSO-E API key is not configured, the fallback provider is disabled");
            }
        }
        let policy = PricePolicy::builder()
            .gas_estimate(self.gas_estimate)
            .night_factor(self.night_factor)
            .window_days(self.window_days)
            .build();
        let table = PriceFile::open(&self.table_path)?;
        Ok(PriceAggregator::new(providers, Arc::new(table), policy))
    }
}

#[derive(Parser)]
pub struct EngineArgs {
    #[clap(
        long = "reference-data",
        env = "REFERENCE_DATA_PATH",
        default_value = "data/reference.toml"
    )]
    pub reference_data_path: PathBuf,

    #[clap(flatten)]
    pub prices: PriceArgs,

    /// Yearly electricity grid fee for small consumers missing from the fee table.
    #[clap(
        long = "default-electricity-grid-fee",
        env = "DEFAULT_ELECTRICITY_GRID_FEE",
        default_value = "430"
    )]
    pub default_electricity_grid_fee: Cost,

    /// Yearly gas grid fee for small consumers missing from the fee table.
    #[clap(long = "default-gas-grid-fee", env = "DEFAULT_GAS_GRID_FEE", default_value = "245")]
    pub default_gas_grid_fee: Cost,

    /// Fail on missing grid fees instead of using the defaults.
    #[clap(long = "strict-grid-fees", env = "STRICT_GRID_FEES")]
    pub strict_grid_fees: bool,

    /// How long rankings stay cached.
    #[clap(long = "ranking-ttl", env = "RANKING_TTL", default_value = "5m")]
    pub ranking_ttl: humantime::Duration,
}

impl EngineArgs {
    pub fn try_new_engine(&self) -> Result<Engine> {
        let grid_fee_defaults = if self.strict_grid_fees {
            GridFeeDefaults::STRICT
        } else {
            GridFeeDefaults::builder()
                .electricity(self.default_electricity_grid_fee)
                .gas(self.default_gas_grid_fee)
                .build()
        };
        Ok(Engine::builder()
            .store(Arc::new(MemoryStore::read_from(&self.reference_data_path)?))
            .aggregator(self.prices.try_new_aggregator()?)
            .grid_fee_defaults(grid_fee_defaults)
            .ranking_ttl(self.ranking_ttl.into())
            .build())
    }
}

#[derive(Parser)]
pub struct UsageArgs {
    /// Yearly normal-rate electricity consumption, or the total for a single meter.
    #[clap(long = "normal-kwh", env = "NORMAL_KWH")]
    pub normal: KilowattHours,

    /// Yearly off-peak electricity consumption.
    #[clap(long = "off-peak-kwh", env = "OFF_PEAK_KWH")]
    pub off_peak: Option<KilowattHours>,

    #[clap(long = "gas-m3", env = "GAS_M3")]
    pub gas: Option<CubicMeters>,

    /// Yearly solar feed-in.
    #[clap(long = "feed-in-kwh", env = "FEED_IN_KWH")]
    pub feed_in: Option<KilowattHours>,

    #[clap(long = "dual-meter", env = "DUAL_METER")]
    pub has_dual_meter: bool,

    /// Electricity connection capacity, estimated from the consumption when omitted.
    #[clap(long = "electricity-capacity", env = "ELECTRICITY_CAPACITY")]
    pub electricity_capacity: Option<String>,

    /// Gas connection capacity, estimated from the consumption when omitted.
    #[clap(long = "gas-capacity", env = "GAS_CAPACITY")]
    pub gas_capacity: Option<String>,
}

impl UsageArgs {
    pub fn to_profile(&self) -> UsageProfile {
        UsageProfile::builder()
            .normal(self.normal)
            .maybe_off_peak(self.off_peak)
            .maybe_gas(self.gas)
            .maybe_feed_in(self.feed_in)
            .has_dual_meter(self.has_dual_meter)
            .maybe_electricity_capacity(self.electricity_capacity.clone())
            .maybe_gas_capacity(self.gas_capacity.clone())
            .build()
    }
}

#[derive(Parser)]
pub struct QuoteArgs {
    #[clap(flatten)]
    pub engine: EngineArgs,

    #[clap(long, env = "POSTCODE")]
    pub postcode: Postcode,

    #[clap(flatten)]
    pub usage: UsageArgs,

    /// Offer to quote, all active offers when omitted.
    #[clap(long = "offer", env = "OFFER_ID")]
    pub offer_id: Option<String>,

    /// Tax year, the current one by default.
    #[clap(long, env = "TAX_YEAR")]
    pub year: Option<i32>,

    /// Print JSON instead of tables.
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct RankArgs {
    #[clap(flatten)]
    pub engine: EngineArgs,

    #[clap(long, default_value = "all", env = "OFFER_FILTER")]
    pub filter: OfferFilter,

    #[clap(long, env = "RANKING_LIMIT")]
    pub limit: Option<usize>,

    #[clap(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PricesArgs {
    #[clap(flatten)]
    pub prices: PriceArgs,

    #[clap(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct RefreshArgs {
    #[clap(flatten)]
    pub prices: PriceArgs,

    /// Day to fetch, today by default.
    #[clap(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Parser)]
pub struct BackfillArgs {
    #[clap(flatten)]
    pub prices: PriceArgs,

    /// Last day of the window, today by default.
    #[clap(long)]
    pub until: Option<NaiveDate>,

    #[clap(long, default_value = "30", env = "BACKFILL_DAYS")]
    pub days: u64,
}
