#![doc = include_str!("../README.md")]

mod cli;
mod tables;

use chrono::Local;
use clap::{Parser, crate_version};
use serde::Serialize;
use tariefwijzer::{
    core::quote::{OfferSelection, QuoteRequest},
    model::offer::OfferId,
    prelude::*,
};

use crate::{
    cli::{Args, BackfillArgs, Command, PricesArgs, QuoteArgs, RankArgs, RefreshArgs},
    tables::{
        build_breakdown_table,
        build_offers_table,
        build_ranking_table,
        build_snapshot_table,
    },
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Quote(args) => quote(*args).await,
        Command::Rank(args) => rank(*args).await,
        Command::Prices(args) => prices(*args).await,
        Command::Refresh(args) => refresh(*args).await,
        Command::Backfill(args) => backfill(*args).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn quote(args: QuoteArgs) -> Result {
    let engine = args.engine.try_new_engine()?;
    let selection =
        args.offer_id.map_or(OfferSelection::AllActive, |id| OfferSelection::Single(OfferId(id)));
    let request = QuoteRequest::builder()
        .postcode(args.postcode)
        .profile(args.usage.to_profile())
        .selection(selection)
        .maybe_year(args.year)
        .build();
    let quote = engine.quote(&request, Local::now().date_naive()).await?;
    info!(
        grid_operator = %quote.bundle.grid_operator.name,
        electricity_capacity = %quote.bundle.electricity_capacity.code,
        year = quote.bundle.year,
        n_offers = quote.breakdowns.len(),
        "quoted",
    );
    if args.json {
        return print_json(&quote);
    }
    if let Some(market) = &quote.market {
        info!(basis = %market.basis, day = %market.electricity_day, gas = %market.gas, "market prices");
    }
    match request.selection {
        OfferSelection::Single(_) => {
            for breakdown in &quote.breakdowns {
                println!("{}", build_breakdown_table(breakdown));
            }
        }
        OfferSelection::AllActive => {
            println!("{}", build_offers_table(&quote.breakdowns, quote.average_monthly));
        }
    }
    Ok(())
}

async fn rank(args: RankArgs) -> Result {
    let engine = args.engine.try_new_engine()?;
    let ranking = engine.rank(args.filter, args.limit, Local::now().date_naive()).await?;
    if args.json {
        return print_json(ranking.as_ref());
    }
    info!(
        average_monthly = %ranking.average_monthly,
        n_excluded = ranking.n_excluded,
        "ranked",
    );
    println!("{}", build_ranking_table(&ranking));
    Ok(())
}

async fn prices(args: PricesArgs) -> Result {
    let aggregator = args.prices.try_new_aggregator()?;
    let snapshot = aggregator.snapshot(Local::now().date_naive()).await?;
    if args.json {
        return print_json(&snapshot);
    }
    println!("{}", build_snapshot_table(&snapshot));
    Ok(())
}

async fn refresh(args: RefreshArgs) -> Result {
    let aggregator = args.prices.try_new_aggregator()?;
    let on = args.date.unwrap_or_else(|| Local::now().date_naive());
    let record = aggregator.refresh(on).await?;
    info!(
        date = %record.date,
        source = %record.source,
        electricity_day = %record.electricity_day,
        gas = %record.gas_average,
        "refreshed",
    );
    Ok(())
}

async fn backfill(args: BackfillArgs) -> Result {
    let aggregator = args.prices.try_new_aggregator()?;
    let until = args.until.unwrap_or_else(|| Local::now().date_naive());
    let report = aggregator.backfill(until, args.days).await?;
    info!(
        n_present = report.n_present,
        n_fetched = report.n_fetched,
        n_failed = report.n_failed,
        "backfilled",
    );
    Ok(())
}
