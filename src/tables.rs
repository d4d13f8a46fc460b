use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use tariefwijzer::{
    core::{
        aggregator::{PriceSnapshot, Trend},
        breakdown::{Charge, CostBreakdown, ElectricityCharges, SupplierBreakdown},
        ranker::Ranking,
        tax::BracketCharge,
    },
    model::offer::ContractKind,
    quantity::cost::Cost,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

const fn kind_color(kind: ContractKind) -> Color {
    match kind {
        ContractKind::Fixed => Color::Blue,
        ContractKind::Variable => Color::DarkYellow,
        ContractKind::Custom => Color::Magenta,
    }
}

const fn trend_color(trend: Trend) -> Color {
    match trend {
        Trend::Up => Color::Red,
        Trend::Down => Color::Green,
        Trend::Stable => Color::Reset,
    }
}

fn amount_cell(amount: Cost) -> Cell {
    Cell::new(amount).set_alignment(CellAlignment::Right).fg(if amount < Cost::ZERO {
        Color::Green
    } else {
        Color::Reset
    })
}

fn add_row(
    table: &mut Table,
    item: &str,
    quantity: &impl std::fmt::Display,
    rate: &impl std::fmt::Display,
    amount: Cost,
) {
    table.add_row(vec![
        Cell::new(item),
        Cell::new(quantity).set_alignment(CellAlignment::Right),
        Cell::new(rate).set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
        amount_cell(amount),
    ]);
}

fn add_charge_row<Q, R>(table: &mut Table, item: &str, charge: &Charge<Q, R>)
where
    Q: std::fmt::Display,
    R: std::fmt::Display,
{
    add_row(table, item, &charge.quantity, &charge.rate, charge.amount);
}

fn add_bracket_row<Q, R>(table: &mut Table, item: &str, charge: &BracketCharge<Q, R>)
where
    Q: std::fmt::Display,
    R: std::fmt::Display,
{
    let item = format!("{item}, bracket {}", charge.index + 1);
    add_row(table, &item, &charge.quantity, &charge.rate, charge.amount);
}

fn add_amount_row(table: &mut Table, item: &str, amount: Cost) {
    table.add_row(vec![Cell::new(item), Cell::new(""), Cell::new(""), amount_cell(amount)]);
}

fn add_electricity_rows(table: &mut Table, charges: &ElectricityCharges) {
    match charges {
        ElectricityCharges::Single { single } => add_charge_row(table, "Electricity", single),
        ElectricityCharges::Dual { normal, off_peak } => {
            add_charge_row(table, "Electricity (normal)", normal);
            add_charge_row(table, "Electricity (off-peak)", off_peak);
        }
    }
}

/// Line items of a single offer, from the supplier cost down to the monthly total.
#[must_use]
pub fn build_breakdown_table(breakdown: &CostBreakdown) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Item", "Quantity", "Rate", "Amount"]);

    match &breakdown.supplier {
        SupplierBreakdown::Fixed(cost) => {
            add_electricity_rows(&mut table, &cost.electricity);
            if let Some(gas) = &cost.gas {
                add_charge_row(&mut table, "Gas", gas);
            }
            if let Some(feed_in_costs) = &cost.feed_in_costs {
                add_charge_row(&mut table, "Feed-in costs", feed_in_costs);
            }
        }
        SupplierBreakdown::Variable(cost) => {
            add_electricity_rows(&mut table, &cost.electricity);
            if let Some(gas) = &cost.gas {
                add_charge_row(&mut table, "Gas", gas);
            }
            if let Some(surplus) = &cost.surplus_compensation {
                add_row(
                    &mut table,
                    "Surplus compensation",
                    &surplus.quantity,
                    &surplus.rate,
                    -surplus.amount,
                );
            }
        }
    }

    for charge in &breakdown.tax.electricity {
        add_bracket_row(&mut table, "Energy tax", charge);
    }
    for charge in &breakdown.tax.gas {
        add_bracket_row(&mut table, "Gas tax", charge);
    }
    add_amount_row(&mut table, "Tax rebate", -breakdown.tax.rebate);
    add_amount_row(&mut table, "Electricity grid fee", breakdown.grid_fees.electricity);
    add_amount_row(&mut table, "Gas grid fee", breakdown.grid_fees.gas);
    add_amount_row(&mut table, "Electricity fixed fees", breakdown.fixed_fees.electricity);
    add_amount_row(&mut table, "Gas fixed fees", breakdown.fixed_fees.gas);

    let totals = &breakdown.totals;
    add_amount_row(&mut table, "Before VAT", totals.pre_vat);
    table.add_row(vec![
        Cell::new("VAT"),
        Cell::new(""),
        Cell::new(totals.vat_percentage).set_alignment(CellAlignment::Right),
        amount_cell(totals.vat),
    ]);
    table.add_row(vec![
        Cell::new("Yearly").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(totals.yearly).set_alignment(CellAlignment::Right).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Monthly").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(totals.monthly)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);
    table
}

/// Offers side by side, colored against the average monthly price when known.
#[must_use]
pub fn build_offers_table(breakdowns: &[CostBreakdown], average_monthly: Option<Cost>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Supplier", "Offer", "Kind", "Rating", "Yearly", "Monthly"]);
    for breakdown in breakdowns {
        let monthly_color = match average_monthly {
            Some(average) if breakdown.totals.monthly <= average => Color::Green,
            Some(_) => Color::Red,
            None => Color::Reset,
        };
        table.add_row(vec![
            Cell::new(&breakdown.offer.supplier),
            Cell::new(&breakdown.offer.name).add_attribute(if breakdown.offer.recommended {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            }),
            Cell::new(breakdown.offer.kind).fg(kind_color(breakdown.offer.kind)),
            Cell::new(format!("{:.1}", breakdown.offer.rating)).set_alignment(CellAlignment::Right),
            Cell::new(breakdown.totals.yearly).set_alignment(CellAlignment::Right),
            Cell::new(breakdown.totals.monthly)
                .set_alignment(CellAlignment::Right)
                .fg(monthly_color),
        ]);
    }
    table
}

#[must_use]
pub fn build_ranking_table(ranking: &Ranking) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Supplier", "Offer", "Kind", "Rating", "Monthly", "Savings"]);
    for (index, ranked) in ranking.offers.iter().enumerate() {
        let offer = &ranked.breakdown.offer;
        table.add_row(vec![
            Cell::new(index + 1).add_attribute(Attribute::Dim),
            Cell::new(&offer.supplier),
            Cell::new(&offer.name).add_attribute(if offer.recommended {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            }),
            Cell::new(offer.kind).fg(kind_color(offer.kind)),
            Cell::new(format!("{:.1}", offer.rating)).set_alignment(CellAlignment::Right),
            Cell::new(ranked.breakdown.totals.monthly).set_alignment(CellAlignment::Right),
            Cell::new(ranked.savings_monthly).set_alignment(CellAlignment::Right).fg(
                if ranked.savings_monthly >= Cost::ONE_CENT { Color::Green } else { Color::Reset },
            ),
        ]);
    }
    table
}

#[must_use]
pub fn build_snapshot_table(snapshot: &PriceSnapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Electricity day", "Electricity night", "Gas", "Source"]);
    for (label, record) in [("Yesterday", &snapshot.yesterday), ("Current", &snapshot.current)] {
        let Some(record) = record else {
            table.add_row(vec![Cell::new(label), Cell::new("n/a").add_attribute(Attribute::Dim)]);
            continue;
        };
        let label = if record.is_forecast {
            format!("{label} ({}, forecast)", record.date)
        } else {
            format!("{label} ({})", record.date)
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(record.electricity_day).set_alignment(CellAlignment::Right),
            Cell::new(
                record.electricity_night.map_or_else(|| "n/a".to_string(), |rate| rate.to_string()),
            )
            .set_alignment(CellAlignment::Right),
            Cell::new(record.gas_average).set_alignment(CellAlignment::Right),
            Cell::new(record.source).add_attribute(Attribute::Dim),
        ]);
    }
    table.add_row(vec![
        Cell::new("Trend"),
        Cell::new(snapshot.electricity_trend)
            .set_alignment(CellAlignment::Right)
            .fg(trend_color(snapshot.electricity_trend)),
        Cell::new(""),
        Cell::new(snapshot.gas_trend)
            .set_alignment(CellAlignment::Right)
            .fg(trend_color(snapshot.gas_trend)),
        Cell::new(""),
    ]);
    let average = &snapshot.average;
    table.add_row(vec![
        Cell::new("Average").add_attribute(Attribute::Bold),
        Cell::new(average.electricity_day).set_alignment(CellAlignment::Right),
        Cell::new(average.electricity_night).set_alignment(CellAlignment::Right),
        Cell::new(average.gas).set_alignment(CellAlignment::Right),
        Cell::new(average.basis).add_attribute(Attribute::Dim),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tariefwijzer::{
        core::{
            aggregator::{PriceAggregator, PricePolicy},
            engine::Engine,
            quote::{OfferSelection, QuoteRequest},
        },
        model::usage::UsageProfile,
        prelude::*,
        quantity::{energy::KilowattHours, volume::CubicMeters},
        store::{memory::MemoryStore, price_file::PriceFile},
    };

    use super::*;

    #[tokio::test]
    async fn test_breakdown_table() -> Result {
        let store: MemoryStore = include_str!("../data/reference.toml").parse()?;
        let aggregator =
            PriceAggregator::new(Vec::new(), Arc::new(PriceFile::in_memory()), PricePolicy::default());
        let engine = Engine::builder().store(Arc::new(store)).aggregator(aggregator).build();
        let request = QuoteRequest::builder()
            .postcode("1012 AB".parse()?)
            .profile(
                UsageProfile::builder()
                    .normal(KilowattHours::from(3_000.0))
                    .gas(CubicMeters::from(1_200.0))
                    .build(),
            )
            .selection(OfferSelection::Single("vast-1-jaar".into()))
            .year(2025)
            .build();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).context("invalid date")?;
        let quote = engine.quote(&request, today).await?;

        let table = build_breakdown_table(&quote.breakdowns[0]).to_string();
        assert!(table.contains("Energy tax, bracket 1"));
        assert!(table.contains("Gas tax, bracket 1"));
        assert!(table.contains("Monthly"));
        Ok(())
    }
}
