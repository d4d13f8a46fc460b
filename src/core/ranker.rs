//! Offers ranked for presentation, with savings against the reference offer.

use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::{
    api::provider::mean,
    core::{
        aggregator::AveragePrice,
        breakdown::CostBreakdown,
        calculator::calculate,
        engine::Engine,
        resolver::TariffBundle,
    },
    error::EngineError,
    model::{
        offer::{ContractKind, ContractOffer},
        usage::UsageProfile,
    },
    prelude::*,
    quantity::cost::Cost,
};

/// Cache tag of everything derived from the offer catalogue.
pub const OFFERS_TAG: &str = "offers";

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    clap::ValueEnum,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum OfferFilter {
    #[default]
    #[display("all")]
    All,

    #[display("fixed")]
    Fixed,

    #[display("variable")]
    Variable,

    #[display("custom")]
    Custom,
}

impl OfferFilter {
    #[must_use]
    pub const fn matches(self, kind: ContractKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _)
                | (Self::Fixed, ContractKind::Fixed)
                | (Self::Variable, ContractKind::Variable)
                | (Self::Custom, ContractKind::Custom)
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RankingKey {
    pub filter: OfferFilter,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedOffer {
    #[serde(flatten)]
    pub breakdown: CostBreakdown,

    /// Monthly savings compared to the reference offer, never negative.
    pub savings_monthly: Cost,
}

#[derive(Clone, Debug, Serialize)]
pub struct Ranking {
    pub offers: Vec<RankedOffer>,

    /// Monthly cost of the reference offer, or the mean of the ranked offers without one.
    pub average_monthly: Cost,

    pub baseline_monthly: Option<Cost>,
    pub market: Option<AveragePrice>,

    /// Offers left out because of incomplete details or failed calculations.
    pub n_excluded: usize,

    pub computed_at: DateTime<Utc>,
}

/// Recommended offers first, then by rating, then the cheapest.
pub fn presentation_order(lhs: &CostBreakdown, rhs: &CostBreakdown) -> Ordering {
    rhs.offer
        .recommended
        .cmp(&lhs.offer.recommended)
        .then_with(|| OrderedFloat(rhs.offer.rating).cmp(&OrderedFloat(lhs.offer.rating)))
        .then_with(|| OrderedFloat(lhs.totals.monthly.0).cmp(&OrderedFloat(rhs.totals.monthly.0)))
}

impl Engine {
    /// Rank the active offers for the reference basket.
    #[instrument(skip_all, fields(filter = %filter, limit = ?limit))]
    pub async fn rank(
        &self,
        filter: OfferFilter,
        limit: Option<usize>,
        today: NaiveDate,
    ) -> Result<Arc<Ranking>, EngineError> {
        let key = RankingKey { filter, limit };
        if let Some(ranking) = self.rankings.get(&key) {
            debug!("cache hit");
            return Ok(ranking);
        }
        let generation = self.rankings.generation();

        let basket = &self.basket;
        let (bundle, offers, reference) = tokio::try_join!(
            self.resolve(&basket.postcode, &basket.profile, today.year()),
            async { self.store.active_offers().await.map_err(EngineError::from) },
            async { self.store.reference_offer().await.map_err(EngineError::from) },
        )?;
        let offers = offers.into_iter().filter(|offer| filter.matches(offer.kind)).collect_vec();

        let market = self.market_for(offers.iter().chain(&reference), today).await;
        let baseline = reference.as_ref().and_then(|offer| {
            calculate(offer, &basket.profile, &bundle, market.as_ref())
                .inspect_err(|error| warn!(offer = %offer.id, "no baseline: {error}"))
                .ok()
        });
        let baseline_monthly = baseline.map(|baseline| baseline.totals.monthly);

        let (breakdowns, n_excluded) =
            evaluate(&offers, &basket.profile, &bundle, market.as_ref())?;
        let average_monthly = baseline_monthly
            .or_else(|| {
                mean(&breakdowns.iter().map(|breakdown| breakdown.totals.monthly.0).collect_vec())
                    .map(Cost::from)
            })
            .unwrap_or(Cost::ZERO);

        let mut offers = breakdowns
            .into_iter()
            .sorted_by(presentation_order)
            .map(|breakdown| {
                let savings_monthly = baseline_monthly.map_or(Cost::ZERO, |baseline| {
                    (baseline - breakdown.totals.monthly).max(Cost::ZERO)
                });
                RankedOffer { breakdown, savings_monthly }
            })
            .collect_vec();
        if let Some(limit) = limit {
            offers.truncate(limit);
        }
        info!(n_ranked = offers.len(), n_excluded, average_monthly = %average_monthly, "ranked");

        let ranking = Ranking {
            offers,
            average_monthly,
            baseline_monthly,
            market,
            n_excluded,
            computed_at: Utc::now(),
        };
        Ok(self.rankings.insert(key, ranking, &[OFFERS_TAG], generation))
    }

    /// Drop cached rankings after the offer catalogue has changed.
    pub fn invalidate_offers(&self) {
        self.rankings.invalidate_tag(OFFERS_TAG);
    }

    /// Fetch the market average once, and only when there is a variable offer to price.
    pub(super) async fn market_for<'a>(
        &self,
        mut offers: impl Iterator<Item = &'a ContractOffer>,
        today: NaiveDate,
    ) -> Option<AveragePrice> {
        if !offers.any(|offer| offer.kind == ContractKind::Variable && offer.terms.is_some()) {
            return None;
        }
        self.aggregator
            .average(today)
            .await
            .inspect_err(|error| warn!("variable offers are left out: {error}"))
            .ok()
    }
}

/// Calculate every offer, leaving out the ones that cannot be priced.
///
/// Only calculation failures drop an offer. Any other error fails the whole evaluation.
pub(super) fn evaluate(
    offers: &[ContractOffer],
    profile: &UsageProfile,
    bundle: &TariffBundle,
    market: Option<&AveragePrice>,
) -> Result<(Vec<CostBreakdown>, usize), EngineError> {
    let mut n_excluded = 0;
    let mut breakdowns = Vec::with_capacity(offers.len());
    for offer in offers {
        if offer.terms.is_none() {
            debug!(offer = %offer.id, "no tariff details, skipped");
            n_excluded += 1;
            continue;
        }
        if offer.kind == ContractKind::Variable && market.is_none() {
            n_excluded += 1;
            continue;
        }
        match calculate(offer, profile, bundle, market) {
            Ok(breakdown) => breakdowns.push(breakdown),
            Err(error) if error.is_calculation_failure() => {
                warn!(offer = %offer.id, "skipped: {error}");
                n_excluded += 1;
            }
            Err(error) => return Err(error),
        }
    }
    Ok((breakdowns, n_excluded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            aggregator::{PriceAggregator, PricePolicy, tests::StaticProvider},
            calculator::tests::{bundle, fixed_offer, market},
        },
        model::{offer::OfferId, price::PriceSource},
        quantity::energy::KilowattHours,
        store::{memory::tests::sample, price_file::PriceFile},
    };

    fn engine(providers: Vec<Box<dyn crate::api::provider::MarketPriceProvider>>) -> Result<Engine> {
        let aggregator =
            PriceAggregator::new(providers, Arc::new(PriceFile::in_memory()), PricePolicy::default());
        Ok(Engine::builder().store(Arc::new(sample()?)).aggregator(aggregator).build())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn breakdown(id: &str, recommended: bool, rating: f64, rate: f64) -> Result<CostBreakdown> {
        let mut offer = fixed_offer();
        offer.id = OfferId::from(id);
        offer.recommended = recommended;
        offer.rating = rating;
        if let Some(crate::model::offer::ContractTerms::Fixed(terms)) = &mut offer.terms {
            terms.electricity_single = Some(rate.into());
        }
        let profile = UsageProfile::builder().normal(KilowattHours::from(3_000.0)).build();
        Ok(calculate(&offer, &profile, &bundle(true), None)?)
    }

    #[test]
    fn test_presentation_order() -> Result {
        let mut breakdowns = vec![
            breakdown("cheap", false, 4.0, 0.20)?,
            breakdown("expensive-recommended", true, 3.0, 0.40)?,
            breakdown("rated", false, 4.5, 0.30)?,
            breakdown("cheap-twin", false, 4.0, 0.19)?,
        ];
        breakdowns.sort_by(presentation_order);
        let ids = breakdowns.iter().map(|breakdown| breakdown.offer.id.0.as_str()).collect_vec();
        assert_eq!(ids, ["expensive-recommended", "rated", "cheap-twin", "cheap"]);
        Ok(())
    }

    #[test]
    fn test_evaluate_drops_calculation_failures() -> Result {
        let mut mismatched = fixed_offer();
        mismatched.id = OfferId::from("mismatched");
        mismatched.kind = ContractKind::Variable;
        let offers = [fixed_offer(), mismatched];
        let profile = UsageProfile::builder().normal(KilowattHours::from(3_000.0)).build();

        let (breakdowns, n_excluded) =
            evaluate(&offers, &profile, &bundle(true), Some(&market()))?;
        assert_eq!(breakdowns.len(), 1);
        assert_eq!(n_excluded, 1);
        Ok(())
    }

    #[test]
    fn test_evaluate_fails_on_missing_tariff() {
        let mut offer = fixed_offer();
        if let Some(crate::model::offer::ContractTerms::Fixed(terms)) = &mut offer.terms {
            terms.electricity_off_peak = None;
        }
        let profile = UsageProfile::builder()
            .normal(KilowattHours::from(2_000.0))
            .off_peak(KilowattHours::from(1_000.0))
            .build();
        let error = evaluate(&[offer], &profile, &bundle(true), None).unwrap_err();
        assert!(error.is_invalid_input());
    }

    #[test]
    fn test_filter() {
        assert!(OfferFilter::All.matches(ContractKind::Custom));
        assert!(OfferFilter::Variable.matches(ContractKind::Variable));
        assert!(!OfferFilter::Fixed.matches(ContractKind::Custom));
    }

    #[tokio::test]
    async fn test_rank() -> Result {
        let engine = engine(vec![StaticProvider::serving(PriceSource::EnergyZero, 0.10, Some(0.6))])?;
        let ranking = engine.rank(OfferFilter::All, None, today()).await?;

        assert!(ranking.market.is_some());
        assert!(ranking.baseline_monthly.is_some());
        assert_eq!(Some(ranking.average_monthly), ranking.baseline_monthly);
        // The offer without details is left out.
        assert!(ranking.n_excluded >= 1);
        assert!(
            ranking
                .offers
                .iter()
                .any(|offer| offer.breakdown.offer.kind == ContractKind::Variable)
        );
        assert!(
            ranking
                .offers
                .iter()
                .tuple_windows()
                .all(|(lhs, rhs)| presentation_order(&lhs.breakdown, &rhs.breakdown).is_le())
        );
        assert!(ranking.offers.iter().all(|offer| offer.savings_monthly >= Cost::ZERO));
        Ok(())
    }

    #[tokio::test]
    async fn test_rank_without_market_prices() -> Result {
        let engine = engine(vec![StaticProvider::failing(PriceSource::EnergyZero)])?;
        let ranking = engine.rank(OfferFilter::All, None, today()).await?;
        assert!(ranking.market.is_none());
        assert!(!ranking.offers.is_empty());
        assert!(
            ranking
                .offers
                .iter()
                .all(|offer| offer.breakdown.offer.kind != ContractKind::Variable)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rank_filter_and_limit() -> Result {
        let engine = engine(Vec::new())?;
        let ranking = engine.rank(OfferFilter::Fixed, Some(1), today()).await?;
        assert_eq!(ranking.offers.len(), 1);
        assert_eq!(ranking.offers[0].breakdown.offer.kind, ContractKind::Fixed);
        // No variable offer among the fixed ones, so no market prices are needed.
        assert!(ranking.market.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_rank_is_cached() -> Result {
        let engine = engine(Vec::new())?;
        let first = engine.rank(OfferFilter::Fixed, None, today()).await?;
        let second = engine.rank(OfferFilter::Fixed, None, today()).await?;
        assert!(Arc::ptr_eq(&first, &second));

        let other = engine.rank(OfferFilter::Fixed, Some(1), today()).await?;
        assert!(!Arc::ptr_eq(&first, &other));

        engine.invalidate_offers();
        let third = engine.rank(OfferFilter::Fixed, None, today()).await?;
        assert!(!Arc::ptr_eq(&first, &third));
        Ok(())
    }
}
