use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    core::{
        aggregator::AveragePrice,
        breakdown::CostBreakdown,
        calculator::calculate,
        engine::Engine,
        ranker::{OfferFilter, evaluate, presentation_order},
        resolver::TariffBundle,
    },
    error::EngineError,
    model::{
        grid::Postcode,
        offer::{ContractKind, OfferId},
        usage::UsageProfile,
    },
    prelude::*,
    quantity::cost::Cost,
};

#[derive(Clone, Debug)]
pub enum OfferSelection {
    Single(OfferId),
    AllActive,
}

#[derive(Clone, Debug, bon::Builder)]
pub struct QuoteRequest {
    pub postcode: Postcode,
    pub profile: UsageProfile,
    pub selection: OfferSelection,

    /// Tax year, the current one by default.
    pub year: Option<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    pub bundle: TariffBundle,
    pub breakdowns: Vec<CostBreakdown>,
    pub market: Option<AveragePrice>,

    /// Average monthly price of the reference basket, batch quotes only.
    pub average_monthly: Option<Cost>,
}

impl Engine {
    #[instrument(skip_all, fields(postcode = %request.postcode))]
    pub async fn quote(&self, request: &QuoteRequest, today: NaiveDate) -> Result<Quote, EngineError> {
        let profile = &request.profile;
        profile.validate()?;
        let year = request.year.unwrap_or_else(|| today.year());
        let bundle = self.resolve(&request.postcode, profile, year).await?;

        match &request.selection {
            OfferSelection::Single(id) => {
                let offer =
                    self.store.offer(id).await?.ok_or_else(|| EngineError::OfferNotFound(id.clone()))?;
                if offer.terms.is_none() {
                    return Err(EngineError::OfferDetailsMissing(offer.id));
                }
                let market = if offer.kind == ContractKind::Variable {
                    Some(self.aggregator.average(today).await?)
                } else {
                    None
                };
                let breakdown = calculate(&offer, profile, &bundle, market.as_ref())?;
                Ok(Quote { bundle, breakdowns: vec![breakdown], market, average_monthly: None })
            }

            OfferSelection::AllActive => {
                let offers = self.store.active_offers().await?;
                let market = self.market_for(offers.iter(), today).await;
                let (mut breakdowns, n_excluded) =
                    evaluate(&offers, profile, &bundle, market.as_ref())?;
                breakdowns.sort_by(presentation_order);
                let average_monthly = match self.rank(OfferFilter::All, None, today).await {
                    Ok(ranking) => Some(ranking.average_monthly),
                    Err(error) => {
                        warn!("no reference average: {error}");
                        None
                    }
                };
                info!(n_quoted = breakdowns.len(), n_excluded, "quoted");
                Ok(Quote { bundle, breakdowns, market, average_monthly })
            }
        }
    }
}
