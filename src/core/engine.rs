use std::{sync::Arc, time::Duration};

use bon::bon;

use crate::{
    core::{
        aggregator::PriceAggregator,
        cache::TtlCache,
        ranker::{Ranking, RankingKey},
        resolver::{GridFeeDefaults, Resolver, TariffBundle},
    },
    error::EngineError,
    model::{grid::Postcode, usage::UsageProfile},
    quantity::{energy::KilowattHours, volume::CubicMeters},
    store::ReferenceData,
};

/// Representative profile the offers are ranked for.
#[derive(Clone, Debug)]
pub struct ReferenceBasket {
    pub postcode: Postcode,
    pub profile: UsageProfile,
}

impl Default for ReferenceBasket {
    fn default() -> Self {
        Self {
            postcode: Postcode::from_canonical("1000AA"),
            profile: UsageProfile::builder()
                .normal(KilowattHours::from(4_000.0))
                .off_peak(KilowattHours::from(2_000.0))
                .gas(CubicMeters::from(1_200.0))
                .has_dual_meter(true)
                .electricity_capacity("3x25A")
                .gas_capacity("G6")
                .build(),
        }
    }
}

/// Cost engine over the reference data and market prices.
pub struct Engine {
    pub(super) store: Arc<dyn ReferenceData>,
    pub(super) aggregator: PriceAggregator,
    pub(super) grid_fee_defaults: GridFeeDefaults,
    pub(super) basket: ReferenceBasket,
    pub(super) rankings: TtlCache<RankingKey, Ranking>,
}

#[bon]
impl Engine {
    #[builder]
    pub fn new(
        store: Arc<dyn ReferenceData>,
        aggregator: PriceAggregator,
        #[builder(default)] grid_fee_defaults: GridFeeDefaults,
        #[builder(default)] basket: ReferenceBasket,
        #[builder(default = Duration::from_secs(300))] ranking_ttl: Duration,
    ) -> Self {
        Self {
            store,
            aggregator,
            grid_fee_defaults,
            basket,
            rankings: TtlCache::new(ranking_ttl),
        }
    }
}

impl Engine {
    #[must_use]
    pub const fn aggregator(&self) -> &PriceAggregator {
        &self.aggregator
    }

    #[must_use]
    pub const fn basket(&self) -> &ReferenceBasket {
        &self.basket
    }

    /// Resolve the reference tariffs of the address, using the capacities of the profile.
    pub(super) async fn resolve(
        &self,
        postcode: &Postcode,
        profile: &UsageProfile,
        year: i32,
    ) -> Result<TariffBundle, EngineError> {
        Resolver::new(self.store.as_ref(), self.grid_fee_defaults)
            .resolve(
                postcode,
                profile.electricity_capacity(),
                profile.gas.map(|_| profile.gas_capacity()),
                year,
            )
            .await
    }
}
