use chrono::NaiveDate;
use itertools::Itertools;
use thiserror::Error;

use crate::model::{
    capacity::Commodity,
    grid::{GridOperatorId, Postcode},
    offer::OfferId,
    price::PriceSource,
};

/// Error class that tells the caller what to do with a failed request.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum ErrorKind {
    #[display("not found")]
    NotFound,

    #[display("invalid input")]
    InvalidInput,

    #[display("upstream unavailable")]
    UpstreamUnavailable,

    #[display("calculation failure")]
    CalculationFailure,

    #[display("store failure")]
    Store,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("postcode `{0}` is not served by any known grid operator")]
    PostcodeNotMapped(Postcode),

    #[error("no active government tax tariff for {0}")]
    TaxTariffNotFound(i32),

    #[error("grid operator {operator} has no {commodity} fee for capacity `{capacity}` in {year}")]
    GridFeeNotFound { operator: GridOperatorId, year: i32, commodity: Commodity, capacity: String },

    #[error("offer `{0}` does not exist")]
    OfferNotFound(OfferId),

    #[error("offer `{0}` has no tariff details")]
    OfferDetailsMissing(OfferId),

    #[error("unsupported {commodity} connection capacity `{code}`")]
    UnsupportedCapacity { commodity: Commodity, code: String },

    #[error("invalid postcode `{0}`")]
    InvalidPostcode(String),

    #[error("invalid usage profile: {0}")]
    InvalidProfile(String),

    #[error("offer `{offer}` has no {tariff} tariff")]
    MissingTariff { offer: OfferId, tariff: &'static str },

    #[error("all market price providers failed for {date}: {}", .failures.iter().join("; "))]
    UpstreamUnavailable { date: NaiveDate, failures: Vec<ProviderFailure> },

    #[error("calculation of offer `{offer}` failed: {reason}")]
    CalculationFailure { offer: OfferId, reason: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PostcodeNotMapped(_)
            | Self::TaxTariffNotFound(_)
            | Self::GridFeeNotFound { .. }
            | Self::OfferNotFound(_)
            | Self::OfferDetailsMissing(_) => ErrorKind::NotFound,
            Self::UnsupportedCapacity { .. }
            | Self::InvalidPostcode(_)
            | Self::InvalidProfile(_)
            | Self::MissingTariff { .. } => ErrorKind::InvalidInput,
            Self::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Self::CalculationFailure { .. } => ErrorKind::CalculationFailure,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidInput)
    }

    #[must_use]
    pub const fn is_upstream_unavailable(&self) -> bool {
        matches!(self.kind(), ErrorKind::UpstreamUnavailable)
    }

    #[must_use]
    pub const fn is_calculation_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::CalculationFailure)
    }
}

/// Why a single market price provider could not deliver.
#[derive(Clone, Debug, derive_more::Display)]
#[display("{provider}: {reason}")]
pub struct ProviderFailure {
    pub provider: PriceSource,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_unavailable_message() {
        let error = EngineError::UpstreamUnavailable {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            failures: vec![
                ProviderFailure { provider: PriceSource::EnergyZero, reason: "timed out".into() },
                ProviderFailure { provider: PriceSource::Entsoe, reason: "no API key".into() },
            ],
        };
        assert_eq!(
            error.to_string(),
            "all market price providers failed for 2025-03-01: EnergyZero: timed out; ENTSO-E: no API key",
        );
        assert!(error.is_upstream_unavailable());
    }

    #[test]
    fn test_kind() {
        assert!(EngineError::TaxTariffNotFound(2030).is_not_found());
        assert!(EngineError::MissingTariff { offer: "a".into(), tariff: "gas" }.is_invalid_input());
        assert_eq!(EngineError::from(anyhow::anyhow!("disk full")).kind(), ErrorKind::Store);
    }
}
