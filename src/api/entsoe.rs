//! [ENTSO-E Transparency Platform](https://transparency.entsoe.eu) day-ahead price client.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::{Client, Url};

use crate::{
    api::{
        client,
        provider::{DailyPrices, ElectricityPrices, MarketPriceProvider, Summary},
    },
    model::price::PriceSource,
    prelude::*,
};

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Bidding zone of the Netherlands.
const DOMAIN: &str = "10YNL----------L";

pub struct Api {
    client: Client,
    base_url: Url,
    security_token: String,
}

impl Api {
    pub fn try_new(base_url: Url, security_token: String) -> Result<Self> {
        Ok(Self { client: client::try_new()?, base_url, security_token })
    }
}

#[async_trait]
impl MarketPriceProvider for Api {
    fn source(&self) -> PriceSource {
        PriceSource::Entsoe
    }

    /// Fetch the day-ahead auction prices («A44» document).
    ///
    /// The platform has neither gas prices nor a day/night split.
    #[instrument(skip_all, fields(on = %on))]
    async fn fetch_day(&self, on: NaiveDate) -> Result<DailyPrices> {
        let next_day = on.checked_add_days(Days::new(1)).context("date overflow")?;
        let period_start = format!("{}0000", on.format("%Y%m%d"));
        let period_end = format!("{}0000", next_day.format("%Y%m%d"));
        let document = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("securityToken", self.security_token.as_str()),
                ("documentType", "A44"),
                ("in_Domain", DOMAIN),
                ("out_Domain", DOMAIN),
                ("periodStart", period_start.as_str()),
                ("periodEnd", period_end.as_str()),
            ])
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .text()
            .await
            .context("failed to read the response")?;
        let points: Vec<f64> = parse_price_amounts(&document)?
            .into_iter()
            .map(|euro_per_megawatt_hour| euro_per_megawatt_hour / 1000.0)
            .collect();
        debug!(n_points = points.len(), "fetched");
        let overall = Summary::of(&points).context("no prices in the document")?;
        info!(electricity = ?overall.average, "fetched");
        Ok(DailyPrices {
            source: PriceSource::Entsoe,
            electricity: ElectricityPrices { overall, day: None, night: None },
            gas: None,
        })
    }
}

/// Extract the `<price.amount>` values, in €/MWh.
fn parse_price_amounts(document: &str) -> Result<Vec<f64>> {
    document
        .split("<price.amount>")
        .skip(1)
        .map(|chunk| {
            let (value, _) =
                chunk.split_once("</price.amount>").context("unterminated `price.amount`")?;
            value.trim().parse::<f64>().with_context(|| format!("invalid price amount `{value}`"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use mockito::{Matcher, Server};

    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Publication_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-3:publicationdocument:7:3">
  <TimeSeries>
    <Period>
      <resolution>PT60M</resolution>
      <Point><position>1</position><price.amount>100.00</price.amount></Point>
      <Point><position>2</position><price.amount>-20.50</price.amount></Point>
      <Point><position>3</position><price.amount>160.50</price.amount></Point>
    </Period>
  </TimeSeries>
</Publication_MarketDocument>"#;

    #[test]
    fn test_parse_price_amounts() -> Result {
        assert_eq!(parse_price_amounts(DOCUMENT)?, [100.0, -20.5, 160.5]);
        assert!(parse_price_amounts("<price.amount>1.0").is_err());
        assert!(parse_price_amounts("<price.amount>abc</price.amount>").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_day() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("securityToken".into(), "secret".into()),
                Matcher::UrlEncoded("documentType".into(), "A44".into()),
                Matcher::UrlEncoded("periodStart".into(), "202503010000".into()),
                Matcher::UrlEncoded("periodEnd".into(), "202503020000".into()),
            ]))
            .with_status(200)
            .with_body(DOCUMENT)
            .create_async()
            .await;

        let api = Api::try_new(format!("{}/api", server.url()).parse()?, "secret".to_string())?;
        let prices = api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await?;

        mock.assert_async().await;
        assert_eq!(prices.source, PriceSource::Entsoe);
        assert!(prices.gas.is_none());
        assert!(prices.electricity.day.is_none());
        assert_abs_diff_eq!(prices.electricity.overall.average.0, 0.08, epsilon = 1e-9);
        assert_abs_diff_eq!(prices.electricity.overall.min.0, -0.0205, epsilon = 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_document() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<Acknowledgement_MarketDocument/>")
            .create_async()
            .await;

        let api = Api::try_new(format!("{}/api", server.url()).parse()?, "secret".to_string())?;
        assert!(api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await.is_err());
        Ok(())
    }
}
