//! [EnergyZero](https://www.energyzero.nl/energieprijzen) day-ahead price client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    api::{
        client,
        provider::{DailyPrices, ElectricityPrices, MarketPriceProvider, Summary, mean},
    },
    model::price::PriceSource,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

pub const DEFAULT_BASE_URL: &str = "https://api.energyzero.nl/v1/";

pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn try_new(base_url: Url) -> Result<Self> {
        Ok(Self { client: client::try_new()?, base_url })
    }

    #[instrument(skip_all, fields(on = %on, usage_type = ?usage_type))]
    async fn get_prices(&self, on: NaiveDate, usage_type: UsageType) -> Result<Vec<PricePoint>> {
        let url = self.base_url.join("energyprices")?;
        let prices = self
            .client
            .get(url)
            .query(&[
                ("fromDate", format!("{on}T00:00:00.000Z")),
                ("tillDate", format!("{on}T23:59:59.999Z")),
                ("interval", "4".to_string()),
                ("usageType", (usage_type as u8).to_string()),
                ("inclBtw", "false".to_string()),
            ])
            .send()
            .await
            .context("failed to call")?
            .error_for_status()
            .context("request failed")?
            .json::<PricesResponse>()
            .await
            .context("failed to deserialize the response")?
            .prices;
        debug!(n_points = prices.len(), "fetched");
        Ok(prices)
    }
}

#[async_trait]
impl MarketPriceProvider for Api {
    fn source(&self) -> PriceSource {
        PriceSource::EnergyZero
    }

    #[instrument(skip_all, fields(on = %on))]
    async fn fetch_day(&self, on: NaiveDate) -> Result<DailyPrices> {
        let (electricity, gas) = tokio::try_join!(
            self.get_prices(on, UsageType::Electricity),
            self.get_prices(on, UsageType::Gas),
        )?;

        let (day, night): (Vec<_>, Vec<_>) =
            electricity.iter().partition(|point| point.is_day_time());
        let overall: Summary<KilowattHourRate> =
            Summary::of(&electricity.iter().map(|point| point.price).collect::<Vec<_>>())
                .context("no electricity prices returned")?;
        // A part of the day without points is priced at the overall average.
        let electricity = ElectricityPrices {
            overall,
            day: Some(
                mean(&day.iter().map(|point| point.price).collect::<Vec<_>>())
                    .map_or(overall.average, From::from),
            ),
            night: Some(
                mean(&night.iter().map(|point| point.price).collect::<Vec<_>>())
                    .map_or(overall.average, From::from),
            ),
        };
        let gas = Summary::of(&gas.iter().map(|point| point.price).collect::<Vec<_>>());
        if gas.is_none() {
            warn!("no gas prices returned");
        }
        info!(electricity = ?electricity.overall.average, "fetched");
        Ok(DailyPrices { source: PriceSource::EnergyZero, electricity, gas })
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(u8)]
enum UsageType {
    Electricity = 1,
    Gas = 3,
}

#[derive(Deserialize)]
struct PricesResponse {
    #[serde(rename = "Prices", default)]
    prices: Vec<PricePoint>,
}

#[derive(Deserialize)]
struct PricePoint {
    price: f64,

    #[serde(rename = "readingDate")]
    reading_date: DateTime<Utc>,
}

impl PricePoint {
    /// Day time is 06:00 to 23:00, reading dates are reported in UTC.
    fn is_day_time(&self) -> bool {
        (6..23).contains(&self.reading_date.hour())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use mockito::{Matcher, Server};
    use serde_json::{Value, json};

    use super::*;

    fn hourly(on: &str, prices: impl IntoIterator<Item = f64>) -> Value {
        let points: Vec<_> = prices
            .into_iter()
            .enumerate()
            .map(|(hour, price)| json!({ "price": price, "readingDate": format!("{on}T{hour:02}:00:00Z") }))
            .collect();
        json!({ "Prices": points })
    }

    fn usage_type(value: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("usageType".into(), value.into()),
            Matcher::UrlEncoded("inclBtw".into(), "false".into()),
            Matcher::UrlEncoded("fromDate".into(), "2025-03-01T00:00:00.000Z".into()),
        ])
    }

    #[tokio::test]
    async fn test_fetch_day() -> Result {
        let mut server = Server::new_async().await;
        // Night hours cost 0.05, day hours 0.20.
        let electricity_prices = (0..24).map(|hour| if (6..23).contains(&hour) { 0.20 } else { 0.05 });
        let electricity = server
            .mock("GET", "/energyprices")
            .match_query(usage_type("1"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(hourly("2025-03-01", electricity_prices).to_string())
            .create_async()
            .await;
        let gas = server
            .mock("GET", "/energyprices")
            .match_query(usage_type("3"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(hourly("2025-03-01", [0.60, 0.62, 0.64]).to_string())
            .create_async()
            .await;

        let api = Api::try_new(server.url().parse()?)?;
        let prices = api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await?;

        electricity.assert_async().await;
        gas.assert_async().await;
        assert_eq!(prices.source, PriceSource::EnergyZero);
        assert_abs_diff_eq!(prices.electricity.day.unwrap().0, 0.20, epsilon = 1e-9);
        assert_abs_diff_eq!(prices.electricity.night.unwrap().0, 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(prices.electricity.overall.min.0, 0.05);
        assert_abs_diff_eq!(prices.electricity.overall.max.0, 0.20);
        assert_abs_diff_eq!(
            prices.electricity.overall.average.0,
            (17.0 * 0.20 + 7.0 * 0.05) / 24.0,
            epsilon = 1e-9
        );
        let gas = prices.gas.unwrap();
        assert_abs_diff_eq!(gas.average.0, 0.62, epsilon = 1e-9);
        assert_abs_diff_eq!(gas.min.0, 0.60);
        Ok(())
    }

    #[tokio::test]
    async fn test_day_hours_only() -> Result {
        let mut server = Server::new_async().await;
        let points = json!({
            "Prices": [
                { "price": 0.10, "readingDate": "2025-03-01T10:00:00Z" },
                { "price": 0.30, "readingDate": "2025-03-01T11:00:00Z" },
            ],
        });
        let _mock = server
            .mock("GET", "/energyprices")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(points.to_string())
            .expect(2)
            .create_async()
            .await;

        let api = Api::try_new(server.url().parse()?)?;
        let prices = api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await?;
        assert_abs_diff_eq!(prices.electricity.day.unwrap().0, 0.20, epsilon = 1e-9);
        assert_abs_diff_eq!(prices.electricity.night.unwrap().0, 0.20, epsilon = 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_gas_failure_fails_provider() -> Result {
        let mut server = Server::new_async().await;
        let _electricity = server
            .mock("GET", "/energyprices")
            .match_query(usage_type("1"))
            .with_status(200)
            .with_body(hourly("2025-03-01", [0.1, 0.2]).to_string())
            .create_async()
            .await;
        let _gas = server
            .mock("GET", "/energyprices")
            .match_query(usage_type("3"))
            .with_status(503)
            .create_async()
            .await;

        let api = Api::try_new(server.url().parse()?)?;
        assert!(api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_no_electricity_prices() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/energyprices")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "Prices": [] }).to_string())
            .expect(2)
            .create_async()
            .await;

        let api = Api::try_new(server.url().parse()?)?;
        assert!(api.fetch_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).await.is_err());
        Ok(())
    }
}
