use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::NbpProviderConfig;
use crate::core::provider::RateProvider;
use crate::core::rates::{BASE_CURRENCY, RateSeries, pair_name};
use crate::providers::util::with_retry;

const RETRY_DELAY_MS: u64 = 500;

/// Client for the NBP exchange rate tables (`/api/exchangerates/rates/...`).
pub struct NbpProvider {
    base_url: String,
    table: String,
    retries: usize,
    client: reqwest::Client,
}

impl NbpProvider {
    pub fn new(config: &NbpProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("nbp-rates/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(NbpProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            table: config.table.to_lowercase(),
            retries: config.retries,
            client,
        })
    }

    fn series_url(&self, code: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/api/exchangerates/rates/{}/{}/{}/{}",
            self.base_url,
            self.table,
            code,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }
}

#[derive(Deserialize, Debug)]
struct NbpSeriesResponse {
    rates: Vec<NbpRate>,
}

#[derive(Deserialize, Debug)]
struct NbpRate {
    #[serde(alias = "effectiveDate")]
    effective_date: NaiveDate,
    mid: f64,
}

#[async_trait]
impl RateProvider for NbpProvider {
    #[instrument(
        name = "NbpSeriesFetch",
        skip(self),
        fields(code = %code)
    )]
    async fn fetch_series(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries> {
        let code = code.to_uppercase();
        let url = self.series_url(&code, start, end);
        debug!("Requesting rates from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .header(ACCEPT, "application/json")
                    .send()
                    .await
            },
            self.retries,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Failed to send request for currency: {code}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency: {}",
                response.status(),
                code
            ));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for currency: {code}"))?;

        let data: NbpSeriesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", code, e))?;

        let mut series = RateSeries::new(pair_name(&code, BASE_CURRENCY));
        for rate in data.rates {
            series.push(rate.effective_date, rate.mid);
        }
        debug!(pair = %series.pair, points = series.len(), "Received NBP rates");

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> NbpProvider {
        NbpProvider::new(&NbpProviderConfig {
            base_url: format!("{}/", server.uri()),
            ..NbpProviderConfig::default()
        })
        .unwrap()
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        )
    }

    async fn create_mock_server(code: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/api/exchangerates/rates/a/{code}/2024-03-01/2024-04-30");

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_series_fetch() {
        let mock_response = r#"{
            "table": "A",
            "currency": "euro",
            "code": "EUR",
            "rates": [
                {"no": "043/A/NBP/2024", "effectiveDate": "2024-03-01", "mid": 4.3191},
                {"no": "044/A/NBP/2024", "effectiveDate": "2024-03-04", "mid": 4.3207}
            ]
        }"#;
        let mock_server = create_mock_server("EUR", 200, mock_response).await;
        let provider = provider_for(&mock_server);
        let (start, end) = window();

        let series = provider.fetch_series("eur", start, end).await.unwrap();

        assert_eq!(series.pair, "EUR/PLN");
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].currency, "EUR/PLN");
        assert_eq!(series.points[0].effective_date, start);
        assert_eq!(series.points[1].mid, 4.3207);
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = create_mock_server("XYZ", 404, "404 NotFound - Not Found").await;
        let provider = provider_for(&mock_server);
        let (start, end) = window();

        let result = provider.fetch_series("XYZ", start, end).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 404 Not Found for currency: XYZ"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"rate": []}"#;
        let mock_server = create_mock_server("USD", 200, mock_response).await;
        let provider = provider_for(&mock_server);
        let (start, end) = window();

        let result = provider.fetch_series("USD", start, end).await;

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let provider = NbpProvider::new(&NbpProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..NbpProviderConfig::default()
        })
        .unwrap();
        let (start, end) = window();

        let result = provider.fetch_series("CHF", start, end).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to send request for currency: CHF"
        );
    }
}
