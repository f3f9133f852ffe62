use crate::models::{Provider, Snapshot};
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const FMP_API_BASE: &str = "https://financialmodelingprep.com/api/v3";
const HTTP_TIMEOUT_SECS: u64 = 20;

/// Client for Financial Modeling Prep (keyed primary provider)
///
/// Two calls per snapshot: /quote for price, P/E and market cap, and
/// /key-metrics-ttm for price-to-book and EV/EBITDA.
#[derive(Clone)]
pub struct FmpClient {
    client: Client,
    api_key: String,
    base_url: String,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct FmpQuote {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    pe: Option<f64>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct FmpKeyMetrics {
    #[serde(rename = "pbRatio", alias = "pbRatioTTM", default)]
    pb_ratio: Option<f64>,
    #[serde(
        rename = "enterpriseValueOverEBITDA",
        alias = "enterpriseValueOverEBITDATTM",
        default
    )]
    ev_over_ebitda: Option<f64>,
}

// ============== Implementation ==============

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, FMP_API_BASE.to_string())
    }

    /// Client against a custom base URL (used by tests)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("reqwest client with static configuration");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Fetch a valuation snapshot.
    ///
    /// An unknown ticker yields an empty /quote array and therefore an empty
    /// snapshot, which lets the gateway fall through to the next source.
    /// Transport errors propagate; the gateway absorbs them.
    pub async fn fetch_snapshot(&self, ticker: &str) -> Result<Snapshot> {
        let quotes: Vec<FmpQuote> = self.get_json(&format!("quote/{ticker}")).await?;
        let quote = match quotes.into_iter().next() {
            Some(quote) => quote,
            None => return Ok(Snapshot::default()),
        };

        let metrics: Vec<FmpKeyMetrics> = self.get_json(&format!("key-metrics-ttm/{ticker}")).await?;
        let metrics = metrics.into_iter().next().unwrap_or_default();

        Ok(Snapshot {
            price: quote.price,
            pe_ttm: quote.pe,
            pb: metrics.pb_ratio,
            ev_ebitda: metrics.ev_over_ebitda,
            market_cap: quote.market_cap,
            provider: Some(Provider::Fmp),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);

        let value = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_snapshot_maps_both_endpoints() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote/AAPL")
            .match_query(Matcher::UrlEncoded("apikey".into(), "demo".into()))
            .with_status(200)
            .with_body(r#"[{"symbol": "AAPL", "price": 231.5, "pe": 35.2, "marketCap": 3.5e12}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/key-metrics-ttm/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"pbRatio": 48.1, "enterpriseValueOverEBITDA": 26.7}]"#)
            .create_async()
            .await;

        let client = FmpClient::with_base_url("demo".to_string(), server.url());
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();

        assert_eq!(snapshot.price, Some(231.5));
        assert_eq!(snapshot.pe_ttm, Some(35.2));
        assert_eq!(snapshot.pb, Some(48.1));
        assert_eq!(snapshot.ev_ebitda, Some(26.7));
        assert_eq!(snapshot.market_cap, Some(3.5e12));
        assert_eq!(snapshot.provider, Some(Provider::Fmp));
    }

    #[tokio::test]
    async fn test_ttm_suffixed_metric_names_are_accepted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"price": 231.5}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/key-metrics-ttm/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"pbRatioTTM": 48.1, "enterpriseValueOverEBITDATTM": 26.7}]"#)
            .create_async()
            .await;

        let client = FmpClient::with_base_url("demo".to_string(), server.url());
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();

        assert_eq!(snapshot.pb, Some(48.1));
        assert_eq!(snapshot.ev_ebitda, Some(26.7));
    }

    #[tokio::test]
    async fn test_unknown_ticker_yields_empty_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote/NOPE")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = FmpClient::with_base_url("demo".to_string(), server.url());
        let snapshot = client.fetch_snapshot("NOPE").await.unwrap();

        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_missing_metrics_leave_fields_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"price": 231.5}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/key-metrics-ttm/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = FmpClient::with_base_url("demo".to_string(), server.url());
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();

        assert_eq!(snapshot.price, Some(231.5));
        assert_eq!(snapshot.pb, None);
        assert_eq!(snapshot.ev_ebitda, None);
    }

    #[tokio::test]
    async fn test_http_error_propagates_to_gateway() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote/AAPL")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"Error Message": "Invalid API KEY"}"#)
            .create_async()
            .await;

        let client = FmpClient::with_base_url("bad-key".to_string(), server.url());
        assert!(client.fetch_snapshot("AAPL").await.is_err());
    }
}
