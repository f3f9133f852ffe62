use crate::models::{PriceInterval, PricePeriod, PricePoint, Provider, Snapshot};
use crate::Result;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";
const HTTP_TIMEOUT_SECS: u64 = 20;
// Yahoo rejects the default reqwest user agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Client for Yahoo Finance (keyless fallback provider)
///
/// Serves three concerns: valuation snapshots via quoteSummary, company
/// names, and price history via the v8 chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    regular_market_price: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE", default)]
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    #[serde(default)]
    price_to_book: Option<RawValue>,
    #[serde(default)]
    enterprise_to_ebitda: Option<RawValue>,
}

/// Yahoo wraps numbers as {"raw": 1.23, "fmt": "1.23"}; raw may be absent
#[derive(Debug, Deserialize, Default, Clone, Copy)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn value(v: Option<RawValue>) -> Option<f64> {
        v.and_then(|r| r.raw)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize, Default)]
struct ChartQuote {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

// ============== Implementation ==============

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(YAHOO_API_BASE.to_string())
    }

    /// Client against a custom base URL (used by tests)
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client with static configuration");

        Self { client, base_url }
    }

    /// Fetch a valuation snapshot from the quoteSummary endpoint.
    ///
    /// Falls back to the latest daily close for `price` when the quote
    /// payload has no market price. Transport errors propagate; the market
    /// data gateway absorbs them into "no data".
    pub async fn fetch_snapshot(&self, ticker: &str) -> Result<Snapshot> {
        let result = self.quote_summary(ticker).await?.unwrap_or_default();

        let (price_module, name_price) = match result.price {
            Some(module) => {
                let price = RawValue::value(module.regular_market_price);
                (Some(module), price)
            }
            None => (None, None),
        };

        let mut price = name_price;
        if price.is_none() {
            price = self.latest_close(ticker).await;
        }

        Ok(Snapshot {
            price,
            pe_ttm: result
                .summary_detail
                .and_then(|d| RawValue::value(d.trailing_pe)),
            pb: result
                .default_key_statistics
                .as_ref()
                .and_then(|s| RawValue::value(s.price_to_book)),
            ev_ebitda: result
                .default_key_statistics
                .as_ref()
                .and_then(|s| RawValue::value(s.enterprise_to_ebitda)),
            market_cap: price_module.and_then(|m| RawValue::value(m.market_cap)),
            provider: Some(Provider::Yahoo),
        })
    }

    /// Best-effort human readable company name (shortName, else longName).
    pub async fn fetch_company_name(&self, ticker: &str) -> Result<Option<String>> {
        let result = self.quote_summary(ticker).await?.unwrap_or_default();

        Ok(result
            .price
            .and_then(|m| m.short_name.or(m.long_name))
            .filter(|name| !name.is_empty()))
    }

    /// Time-ordered (date, close) series for the requested lookback window.
    ///
    /// Tickers the provider does not know yield an empty series, not an
    /// error.
    pub async fn fetch_price_history(
        &self,
        ticker: &str,
        period: PricePeriod,
        interval: PriceInterval,
    ) -> Result<Vec<PricePoint>> {
        self.chart(ticker, period.as_str(), interval.as_str()).await
    }

    async fn quote_summary(&self, ticker: &str) -> Result<Option<QuoteSummaryResult>> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);

        let envelope: QuoteSummaryEnvelope = self
            .client
            .get(&url)
            .query(&[("modules", "price,summaryDetail,defaultKeyStatistics")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope
            .quote_summary
            .result
            .and_then(|mut results| results.drain(..).next()))
    }

    async fn chart(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<PricePoint>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let envelope: ChartEnvelope = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let result = match envelope.chart.result.and_then(|mut r| r.drain(..).next()) {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close)
            .unwrap_or_default();

        let mut points = Vec::with_capacity(timestamps.len());
        for (ts, close) in timestamps.into_iter().zip(closes) {
            let close = match close {
                Some(c) if c.is_finite() => c,
                _ => continue,
            };
            if let Some(moment) = DateTime::from_timestamp(ts, 0) {
                points.push(PricePoint {
                    date: moment.date_naive(),
                    close,
                });
            }
        }

        tracing::debug!(ticker, points = points.len(), "Fetched price history");

        Ok(points)
    }

    /// Latest daily close, used when the quote payload carries no price.
    async fn latest_close(&self, ticker: &str) -> Option<f64> {
        match self.chart(ticker, "5d", "1d").await {
            Ok(points) => points.last().map(|p| p.close),
            Err(e) => {
                tracing::debug!(ticker, error = %e, "Close fallback unavailable");
                None
            }
        }
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SUMMARY_BODY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "regularMarketPrice": {"raw": 231.5, "fmt": "231.50"},
                    "marketCap": {"raw": 3.5e12, "fmt": "3.5T"},
                    "shortName": "Apple Inc."
                },
                "summaryDetail": {"trailingPE": {"raw": 35.2}},
                "defaultKeyStatistics": {
                    "priceToBook": {"raw": 48.1},
                    "enterpriseToEbitda": {"raw": 26.7}
                }
            }],
            "error": null
        }
    }"#;

    #[tokio::test]
    async fn test_fetch_snapshot_maps_all_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v10/finance/quoteSummary/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.price, Some(231.5));
        assert_eq!(snapshot.pe_ttm, Some(35.2));
        assert_eq!(snapshot.pb, Some(48.1));
        assert_eq!(snapshot.ev_ebitda, Some(26.7));
        assert_eq!(snapshot.market_cap, Some(3.5e12));
        assert_eq!(snapshot.provider, Some(Provider::Yahoo));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_falls_back_to_latest_close() {
        let mut server = mockito::Server::new_async().await;
        let summary = r#"{"quoteSummary": {"result": [{"price": {"shortName": "Apple Inc."}}]}}"#;
        let chart = r#"{
            "chart": {"result": [{
                "timestamp": [1754006400, 1754092800],
                "indicators": {"quote": [{"close": [229.4, 230.1]}]}
            }]}
        }"#;

        server
            .mock("GET", "/v10/finance/quoteSummary/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(summary)
            .create_async()
            .await;
        server
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(chart)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();

        assert_eq!(snapshot.price, Some(230.1));
        assert_eq!(snapshot.pe_ttm, None);
    }

    #[tokio::test]
    async fn test_fetch_company_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v10/finance/quoteSummary/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        let name = client.fetch_company_name("AAPL").await.unwrap();

        assert_eq!(name.as_deref(), Some("Apple Inc."));
    }

    #[tokio::test]
    async fn test_price_history_skips_null_closes() {
        let mut server = mockito::Server::new_async().await;
        let chart = r#"{
            "chart": {"result": [{
                "timestamp": [1753920000, 1754006400, 1754092800],
                "indicators": {"quote": [{"close": [228.0, null, 230.1]}]}
            }]}
        }"#;
        server
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(chart)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        let points = client
            .fetch_price_history("AAPL", PricePeriod::ThreeMonths, PriceInterval::Daily)
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 228.0);
        assert_eq!(points[1].close, 230.1);
        assert!(points[0].date < points[1].date);
    }

    #[tokio::test]
    async fn test_price_history_unknown_ticker_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;
        server
            .mock("GET", "/v8/finance/chart/NOPE")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        let points = client
            .fetch_price_history("NOPE", PricePeriod::OneYear, PriceInterval::Daily)
            .await
            .unwrap();

        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_propagates_to_gateway() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v10/finance/quoteSummary/AAPL")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url());
        assert!(client.fetch_snapshot("AAPL").await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires live network access
    async fn test_fetch_snapshot_live() {
        let client = YahooClient::new();
        let snapshot = client.fetch_snapshot("AAPL").await.unwrap();
        assert!(snapshot.price.is_some());
    }
}
