use crate::api::{FmpClient, YahooClient};
use crate::models::{PriceInterval, PricePeriod, PricePoint, Provider, Snapshot};
use async_trait::async_trait;

/// A single snapshot-capable provider.
///
/// Sources are tried in order by the gateway; returning an error or an
/// all-empty snapshot yields to the next source.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_snapshot(&self, ticker: &str) -> crate::Result<Snapshot>;
}

#[async_trait]
impl SnapshotSource for FmpClient {
    fn name(&self) -> &'static str {
        "fmp"
    }

    async fn fetch_snapshot(&self, ticker: &str) -> crate::Result<Snapshot> {
        FmpClient::fetch_snapshot(self, ticker).await
    }
}

#[async_trait]
impl SnapshotSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_snapshot(&self, ticker: &str) -> crate::Result<Snapshot> {
        YahooClient::fetch_snapshot(self, ticker).await
    }
}

/// Market data gateway: an ordered list of snapshot sources with fallback,
/// plus company-name and price-history lookups served by Yahoo.
///
/// Provider and transport failures never leave this boundary - they are
/// logged and surfaced as absent data.
pub struct MarketData {
    sources: Vec<Box<dyn SnapshotSource>>,
    yahoo: YahooClient,
}

impl MarketData {
    /// Build the source list from the preferred provider and key presence.
    ///
    /// Without an FMP key only Yahoo is consulted, whatever the preference.
    pub fn new(preferred: Provider, fmp_api_key: Option<String>) -> Self {
        let yahoo = YahooClient::new();
        let fmp = fmp_api_key.map(FmpClient::new);

        let mut sources: Vec<Box<dyn SnapshotSource>> = Vec::new();
        match (preferred, fmp) {
            (Provider::Fmp, Some(fmp)) => {
                sources.push(Box::new(fmp));
                sources.push(Box::new(yahoo.clone()));
            }
            (Provider::Yahoo, Some(fmp)) => {
                sources.push(Box::new(yahoo.clone()));
                sources.push(Box::new(fmp));
            }
            (_, None) => {
                tracing::info!("No FMP API key configured, snapshots use Yahoo only");
                sources.push(Box::new(yahoo.clone()));
            }
        }

        Self { sources, yahoo }
    }

    /// Gateway over explicit parts (used by tests)
    pub fn from_parts(sources: Vec<Box<dyn SnapshotSource>>, yahoo: YahooClient) -> Self {
        Self { sources, yahoo }
    }

    /// Names of the configured sources, in consultation order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Valuation snapshot for a ticker.
    ///
    /// Never fails: when every source errors or has no data, all fields come
    /// back absent and callers must treat that as "unknown".
    pub async fn snapshot(&self, ticker: &str) -> Snapshot {
        for source in &self.sources {
            match source.fetch_snapshot(ticker).await {
                Ok(snapshot) => {
                    let snapshot = snapshot.sanitized();
                    if snapshot.is_empty() {
                        tracing::debug!(ticker, source = source.name(), "Source has no data");
                        continue;
                    }
                    return snapshot;
                }
                Err(e) => {
                    tracing::warn!(ticker, source = source.name(), error = %e, "Snapshot fetch failed");
                }
            }
        }

        Snapshot::default()
    }

    /// Best-effort company name; absence is not an error.
    pub async fn company_name(&self, ticker: &str) -> Option<String> {
        match self.yahoo.fetch_company_name(ticker).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(ticker, error = %e, "Company name lookup failed");
                None
            }
        }
    }

    /// Price history series; empty when the provider has no data.
    pub async fn price_history(
        &self,
        ticker: &str,
        period: PricePeriod,
        interval: PriceInterval,
    ) -> Vec<PricePoint> {
        match self.yahoo.fetch_price_history(ticker, period, interval).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Price history fetch failed");
                Vec::new()
            }
        }
    }
}
