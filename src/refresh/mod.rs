use crate::api::GoogleNewsClient;
use crate::db::{SqliteStore, StorageError};
use crate::market::MarketData;
use crate::models::Quote;
use chrono::Utc;
use std::collections::HashMap;

/// Walks the watchlist and writes fresh snapshots and news to storage.
///
/// Tickers are processed strictly sequentially. Both gateways absorb
/// provider failures into "no data", so a bad ticker or a flaky provider
/// cannot abort the rest of the cycle; only storage faults propagate.
pub struct Refresher {
    store: SqliteStore,
    market: MarketData,
    news: GoogleNewsClient,
    news_lookback_days: u32,
}

impl Refresher {
    pub fn new(
        store: SqliteStore,
        market: MarketData,
        news: GoogleNewsClient,
        news_lookback_days: u32,
    ) -> Self {
        Self {
            store,
            market,
            news,
            news_lookback_days,
        }
    }

    /// One full refresh cycle over the watchlist.
    ///
    /// Per ticker: snapshot -> upsert keyed by today's UTC date, then
    /// resolve a display name (explicit mapping, else provider lookup, else
    /// the ticker itself) and append the fetched news batch.
    pub async fn refresh_all(
        &self,
        watchlist: &[String],
        company_names: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let asof = Utc::now().date_naive();

        for ticker in watchlist {
            let snapshot = self.market.snapshot(ticker).await;
            if snapshot.is_empty() {
                tracing::warn!(ticker = %ticker, "No snapshot data from any provider");
            }

            let quote = Quote {
                ticker: ticker.clone(),
                asof,
                price: snapshot.price,
                pe_ttm: snapshot.pe_ttm,
                pb: snapshot.pb,
                ev_ebitda: snapshot.ev_ebitda,
                market_cap: snapshot.market_cap,
                updated_at: Utc::now(),
            };
            self.store.upsert_quote(&quote).await?;

            let name = match company_names.get(ticker) {
                Some(name) => name.clone(),
                None => self
                    .market
                    .company_name(ticker)
                    .await
                    .unwrap_or_else(|| ticker.clone()),
            };

            let items = self
                .news
                .fetch_news_for(ticker, Some(&name), self.news_lookback_days)
                .await;
            self.store.insert_news_batch(&items).await?;

            tracing::info!(
                ticker = %ticker,
                price = ?snapshot.price,
                news = items.len(),
                "Refreshed ticker"
            );
        }

        Ok(())
    }

    /// Read access for callers that render what a refresh produced.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }
}
