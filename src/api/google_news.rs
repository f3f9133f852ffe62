use crate::models::NewsItem;
use crate::Result;
use chrono::Utc;
use reqwest::Client;
use rss::Channel;
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_NEWS_BASE: &str = "https://news.google.com";
const HTTP_TIMEOUT_SECS: u64 = 20;

/// Feed locale for the news search (language + edition country)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsLocale {
    pub lang: String,
    pub country: String,
}

impl NewsLocale {
    /// Edition id, e.g. "US:en-US"
    fn ceid(&self) -> String {
        format!("{}:{}", self.country, self.lang)
    }
}

impl Default for NewsLocale {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            country: "US".to_string(),
        }
    }
}

/// Client for the Google News RSS search feed
///
/// Failure policy: an unreachable feed, a non-success status or an
/// unparseable payload all map to an empty list - news is best-effort and
/// never fails a refresh.
#[derive(Clone)]
pub struct GoogleNewsClient {
    client: Client,
    base_url: String,
    locale: NewsLocale,
}

impl GoogleNewsClient {
    pub fn new(locale: NewsLocale) -> Self {
        Self::with_base_url(GOOGLE_NEWS_BASE.to_string(), locale)
    }

    /// Client against a custom base URL (used by tests)
    pub fn with_base_url(base_url: String, locale: NewsLocale) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("reqwest client with static configuration");

        Self {
            client,
            base_url,
            locale,
        }
    }

    /// Fetch recent news for a ticker, newest entries as the feed reports
    /// them.
    ///
    /// The query combines the display name (or the ticker when no name is
    /// known) with the ticker, restricted to the last `lookback_days` days.
    pub async fn fetch_news_for(
        &self,
        ticker: &str,
        company_name: Option<&str>,
        lookback_days: u32,
    ) -> Vec<NewsItem> {
        match self.fetch_feed(ticker, company_name, lookback_days).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(ticker, error = %e, "News feed unavailable, returning no items");
                Vec::new()
            }
        }
    }

    async fn fetch_feed(
        &self,
        ticker: &str,
        company_name: Option<&str>,
        lookback_days: u32,
    ) -> Result<Vec<NewsItem>> {
        let name = company_name.filter(|n| !n.is_empty()).unwrap_or(ticker);
        let query = format!("{name} OR {ticker} when:{lookback_days}d");
        let url = format!("{}/rss/search", self.base_url);

        let body = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("hl", self.locale.lang.as_str()),
                ("gl", self.locale.country.as_str()),
                ("ceid", self.locale.ceid().as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let channel = Channel::read_from(&body[..])?;
        let fetched_at = Utc::now();
        let fetched_at_text = fetched_at.format("%Y-%m-%d %H:%M:%S").to_string();

        let items = channel
            .items()
            .iter()
            .map(|item| {
                // pubDate, else a Dublin Core date, else the fetch time
                let published = item
                    .pub_date()
                    .map(str::to_string)
                    .or_else(|| {
                        item.dublin_core_ext()
                            .and_then(|dc| dc.dates().first().cloned())
                    })
                    .unwrap_or_else(|| fetched_at_text.clone());

                let source = item
                    .source()
                    .map(|s| {
                        s.title()
                            .map(str::to_string)
                            .unwrap_or_else(|| s.url().to_string())
                    })
                    .unwrap_or_default();

                NewsItem {
                    ticker: ticker.to_string(),
                    published,
                    source,
                    title: item.title().unwrap_or_default().to_string(),
                    url: item.link().unwrap_or_default().to_string(),
                    summary: item.description().unwrap_or_default().to_string(),
                    fetched_at,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(ticker, items = items.len(), "Fetched news feed");

        Ok(items)
    }
}
