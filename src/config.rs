use crate::api::NewsLocale;
use crate::models::{PricePeriod, Provider};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Configuration problems are fatal at startup, not recoverable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    File(#[from] config::ConfigError),
}

fn default_database_path() -> String {
    "stocks.db".to_string()
}

fn default_news_lookback_days() -> u32 {
    7
}

/// Application configuration, read from a YAML file.
///
/// The FMP API key is deliberately not a file setting: it comes from the
/// `FMP_API_KEY` environment variable (or .env), and its absence simply
/// disables that provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Ordered ticker watchlist
    #[serde(default)]
    pub watchlist: Vec<String>,

    /// Optional ticker -> display name mapping
    #[serde(default)]
    pub company_names: HashMap<String, String>,

    #[serde(default)]
    pub default_price_period: PricePeriod,

    #[serde(default)]
    pub preferred_provider: Provider,

    #[serde(default = "default_news_lookback_days")]
    pub news_lookback_days: u32,

    #[serde(default)]
    pub news_locale: NewsLocale,

    #[serde(skip)]
    pub fmp_api_key: Option<String>,
}

impl AppConfig {
    /// Load and normalize configuration from `path`.
    ///
    /// Tickers are upper-cased and blank entries dropped, both in the
    /// watchlist and in the company-name keys (the config loader also
    /// lower-cases map keys, so normalization is required for lookups to
    /// line up).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        let mut cfg: AppConfig = settings.try_deserialize()?;

        cfg.watchlist = cfg
            .watchlist
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        cfg.company_names = cfg
            .company_names
            .into_iter()
            .map(|(ticker, name)| (ticker.trim().to_uppercase(), name))
            .collect();

        cfg.fmp_api_key = std::env::var("FMP_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stockwatch-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let path = write_config(
            "full.yaml",
            r#"
database_path: data/stocks.db
watchlist:
  - aapl
  - " MSFT "
  - ""
company_names:
  AAPL: Apple Inc.
default_price_period: 5y
preferred_provider: yahoo
news_lookback_days: 14
news_locale:
  lang: ko-KR
  country: KR
"#,
        );

        let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.database_path, "data/stocks.db");
        assert_eq!(cfg.watchlist, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(cfg.company_names.get("AAPL").unwrap(), "Apple Inc.");
        assert_eq!(cfg.default_price_period, PricePeriod::FiveYears);
        assert_eq!(cfg.preferred_provider, Provider::Yahoo);
        assert_eq!(cfg.news_lookback_days, 14);
        assert_eq!(cfg.news_locale.lang, "ko-KR");
    }

    #[test]
    fn test_defaults_for_minimal_config() {
        let path = write_config("minimal.yaml", "watchlist: [AAPL]\n");

        let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.database_path, "stocks.db");
        assert_eq!(cfg.default_price_period, PricePeriod::OneYear);
        assert_eq!(cfg.preferred_provider, Provider::Fmp);
        assert_eq!(cfg.news_lookback_days, 7);
        assert_eq!(cfg.news_locale.lang, "en-US");
        assert!(cfg.company_names.is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(AppConfig::load("/nonexistent/stockwatch.yaml").is_err());
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let path = write_config("broken.yaml", "watchlist: {this is: [not, right\n");
        assert!(AppConfig::load(path.to_str().unwrap()).is_err());
    }
}
