use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One valuation snapshot row, keyed by (ticker, asof).
///
/// Every valuation field is optional: providers may omit any of them, and
/// absence means "unknown", never zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub ticker: String,
    pub asof: NaiveDate,
    pub price: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub ev_ebitda: Option<f64>,
    pub market_cap: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A single news entry as ingested from a feed.
///
/// `published` keeps the source-reported timestamp verbatim; feeds disagree
/// on formats, so it is stored and sorted as text. `source` and `summary`
/// are empty strings when the feed omits them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub ticker: String,
    pub published: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub fetched_at: DateTime<Utc>,
}

/// Point-in-time valuation snapshot returned by a market data provider.
///
/// Each field is independently optional, and an all-empty snapshot is the
/// "no data" outcome - callers must not read absence as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub price: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub ev_ebitda: Option<f64>,
    pub market_cap: Option<f64>,
    pub provider: Option<Provider>,
}

impl Snapshot {
    /// True when every valuation field is absent.
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.pe_ttm.is_none()
            && self.pb.is_none()
            && self.ev_ebitda.is_none()
            && self.market_cap.is_none()
    }

    /// Normalize non-finite values (NaN, infinities) to absent.
    pub fn sanitized(mut self) -> Self {
        fn clean(v: Option<f64>) -> Option<f64> {
            v.filter(|x| x.is_finite())
        }
        self.price = clean(self.price);
        self.pe_ttm = clean(self.pe_ttm);
        self.pb = clean(self.pb);
        self.ev_ebitda = clean(self.ev_ebitda);
        self.market_cap = clean(self.market_cap);
        self
    }
}

/// Market data provider identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Fmp,
    Yahoo,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Fmp => "fmp",
            Provider::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (date, close) point of a price history series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Supported price-history lookback windows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PricePeriod {
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "max")]
    Max,
}

impl PricePeriod {
    /// Wire token, as understood by the chart endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePeriod::ThreeMonths => "3mo",
            PricePeriod::SixMonths => "6mo",
            PricePeriod::OneYear => "1y",
            PricePeriod::TwoYears => "2y",
            PricePeriod::FiveYears => "5y",
            PricePeriod::TenYears => "10y",
            PricePeriod::Max => "max",
        }
    }
}

impl FromStr for PricePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3mo" => Ok(PricePeriod::ThreeMonths),
            "6mo" => Ok(PricePeriod::SixMonths),
            "1y" => Ok(PricePeriod::OneYear),
            "2y" => Ok(PricePeriod::TwoYears),
            "5y" => Ok(PricePeriod::FiveYears),
            "10y" => Ok(PricePeriod::TenYears),
            "max" => Ok(PricePeriod::Max),
            other => Err(format!(
                "unknown price period '{}' (expected 3mo, 6mo, 1y, 2y, 5y, 10y or max)",
                other
            )),
        }
    }
}

impl fmt::Display for PricePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported price-history sampling intervals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PriceInterval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl PriceInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceInterval::Daily => "1d",
            PriceInterval::Weekly => "1wk",
            PriceInterval::Monthly => "1mo",
        }
    }
}

impl FromStr for PriceInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(PriceInterval::Daily),
            "1wk" => Ok(PriceInterval::Weekly),
            "1mo" => Ok(PriceInterval::Monthly),
            other => Err(format!(
                "unknown price interval '{}' (expected 1d, 1wk or 1mo)",
                other
            )),
        }
    }
}

impl fmt::Display for PriceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
