pub mod fmp;
pub mod google_news;
pub mod yahoo;

pub use fmp::FmpClient;
pub use google_news::{GoogleNewsClient, NewsLocale};
pub use yahoo::YahooClient;
