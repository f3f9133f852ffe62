// Core modules
pub mod api;
pub mod config;
pub mod db;
pub mod kelly;
pub mod market;
pub mod models;
pub mod refresh;

// Re-export commonly used types
pub use api::*;
pub use db::{SqliteStore, StorageError};
pub use market::MarketData;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
