use crate::models::{NewsItem, Quote};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Storage faults that callers must know about
///
/// Provider problems never surface here; this covers genuine operational
/// failures of the local database (I/O, schema, pool).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage path error: {0}")]
    Io(#[from] std::io::Error),
}

/// SQLite persistence for quotes and news
///
/// Two tables: `quotes` keyed by (ticker, asof) with last-write-wins
/// semantics, and `news` which is append-only and deliberately unkeyed -
/// duplicate items across repeated fetches are retained.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// Parent directories are created on first use. Safe to call on every
    /// startup.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;

        tracing::info!("Opened quote store at {}", path.display());

        Ok(store)
    }

    /// In-memory store, used by tests.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                ticker TEXT NOT NULL,
                asof TEXT NOT NULL,
                price REAL,
                pe_ttm REAL,
                pb REAL,
                ev_ebitda REAL,
                market_cap REAL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (ticker, asof)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                ticker TEXT NOT NULL,
                published TEXT NOT NULL,
                source TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                summary TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write or replace the quote row keyed by (ticker, asof).
    pub async fn upsert_quote(&self, quote: &Quote) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO quotes (ticker, asof, price, pe_ttm, pb, ev_ebitda, market_cap, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ticker, asof) DO UPDATE SET
                price = excluded.price,
                pe_ttm = excluded.pe_ttm,
                pb = excluded.pb,
                ev_ebitda = excluded.ev_ebitda,
                market_cap = excluded.market_cap,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&quote.ticker)
        .bind(quote.asof)
        .bind(quote.price)
        .bind(quote.pe_ttm)
        .bind(quote.pb)
        .bind(quote.ev_ebitda)
        .bind(quote.market_cap)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(ticker = %quote.ticker, asof = %quote.asof, "Upserted quote");

        Ok(())
    }

    /// Append news rows as a single transaction. No deduplication.
    pub async fn insert_news_batch(&self, items: &[NewsItem]) -> Result<(), StorageError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO news (ticker, published, source, title, url, summary, fetched_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.ticker)
            .bind(&item.published)
            .bind(&item.source)
            .bind(&item.title)
            .bind(&item.url)
            .bind(&item.summary)
            .bind(item.fetched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Inserted {} news rows", items.len());

        Ok(())
    }

    /// All stored quote rows for the requested tickers, ordered by ticker
    /// then asof descending. Callers reduce to most-recent-per-ticker by
    /// taking the first row of each ticker group.
    pub async fn latest_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, StorageError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; tickers.len()].join(", ");
        let sql = format!(
            "SELECT ticker, asof, price, pe_ttm, pb, ev_ebitda, market_cap, updated_at \
             FROM quotes WHERE ticker IN ({placeholders}) ORDER BY ticker, asof DESC"
        );

        let mut query = sqlx::query(&sql);
        for ticker in tickers {
            query = query.bind(ticker);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in rows {
            let asof: NaiveDate = row.get("asof");
            let updated_at: DateTime<Utc> = row.get("updated_at");
            quotes.push(Quote {
                ticker: row.get("ticker"),
                asof,
                price: row.get("price"),
                pe_ttm: row.get("pe_ttm"),
                pb: row.get("pb"),
                ev_ebitda: row.get("ev_ebitda"),
                market_cap: row.get("market_cap"),
                updated_at,
            });
        }

        Ok(quotes)
    }

    /// Up to `limit` news rows for the ticker, newest first by the
    /// source-reported published string.
    pub async fn news_for(&self, ticker: &str, limit: u32) -> Result<Vec<NewsItem>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT ticker, published, source, title, url, summary, fetched_at
            FROM news WHERE ticker = ? ORDER BY published DESC LIMIT ?
            "#,
        )
        .bind(ticker)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let fetched_at: DateTime<Utc> = row.get("fetched_at");
            items.push(NewsItem {
                ticker: row.get("ticker"),
                published: row.get("published"),
                source: row.get("source"),
                title: row.get("title"),
                url: row.get("url"),
                summary: row.get("summary"),
                fetched_at,
            });
        }

        Ok(items)
    }
}
