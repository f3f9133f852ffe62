use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::time::Duration;
use stockwatch::api::GoogleNewsClient;
use stockwatch::config::AppConfig;
use stockwatch::db::SqliteStore;
use stockwatch::kelly::{clipped_fraction, kelly_fraction, recommended_stake};
use stockwatch::market::MarketData;
use stockwatch::models::{PriceInterval, PricePeriod};
use stockwatch::refresh::Refresher;
use stockwatch::Result;

#[derive(Parser)]
#[command(name = "stockwatch", version, about = "Personal stock watchlist dashboard")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch snapshots and news for every watchlist ticker once
    Refresh,
    /// Keep refreshing on a fixed interval until interrupted
    Watch {
        /// Minutes between refresh cycles
        #[arg(long, default_value_t = 24 * 60)]
        every: u64,
    },
    /// Show the most recent stored snapshot per watchlist ticker
    Quotes,
    /// Show stored news for a ticker, newest first
    News {
        ticker: String,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Fetch and print a price history series
    History {
        ticker: String,
        /// Lookback window (3mo, 6mo, 1y, 2y, 5y, 10y, max); defaults to the
        /// configured default_price_period
        #[arg(long)]
        period: Option<String>,
        /// Sampling interval (1d, 1wk, 1mo)
        #[arg(long, default_value = "1d")]
        interval: String,
    },
    /// Kelly position-sizing calculator
    Kelly {
        /// Win probability p, in [0, 1]
        #[arg(long)]
        win_prob: f64,
        /// Average win / average loss ratio r, strictly positive
        #[arg(long)]
        win_loss_ratio: f64,
        /// Bankroll to size against
        #[arg(long)]
        bankroll: Option<f64>,
    },
}

fn setup_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "stockwatch=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    // The calculator needs no configuration or network
    if let Command::Kelly {
        win_prob,
        win_loss_ratio,
        bankroll,
    } = cli.command
    {
        return run_kelly(win_prob, win_loss_ratio, bankroll);
    }

    let cfg = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Refresh => {
            let refresher = build_refresher(&cfg).await?;
            refresher.refresh_all(&cfg.watchlist, &cfg.company_names).await?;
            tracing::info!("Refreshed {} tickers", cfg.watchlist.len());
        }
        Command::Watch { every } => {
            run_watch(&cfg, every).await?;
        }
        Command::Quotes => {
            let store = SqliteStore::open(&cfg.database_path).await?;
            print_quotes(&store, &cfg.watchlist).await?;
        }
        Command::News { ticker, limit } => {
            let store = SqliteStore::open(&cfg.database_path).await?;
            print_news(&store, &ticker.to_uppercase(), limit).await?;
        }
        Command::History {
            ticker,
            period,
            interval,
        } => {
            let period = match period {
                Some(p) => p.parse::<PricePeriod>()?,
                None => cfg.default_price_period,
            };
            let interval = interval.parse::<PriceInterval>()?;
            print_history(&cfg, &ticker.to_uppercase(), period, interval).await;
        }
        Command::Kelly { .. } => unreachable!("handled before configuration load"),
    }

    Ok(())
}

async fn build_refresher(cfg: &AppConfig) -> Result<Refresher> {
    let store = SqliteStore::open(&cfg.database_path).await?;
    let market = MarketData::new(cfg.preferred_provider, cfg.fmp_api_key.clone());
    let news = GoogleNewsClient::new(cfg.news_locale.clone());

    Ok(Refresher::new(store, market, news, cfg.news_lookback_days))
}

async fn run_watch(cfg: &AppConfig, every_minutes: u64) -> Result<()> {
    if every_minutes == 0 {
        return Err("watch interval must be at least one minute".into());
    }

    let refresher = build_refresher(cfg).await?;

    tracing::info!(
        "Watching {} tickers, refreshing every {} min (Ctrl+C to stop)",
        cfg.watchlist.len(),
        every_minutes
    );

    let mut tick = tokio::time::interval(Duration::from_secs(every_minutes * 60));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                // A failed cycle is logged and the next tick retries the
                // whole operation
                if let Err(e) = refresher.refresh_all(&cfg.watchlist, &cfg.company_names).await {
                    tracing::error!(error = %e, "Refresh cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping watch loop");
                break;
            }
        }
    }

    Ok(())
}

async fn print_quotes(store: &SqliteStore, watchlist: &[String]) -> Result<()> {
    if watchlist.is_empty() {
        println!("Watchlist is empty - add tickers to the config file.");
        return Ok(());
    }

    let rows = store.latest_quotes(watchlist).await?;
    if rows.is_empty() {
        println!("No stored snapshots yet. Run `stockwatch refresh` first.");
        return Ok(());
    }

    println!(
        "{:<8} {:<12} {:>10} {:>8} {:>8} {:>10} {:>16}  {}",
        "TICKER", "ASOF", "PRICE", "PE_TTM", "PB", "EV/EBITDA", "MKT_CAP", "UPDATED_AT"
    );

    // Rows come ordered by ticker then asof descending, so the first row of
    // each ticker group is its most recent snapshot
    let mut seen = HashSet::new();
    for quote in rows {
        if !seen.insert(quote.ticker.clone()) {
            continue;
        }
        println!(
            "{:<8} {:<12} {:>10} {:>8} {:>8} {:>10} {:>16}  {}",
            quote.ticker,
            quote.asof,
            fmt_value(quote.price, 2),
            fmt_value(quote.pe_ttm, 2),
            fmt_value(quote.pb, 2),
            fmt_value(quote.ev_ebitda, 2),
            fmt_value(quote.market_cap, 0),
            quote.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

async fn print_news(store: &SqliteStore, ticker: &str, limit: u32) -> Result<()> {
    let items = store.news_for(ticker, limit).await?;
    if items.is_empty() {
        println!("No stored news for {ticker}. Run `stockwatch refresh` first.");
        return Ok(());
    }

    for item in items {
        let source = if item.source.is_empty() {
            "unknown source"
        } else {
            item.source.as_str()
        };
        println!("{} · {}", item.published, source);
        println!("  {}", item.title);
        println!("  {}", item.url);
        if !item.summary.is_empty() {
            println!("  {}", item.summary);
        }
        println!();
    }

    Ok(())
}

async fn print_history(
    cfg: &AppConfig,
    ticker: &str,
    period: PricePeriod,
    interval: PriceInterval,
) {
    let market = MarketData::new(cfg.preferred_provider, cfg.fmp_api_key.clone());
    let points = market.price_history(ticker, period, interval).await;

    if points.is_empty() {
        println!("No history data available for {ticker} ({period}, {interval}).");
        return;
    }

    println!("{ticker} close prices ({period}, {interval}):");
    for point in points {
        println!("{}  {:>12.2}", point.date, point.close);
    }
}

fn run_kelly(win_prob: f64, win_loss_ratio: f64, bankroll: Option<f64>) -> Result<()> {
    if !(0.0..=1.0).contains(&win_prob) {
        return Err("--win-prob must be within [0, 1]".into());
    }
    if win_loss_ratio <= 0.0 {
        return Err("--win-loss-ratio must be strictly positive".into());
    }

    let raw = kelly_fraction(win_prob, win_loss_ratio);
    let clipped = clipped_fraction(win_prob, win_loss_ratio);

    println!("Kelly fraction f*:   {raw:.4}");
    println!("Clipped (f* >= 0):   {clipped:.4}");
    if raw < 0.0 {
        println!("Negative edge - do not take this bet.");
    }
    if let Some(bankroll) = bankroll {
        let stake = recommended_stake(bankroll, win_prob, win_loss_ratio);
        println!("Recommended stake:   {stake:.2}");
    }

    Ok(())
}

fn fmt_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}
