use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use watchbot::api::{PriceSource, YahooFinanceClient};
use watchbot::commands;
use watchbot::config::Settings;
use watchbot::db::SqliteWatchStore;
use watchbot::engine::{ReconciliationJob, Scheduler};
use watchbot::notify::{LogNotifier, Notifier, TelegramNotifier};

#[derive(Parser)]
#[command(name = "watchbot", version, about = "Watchlist price alert service")]
struct Cli {
    /// Path to a TOML settings file (defaults to ./watchbot.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log alerts instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the alert sweep on its schedule until Ctrl+C
    Run,
    /// Run a single sweep now
    Sweep,
    /// Add a symbol to a user's watchlist
    Add { user_id: i64, symbol: String },
    /// Set a target price alert
    Alert {
        user_id: i64,
        symbol: String,
        price: String,
    },
    /// Remove a symbol from a user's watchlist
    Remove { user_id: i64, symbol: String },
    /// Show a user's watchlist with live prices
    List { user_id: i64 },
    /// Show the live price of a symbol
    Price { symbol: String },
    /// Day performance of the top 10 Nifty stocks
    Top,
    /// Help with symbols
    Guide,
    /// Welcome message with the command menu
    Start,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    setup_logging(&settings.log_filter);

    match cli.command {
        Command::Run => run_service(&settings, cli.dry_run).await,
        Command::Sweep => {
            let job = build_job(&settings, cli.dry_run).await?;
            let report = job.run_sweep().await?;
            println!("{}", report);
            Ok(())
        }
        Command::Add { user_id, symbol } => {
            let store = open_store(&settings).await?;
            println!("{}", commands::add(&store, user_id, &symbol).await?);
            Ok(())
        }
        Command::Alert {
            user_id,
            symbol,
            price,
        } => {
            let store = open_store(&settings).await?;
            println!(
                "{}",
                commands::set_alert(&store, user_id, &symbol, &price).await?
            );
            Ok(())
        }
        Command::Remove { user_id, symbol } => {
            let store = open_store(&settings).await?;
            println!("{}", commands::remove(&store, user_id, &symbol).await?);
            Ok(())
        }
        Command::List { user_id } => {
            let store = open_store(&settings).await?;
            let prices = YahooFinanceClient::new(&settings.price_source)?;
            println!("{}", commands::watchlist(&store, &prices, user_id).await?);
            Ok(())
        }
        Command::Price { symbol } => {
            let prices = YahooFinanceClient::new(&settings.price_source)?;
            println!("{}", commands::price(&prices, &symbol).await);
            Ok(())
        }
        Command::Top => {
            let prices = YahooFinanceClient::new(&settings.price_source)?;
            println!("{}", commands::top(&prices).await);
            Ok(())
        }
        Command::Guide => {
            println!("{}", commands::guide());
            Ok(())
        }
        Command::Start => {
            println!("{}", commands::start());
            Ok(())
        }
    }
}

// ============================================================================
// Initialization Functions
// ============================================================================

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_store(settings: &Settings) -> Result<SqliteWatchStore> {
    SqliteWatchStore::new(&settings.database_url)
        .await
        .with_context(|| format!("Failed to open watch store at {}", settings.database_url))
}

fn create_notifier(settings: &Settings, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        tracing::info!("Dry run: alerts will be logged, not sent");
        return Ok(Arc::new(LogNotifier));
    }
    Ok(Arc::new(TelegramNotifier::from_config(&settings.telegram)?))
}

async fn build_job(settings: &Settings, dry_run: bool) -> Result<ReconciliationJob> {
    let notifier = create_notifier(settings, dry_run)?;
    let store = Arc::new(open_store(settings).await?);
    let prices: Arc<dyn PriceSource> =
        Arc::new(YahooFinanceClient::new(&settings.price_source)?);

    Ok(ReconciliationJob::new(
        store,
        prices,
        notifier,
        settings.alerts.clone(),
    ))
}

// ============================================================================
// Service Loop
// ============================================================================

async fn run_service(settings: &Settings, dry_run: bool) -> Result<()> {
    tracing::info!("🚀 watchbot starting");

    let job = build_job(settings, dry_run).await?;
    let scheduler = Scheduler::from_config(&settings.schedule);

    tracing::info!("📊 Configuration:");
    tracing::info!("  Database: {}", settings.database_url);
    tracing::info!("  Sweep interval: {}s", settings.schedule.interval_secs);
    tracing::info!("  First sweep in: {}s", settings.schedule.initial_delay_secs);
    tracing::info!("  Drop threshold: {}%", settings.alerts.drop_threshold_pct);
    tracing::info!("\nPress Ctrl+C to stop...\n");

    let sweeps = scheduler
        .run_until(&job, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        })
        .await;

    tracing::info!("👋 watchbot stopped after {} sweeps", sweeps);
    Ok(())
}
