//! Watchlist commands a user can issue.
//!
//! Each function performs one command against the store and price source
//! and returns the reply text for the user.

use anyhow::{bail, Context, Result};

use crate::api::PriceSource;
use crate::db::WatchStore;
use crate::models::normalize_symbol;

pub const NIFTY_TOP_10: &[&str] = &[
    "RELIANCE.NS",
    "TCS.NS",
    "HDFCBANK.NS",
    "ICICIBANK.NS",
    "INFY.NS",
    "SBIN.NS",
    "BHARTIARTL.NS",
    "LTIM.NS",
    "ITC.NS",
    "TITAN.NS",
];

/// Welcome text with the command menu
pub fn start() -> String {
    [
        concat!("Welcome to watchbot v", env!("CARGO_PKG_VERSION"), "."),
        "",
        "Available Commands:",
        "1. watchbot price <symbol> - Live rates",
        "2. watchbot add <user> <symbol> - Add to watchlist",
        "3. watchbot list <user> - View your saved stocks",
        "4. watchbot top - View top 10 Nifty stocks",
        "5. watchbot remove <user> <symbol> - Remove from watchlist",
        "6. watchbot guide - Help with symbols",
        "7. watchbot alert <user> <symbol> <price> - Set price target",
        "8. watchbot run - Start the alert sweep",
    ]
    .join("\n")
}

pub fn guide() -> String {
    [
        "--- BEGINNER GUIDE ---",
        "For Indian stocks, the '.NS' suffix is added automatically.",
        "Symbols containing '-' (e.g. BTC-USD) are used as typed.",
        "Example: watchbot price TATASTEEL",
        "Example: watchbot add <user> RELIANCE",
        "Example: watchbot alert <user> TCS 4200",
    ]
    .join("\n")
}

pub async fn add(store: &dyn WatchStore, user_id: i64, raw_symbol: &str) -> Result<String> {
    let symbol = normalize_symbol(raw_symbol);
    store
        .add_entry(user_id, &symbol)
        .await
        .with_context(|| format!("Failed to add {}", symbol))?;

    Ok(format!("Added {} to your permanent watchlist.", symbol))
}

/// Parse a user-supplied target price
pub fn parse_target(raw: &str) -> Result<f64> {
    let target: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a price. Usage: alert [symbol] [price]", raw))?;

    if !target.is_finite() || target <= 0.0 {
        bail!("Target price must be a positive number, got {}", raw);
    }

    Ok(target)
}

pub async fn set_alert(
    store: &dyn WatchStore,
    user_id: i64,
    raw_symbol: &str,
    raw_target: &str,
) -> Result<String> {
    let symbol = normalize_symbol(raw_symbol);
    let target = parse_target(raw_target)?;

    store
        .set_target(user_id, &symbol, target)
        .await
        .with_context(|| format!("Failed to set alert for {}", symbol))?;

    Ok(format!("Alert set for {} at Rs. {}.", symbol, target))
}

pub async fn remove(store: &dyn WatchStore, user_id: i64, raw_symbol: &str) -> Result<String> {
    let symbol = normalize_symbol(raw_symbol);
    let removed = store
        .remove_entries(user_id, &symbol)
        .await
        .with_context(|| format!("Failed to remove {}", symbol))?;

    tracing::debug!(user_id, symbol = %symbol, removed, "Removed watch entries");

    Ok(format!("Removed {} from watchlist.", symbol))
}

pub async fn watchlist(
    store: &dyn WatchStore,
    prices: &dyn PriceSource,
    user_id: i64,
) -> Result<String> {
    let entries = store
        .entries_for_user(user_id)
        .await
        .context("Failed to load watchlist")?;

    if entries.is_empty() {
        return Ok("Your watchlist is empty.".to_string());
    }

    let mut summary = String::from("--- YOUR WATCHLIST ---\n");
    for entry in &entries {
        match prices.fetch(&entry.symbol).await {
            Ok(price) => summary.push_str(&format!("{}: Rs. {:.2}\n", entry.symbol, price)),
            Err(e) => {
                tracing::warn!(symbol = %entry.symbol, error = %e, "Watchlist price lookup failed");
                summary.push_str(&format!("{}: Error\n", entry.symbol));
            }
        }
    }

    Ok(summary)
}

pub async fn price(prices: &dyn PriceSource, raw_symbol: &str) -> String {
    let symbol = normalize_symbol(raw_symbol);
    match prices.fetch(&symbol).await {
        Ok(price) => format!("Price of {}: Rs. {:.2}", symbol, price),
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "Price lookup failed");
            "Error fetching data.".to_string()
        }
    }
}

/// Day change for the largest Nifty constituents
pub async fn top(prices: &dyn PriceSource) -> String {
    let mut summary = String::from("--- TOP 10 NIFTY STOCKS ---\n\n");

    for symbol in NIFTY_TOP_10 {
        match prices.quote(symbol).await {
            Ok(quote) => {
                // Without a previous close there is nothing to compare against
                if let Some(change) = quote.change_percent() {
                    summary.push_str(&format!(
                        "{}: Rs. {:.2} ({:+.2}%)\n",
                        symbol, quote.price, change
                    ));
                }
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Top stocks lookup failed");
                summary.push_str(&format!("{}: Data unavailable\n", symbol));
            }
        }
    }

    summary
}
