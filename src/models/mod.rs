use serde::{Deserialize, Serialize};

/// Row identifier of a watch entry.
///
/// The watchlist table has no declared key, so SQLite's implicit `rowid`
/// is what tells duplicate (user, symbol) rows apart.
pub type EntryId = i64;

/// One row binding a user to a watched instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    pub id: EntryId,
    pub user_id: i64,
    pub symbol: String,
    pub target_price: Option<f64>, // None = no target armed
    pub last_price: Option<f64>,   // None = no drop baseline yet
}

/// Current market quote for a symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
}

impl Quote {
    /// Percent change against the previous close, if known
    pub fn change_percent(&self) -> Option<f64> {
        let prev = self.previous_close?;
        if !prev.is_finite() || prev <= 0.0 {
            return None;
        }
        Some((self.price - prev) / prev * 100.0)
    }
}

/// Normalize a user-typed symbol.
///
/// Uppercases, and defaults bare tickers to the NSE by appending `.NS`.
/// Symbols with a dash (crypto pairs such as `BTC-USD`) pass through.
pub fn normalize_symbol(raw: &str) -> String {
    let symbol = raw.trim().to_uppercase();
    if !symbol.ends_with(".NS") && !symbol.contains('-') {
        format!("{}.NS", symbol)
    } else {
        symbol
    }
}
