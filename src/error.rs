use thiserror::Error;

/// Price source failure for a single symbol
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {symbol} failed: {source}")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("price source returned {status} for {symbol}: {body}")]
    Status {
        symbol: String,
        status: u16,
        body: String,
    },

    #[error("symbol {0} not found")]
    NotFound(String),

    #[error("malformed response for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
}

impl FetchError {
    /// Network errors, rate limiting and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Notification delivery failure
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Carries no URL: the Telegram endpoint contains the bot token
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("message to {user_id} rejected ({status}): {description}")]
    Rejected {
        user_id: i64,
        status: u16,
        description: String,
    },
}

/// Watch store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Stored data the evaluator refuses to work with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidEntry {
    #[error("stored last price {0} is not a positive finite value")]
    Baseline(f64),

    #[error("stored target price {0} is not a positive finite value")]
    Target(f64),

    #[error("fetched price {0} is not a positive finite value")]
    Price(f64),
}

/// Sweep-level failure. Per-entry failures never surface here.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to list watch entries: {0}")]
    Listing(#[source] StoreError),

    #[error("a sweep is already in progress")]
    AlreadyRunning,
}
