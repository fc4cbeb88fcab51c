// Core modules
pub mod alerts;
pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;

// Re-export commonly used types
pub use alerts::{evaluate, Alert, AlertRules, Evaluation, NextState};
pub use api::PriceSource;
pub use db::{EntryUpdate, WatchStore};
pub use engine::{ReconciliationJob, Scheduler, SweepReport};
pub use error::{FetchError, InvalidEntry, NotifyError, StoreError, SweepError};
pub use models::*;
pub use notify::Notifier;
