pub mod sqlite;

pub use sqlite::SqliteWatchStore;

use async_trait::async_trait;

use crate::alerts::NextState;
use crate::error::StoreError;
use crate::models::{EntryId, WatchEntry};

/// Narrow write-back of one sweep outcome.
///
/// Only the fields the sweep changed are written: `last_price` always, and
/// the target only when it was consumed. `clear_target` carries the target
/// value read at sweep start so a target re-armed in the meantime is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryUpdate {
    pub id: EntryId,
    pub last_price: f64,
    pub clear_target: Option<f64>,
}

impl EntryUpdate {
    /// Derive the write for `entry` moving to `next`
    pub fn from_transition(entry: &WatchEntry, next: &NextState) -> Self {
        let clear_target = match (entry.target_price, next.target_price) {
            (Some(old), None) => Some(old),
            _ => None,
        };

        Self {
            id: entry.id,
            last_price: next.last_price,
            clear_target,
        }
    }
}

/// Durable table of watch entries
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Consistent snapshot of every entry, in row order
    async fn list_entries(&self) -> Result<Vec<WatchEntry>, StoreError>;

    /// Apply one sweep outcome atomically. Returns false if the row is gone.
    async fn record_sweep_result(&self, update: &EntryUpdate) -> Result<bool, StoreError>;

    /// Add a row with no target and no baseline
    async fn add_entry(&self, user_id: i64, symbol: &str) -> Result<EntryId, StoreError>;

    /// Arm `target` on every (user, symbol) row, inserting one when none exists
    async fn set_target(&self, user_id: i64, symbol: &str, target: f64) -> Result<(), StoreError>;

    /// Delete every (user, symbol) row, returning how many went
    async fn remove_entries(&self, user_id: i64, symbol: &str) -> Result<u64, StoreError>;

    async fn entries_for_user(&self, user_id: i64) -> Result<Vec<WatchEntry>, StoreError>;
}
