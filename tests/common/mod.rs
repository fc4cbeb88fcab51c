#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use watchbot::db::{EntryUpdate, SqliteWatchStore, WatchStore};
use watchbot::notify::Notifier;
use watchbot::{EntryId, FetchError, NotifyError, PriceSource, Quote, StoreError, WatchEntry};

/// Price source answering from a fixed table; unknown symbols fail
#[derive(Default)]
pub struct FakePrices {
    quotes: Mutex<HashMap<String, Quote>>,
    calls: AtomicUsize,
}

impl FakePrices {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        let fake = Self::default();
        for (symbol, price) in prices {
            fake.set(symbol, *price, None);
        }
        fake
    }

    pub fn set(&self, symbol: &str, price: f64, previous_close: Option<f64>) {
        self.quotes.lock().unwrap().insert(
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                price,
                previous_close,
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(symbol.to_string()))
    }
}

/// Notifier that records every message and fails for chosen users
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing_users: HashSet<i64>,
}

impl RecordingNotifier {
    pub fn failing_for(users: &[i64]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_users: users.iter().copied().collect(),
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), NotifyError> {
        if self.failing_users.contains(&user_id) {
            return Err(NotifyError::Rejected {
                user_id,
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}

/// In-process watch store with switchable listing failure
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<WatchEntry>>,
    next_id: AtomicUsize,
    fail_listing: AtomicBool,
    failing_writes: Mutex<HashSet<EntryId>>,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_entries(entries: Vec<WatchEntry>) -> Self {
        let next = entries.iter().map(|e| e.id).max().unwrap_or(0) as usize;
        Self {
            entries: Mutex::new(entries),
            next_id: AtomicUsize::new(next),
            ..Default::default()
        }
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make every write-back for `id` fail
    pub fn fail_writes_for(&self, id: EntryId) {
        self.failing_writes.lock().unwrap().insert(id);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<WatchEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    async fn list_entries(&self) -> Result<Vec<WatchEntry>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.snapshot())
    }

    async fn record_sweep_result(&self, update: &EntryUpdate) -> Result<bool, StoreError> {
        if self.failing_writes.lock().unwrap().contains(&update.id) {
            return Err(StoreError::Database(sqlx::Error::WorkerCrashed));
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.id == update.id) {
            Some(entry) => {
                entry.last_price = Some(update.last_price);
                if update.clear_target.is_some() && entry.target_price == update.clear_target {
                    entry.target_price = None;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_entry(&self, user_id: i64, symbol: &str) -> Result<EntryId, StoreError> {
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1) as EntryId;
        self.entries.lock().unwrap().push(entry(id, user_id, symbol, None, None));
        Ok(id)
    }

    async fn set_target(&self, user_id: i64, symbol: &str, target: f64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let mut matched = false;
        for e in entries.iter_mut() {
            if e.user_id == user_id && e.symbol == symbol {
                e.target_price = Some(target);
                matched = true;
            }
        }
        if !matched {
            let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1) as EntryId;
            entries.push(entry(id, user_id, symbol, Some(target), None));
        }
        Ok(())
    }

    async fn remove_entries(&self, user_id: i64, symbol: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.symbol == symbol));
        Ok((before - entries.len()) as u64)
    }

    async fn entries_for_user(&self, user_id: i64) -> Result<Vec<WatchEntry>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }
}

pub fn entry(
    id: EntryId,
    user_id: i64,
    symbol: &str,
    target_price: Option<f64>,
    last_price: Option<f64>,
) -> WatchEntry {
    WatchEntry {
        id,
        user_id,
        symbol: symbol.to_string(),
        target_price,
        last_price,
    }
}

/// Insert a row with the given prices straight into SQLite
pub async fn seed(
    store: &SqliteWatchStore,
    user_id: i64,
    symbol: &str,
    target_price: Option<f64>,
    last_price: Option<f64>,
) -> EntryId {
    let id = store.add_entry(user_id, symbol).await.unwrap();
    sqlx::query("UPDATE watchlist SET target_price = ?1, last_price = ?2 WHERE rowid = ?3")
        .bind(target_price)
        .bind(last_price)
        .bind(id)
        .execute(store.pool())
        .await
        .unwrap();
    id
}

pub async fn find(store: &SqliteWatchStore, id: EntryId) -> WatchEntry {
    store
        .list_entries()
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.id == id)
        .unwrap()
}
