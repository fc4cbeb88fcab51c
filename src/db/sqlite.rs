use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::{EntryUpdate, WatchStore};
use crate::error::StoreError;
use crate::models::{EntryId, WatchEntry};

/// SQLite-backed watch store
///
/// Every call borrows a pooled connection for one statement or one
/// transaction; the pool gets it back on every exit path.
#[derive(Clone)]
pub struct SqliteWatchStore {
    pool: SqlitePool,
}

impl SqliteWatchStore {
    /// Open (or create) the database and run migrations
    ///
    /// # Arguments
    /// * `database_url` - e.g. `sqlite://watchbot.db` or `sqlite::memory:`
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Each in-memory connection is its own database, so pin to one
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to SQLite at {}", database_url);

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::new("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<WatchEntry, sqlx::Error> {
    Ok(WatchEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        target_price: row.try_get("target_price")?,
        last_price: row.try_get("last_price")?,
    })
}

#[async_trait]
impl WatchStore for SqliteWatchStore {
    async fn list_entries(&self) -> Result<Vec<WatchEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT rowid AS id, user_id, symbol, target_price, last_price
            FROM watchlist
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Listed {} watch entries", entries.len());

        Ok(entries)
    }

    async fn record_sweep_result(&self, update: &EntryUpdate) -> Result<bool, StoreError> {
        // Single statement, so both columns change together or not at all
        let result = sqlx::query(
            r#"
            UPDATE watchlist
            SET last_price = ?1,
                target_price = CASE
                    WHEN ?2 IS NOT NULL AND target_price = ?2 THEN NULL
                    ELSE target_price
                END
            WHERE rowid = ?3
            "#,
        )
        .bind(update.last_price)
        .bind(update.clear_target)
        .bind(update.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_entry(&self, user_id: i64, symbol: &str) -> Result<EntryId, StoreError> {
        let result = sqlx::query("INSERT INTO watchlist (user_id, symbol) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        tracing::debug!(user_id, symbol, "Added watch entry");

        Ok(result.last_insert_rowid())
    }

    async fn set_target(&self, user_id: i64, symbol: &str, target: f64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE watchlist SET target_price = ?1 WHERE user_id = ?2 AND symbol = ?3",
        )
        .bind(target)
        .bind(user_id)
        .bind(symbol)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                "INSERT INTO watchlist (user_id, symbol, target_price) VALUES (?1, ?2, ?3)",
            )
            .bind(user_id)
            .bind(symbol)
            .bind(target)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(user_id, symbol, target, "Armed target price");

        Ok(())
    }

    async fn remove_entries(&self, user_id: i64, symbol: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = ?1 AND symbol = ?2")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn entries_for_user(&self, user_id: i64) -> Result<Vec<WatchEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT rowid AS id, user_id, symbol, target_price, last_price
            FROM watchlist
            WHERE user_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_list() {
        let store = SqliteWatchStore::in_memory().await.unwrap();

        let id = store.add_entry(1, "TCS.NS").await.unwrap();
        let entries = store.list_entries().await.unwrap();

        assert_eq!(
            entries,
            vec![WatchEntry {
                id,
                user_id: 1,
                symbol: "TCS.NS".to_string(),
                target_price: None,
                last_price: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicates_are_separate_rows() {
        let store = SqliteWatchStore::in_memory().await.unwrap();

        let first = store.add_entry(1, "TCS.NS").await.unwrap();
        let second = store.add_entry(1, "TCS.NS").await.unwrap();
        assert_ne!(first, second);

        store
            .record_sweep_result(&EntryUpdate {
                id: first,
                last_price: 100.0,
                clear_target: None,
            })
            .await
            .unwrap();

        let entries = store.list_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].last_price, Some(100.0));
        assert_eq!(entries[1].last_price, None);
    }

    #[tokio::test]
    async fn test_set_target_updates_or_inserts() {
        let store = SqliteWatchStore::in_memory().await.unwrap();

        // No row yet: inserts one
        store.set_target(1, "INFY.NS", 1500.0).await.unwrap();
        let entries = store.entries_for_user(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target_price, Some(1500.0));

        // Existing row: updates in place
        store.set_target(1, "INFY.NS", 1600.0).await.unwrap();
        let entries = store.entries_for_user(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target_price, Some(1600.0));
    }

    #[tokio::test]
    async fn test_record_clears_consumed_target() {
        let store = SqliteWatchStore::in_memory().await.unwrap();
        store.set_target(1, "TCS.NS", 4200.0).await.unwrap();
        let id = store.list_entries().await.unwrap()[0].id;

        let applied = store
            .record_sweep_result(&EntryUpdate {
                id,
                last_price: 4250.0,
                clear_target: Some(4200.0),
            })
            .await
            .unwrap();
        assert!(applied);

        let entry = &store.list_entries().await.unwrap()[0];
        assert_eq!(entry.target_price, None);
        assert_eq!(entry.last_price, Some(4250.0));
    }

    #[tokio::test]
    async fn test_record_keeps_target_rearmed_mid_sweep() {
        let store = SqliteWatchStore::in_memory().await.unwrap();
        store.set_target(1, "TCS.NS", 4200.0).await.unwrap();
        let id = store.list_entries().await.unwrap()[0].id;

        // User sets a new target after the sweep read the old one
        store.set_target(1, "TCS.NS", 5000.0).await.unwrap();

        store
            .record_sweep_result(&EntryUpdate {
                id,
                last_price: 4250.0,
                clear_target: Some(4200.0),
            })
            .await
            .unwrap();

        let entry = &store.list_entries().await.unwrap()[0];
        assert_eq!(entry.target_price, Some(5000.0));
        assert_eq!(entry.last_price, Some(4250.0));
    }

    #[tokio::test]
    async fn test_record_on_removed_row() {
        let store = SqliteWatchStore::in_memory().await.unwrap();
        let id = store.add_entry(1, "TCS.NS").await.unwrap();
        assert_eq!(store.remove_entries(1, "TCS.NS").await.unwrap(), 1);

        let applied = store
            .record_sweep_result(&EntryUpdate {
                id,
                last_price: 10.0,
                clear_target: None,
            })
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_entries_for_user_filters() {
        let store = SqliteWatchStore::in_memory().await.unwrap();
        store.add_entry(1, "TCS.NS").await.unwrap();
        store.add_entry(2, "INFY.NS").await.unwrap();

        let entries = store.entries_for_user(2).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symbol, "INFY.NS");
    }
}
