//! SQLite-backed item store (durable, one file per device).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use stocksync_core::{Item, ItemId};
use tokio::sync::Mutex;

use super::{ItemStore, ItemStream, Snapshots};
use crate::error::{StoreError, StoreResult};

/// Persisted row; mirrors the wire shape column for column.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    item_name: String,
    stock: i64,
    unit: String,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            StoreError::Corrupt(format!("item {}: stock {} out of range", row.id, row.stock))
        })?;
        Item::new(ItemId::new(row.id), row.item_name, stock, row.unit)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

/// SQLite item store.
///
/// Writes are serialized through `write_lock`; bulk operations run inside one
/// transaction so a dropped or failed write leaves the table untouched.
#[derive(Debug)]
pub struct SqliteItemStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    snapshots: Snapshots,
}

impl SqliteItemStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("failed to create store directory at {parent:?}: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        tracing::debug!(path = ?path, "opened item store");
        Self::init(pool).await
    }

    /// Open the per-device database: `{data_dir}/stocksync/inventory.db`.
    pub async fn open_default() -> StoreResult<Self> {
        Self::open(default_db_path()?).await
    }

    /// Private in-memory database; one connection so every query sees the same data.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    /// Wait for in-flight connections to return, then close the pool.
    ///
    /// Any transaction abandoned mid-write is rolled back first.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id        INTEGER PRIMARY KEY,
                item_name TEXT NOT NULL,
                stock     INTEGER NOT NULL,
                unit      TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let rows: Vec<ItemRow> =
            sqlx::query_as("SELECT id, item_name, stock, unit FROM items ORDER BY id")
                .fetch_all(&pool)
                .await?;
        let items = rows
            .into_iter()
            .map(Item::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
            snapshots: Snapshots::new(items),
        })
    }
}

async fn upsert_row(tx: &mut Transaction<'_, Sqlite>, item: &Item) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO items (id, item_name, stock, unit)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id)
        DO UPDATE SET
            item_name = excluded.item_name,
            stock = excluded.stock,
            unit = excluded.unit
        "#,
    )
    .bind(item.id.get())
    .bind(&item.name)
    .bind(i64::from(item.stock))
    .bind(&item.unit)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    fn observe_all(&self) -> ItemStream {
        self.snapshots.subscribe()
    }

    fn snapshot(&self) -> Vec<Item> {
        self.snapshots.current()
    }

    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT id, item_name, stock, unit FROM items WHERE id = ?1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Item::try_from).transpose()
    }

    async fn upsert(&self, item: Item) -> StoreResult<()> {
        self.upsert_many(vec![item]).await
    }

    async fn upsert_many(&self, items: Vec<Item>) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        for item in &items {
            upsert_row(&mut tx, item).await?;
        }
        tx.commit().await?;

        tracing::debug!(count = items.len(), "upserted items");
        self.snapshots.modify(|keyed| {
            for item in items {
                keyed.insert(item.id, item);
            }
        });
        Ok(())
    }

    async fn update(&self, item: Item) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE items
            SET item_name = ?2,
                stock = ?3,
                unit = ?4
            WHERE id = ?1
            "#,
        )
        .bind(item.id.get())
        .bind(&item.name)
        .bind(i64::from(item.stock))
        .bind(&item.unit)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(item.id));
        }

        tracing::debug!(id = %item.id, "updated item");
        self.snapshots.modify(|keyed| {
            keyed.insert(item.id, item);
        });
        Ok(())
    }

    async fn delete(&self, item: &Item) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(item.id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %item.id, "deleted item");
            self.snapshots.modify(|keyed| {
                keyed.remove(&item.id);
            });
        }
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        sqlx::query("DELETE FROM items").execute(&self.pool).await?;
        self.snapshots.modify(|keyed| keyed.clear());
        Ok(())
    }

    async fn replace_all(&self, items: Vec<Item>) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM items").execute(&mut *tx).await?;
        for item in &items {
            upsert_row(&mut tx, item).await?;
        }
        tx.commit().await?;

        tracing::debug!(count = items.len(), "replaced all items");
        self.snapshots.modify(|keyed| {
            keyed.clear();
            for item in items {
                keyed.insert(item.id, item);
            }
        });
        Ok(())
    }
}

/// Resolve the path to the SQLite database:
/// `{app_data_dir}/stocksync/inventory.db`.
pub fn default_db_path() -> StoreResult<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or_else(|| {
            StoreError::Io(
                "failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share"
                    .to_string(),
            )
        })?;

    let mut path = base;
    path.push("stocksync");
    path.push("inventory.db");
    Ok(path)
}
