//! In-memory item store for tests/dev.

use async_trait::async_trait;
use stocksync_core::{Item, ItemId};
use tokio::sync::Mutex;

use super::{ItemStore, ItemStream, Snapshots};
use crate::error::{StoreError, StoreResult};

/// Volatile item store.
///
/// - No IO
/// - Same write serialization and snapshot semantics as the SQLite backend
#[derive(Debug)]
pub struct InMemoryItemStore {
    write_lock: Mutex<()>,
    snapshots: Snapshots,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `items` (later duplicates win).
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let store = Self::new();
        store.snapshots.modify(|keyed| {
            for item in items {
                keyed.insert(item.id, item);
            }
        });
        store
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self {
            write_lock: Mutex::new(()),
            snapshots: Snapshots::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    fn observe_all(&self) -> ItemStream {
        self.snapshots.subscribe()
    }

    fn snapshot(&self) -> Vec<Item> {
        self.snapshots.current()
    }

    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.snapshots.lookup(id))
    }

    async fn upsert(&self, item: Item) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        self.snapshots.modify(|keyed| {
            keyed.insert(item.id, item);
        });
        Ok(())
    }

    async fn upsert_many(&self, items: Vec<Item>) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        self.snapshots.modify(|keyed| {
            for item in items {
                keyed.insert(item.id, item);
            }
        });
        Ok(())
    }

    async fn update(&self, item: Item) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        if self.snapshots.lookup(item.id).is_none() {
            return Err(StoreError::NotFound(item.id));
        }
        self.snapshots.modify(|keyed| {
            keyed.insert(item.id, item);
        });
        Ok(())
    }

    async fn delete(&self, item: &Item) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        if self.snapshots.lookup(item.id).is_none() {
            return Ok(());
        }
        self.snapshots.modify(|keyed| {
            keyed.remove(&item.id);
        });
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        self.snapshots.modify(|keyed| keyed.clear());
        Ok(())
    }

    async fn replace_all(&self, items: Vec<Item>) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        self.snapshots.modify(|keyed| {
            keyed.clear();
            for item in items {
                keyed.insert(item.id, item);
            }
        });
        Ok(())
    }
}
