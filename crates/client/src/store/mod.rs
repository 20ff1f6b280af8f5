//! Local Item Store: a persistent, keyed collection of items with a live view.
//!
//! Every backend funnels writes through a single async write lock and
//! publishes the resulting snapshot while still holding it, after the write
//! committed. Observers therefore only ever see whole, committed states.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use stocksync_core::{Item, ItemId};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::StoreResult;

pub use memory::InMemoryItemStore;
pub use sqlite::SqliteItemStore;

/// Live sequence of full-collection snapshots.
///
/// Yields the current snapshot first, then every later committed one. A slow
/// consumer may skip intermediate snapshots but always sees the latest.
pub type ItemStream = WatchStream<Vec<Item>>;

/// Keyed item storage shared by the engine (writer) and any number of observers.
///
/// Implementations must:
/// - serialize writes (single writer), including `replace_all`
/// - apply each operation atomically and publish one snapshot per operation
/// - never fail an insert because of an id collision (upsert semantics)
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Subscribe to the full collection.
    fn observe_all(&self) -> ItemStream;

    /// Current committed snapshot, ordered by id.
    fn snapshot(&self) -> Vec<Item>;

    /// Point lookup by id.
    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>>;

    /// Insert or replace the record sharing `item.id`.
    async fn upsert(&self, item: Item) -> StoreResult<()>;

    /// Atomic bulk upsert; observers see one combined change.
    async fn upsert_many(&self, items: Vec<Item>) -> StoreResult<()>;

    /// Replace an existing record. Fails with `StoreError::NotFound` when no
    /// record has `item.id`.
    async fn update(&self, item: Item) -> StoreResult<()>;

    /// Remove the record with `item.id`; no-op if absent.
    async fn delete(&self, item: &Item) -> StoreResult<()>;

    /// Remove every record.
    async fn clear(&self) -> StoreResult<()>;

    /// Clear and insert `items` as one transition (no observable empty state).
    async fn replace_all(&self, items: Vec<Item>) -> StoreResult<()>;
}

/// Retained last snapshot plus its subscribers.
///
/// Callers must hold their store's write lock around [`Snapshots::modify`].
#[derive(Debug)]
pub(crate) struct Snapshots {
    tx: watch::Sender<Vec<Item>>,
}

impl Snapshots {
    pub(crate) fn new(mut initial: Vec<Item>) -> Self {
        initial.sort_by_key(|item| item.id);
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn current(&self) -> Vec<Item> {
        self.tx.borrow().clone()
    }

    pub(crate) fn lookup(&self, id: ItemId) -> Option<Item> {
        self.tx.borrow().iter().find(|item| item.id == id).cloned()
    }

    pub(crate) fn subscribe(&self) -> ItemStream {
        WatchStream::new(self.tx.subscribe())
    }

    /// Apply a committed change to the retained snapshot and notify once.
    pub(crate) fn modify(&self, change: impl FnOnce(&mut BTreeMap<ItemId, Item>)) {
        let mut keyed: BTreeMap<ItemId, Item> = self
            .tx
            .borrow()
            .iter()
            .map(|item| (item.id, item.clone()))
            .collect();
        change(&mut keyed);
        self.tx.send_replace(keyed.into_values().collect());
    }
}
