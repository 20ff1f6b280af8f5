//! Task scope binding engine operations to the lifetime of their owner.
//!
//! A screen (or any consuming component) owns one `SyncSession`. Operations
//! are spawned fire-and-forget; their outcome is read from the projection.
//! Dropping the session abandons whatever is still in flight.

use std::sync::{Mutex, PoisonError};

use stocksync_core::Item;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::engine::SyncEngine;
use crate::projection::ItemsState;
use crate::types::AuthToken;

pub struct SyncSession {
    engine: SyncEngine,
    tasks: Mutex<JoinSet<()>>,
}

impl SyncSession {
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            engine,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn subscribe(&self) -> watch::Receiver<ItemsState> {
        self.engine.subscribe()
    }

    pub fn refresh(&self, token: AuthToken) {
        let engine = self.engine.clone();
        self.spawn(async move {
            // Errors are already in the projection.
            let _ = engine.refresh(&token).await;
        });
    }

    pub fn create(&self, item: Item) {
        let engine = self.engine.clone();
        self.spawn(async move {
            let _ = engine.create(item).await;
        });
    }

    pub fn modify(&self, item: Item) {
        let engine = self.engine.clone();
        self.spawn(async move {
            let _ = engine.modify(item).await;
        });
    }

    pub fn remove(&self, item: Item) {
        let engine = self.engine.clone();
        self.spawn(async move {
            let _ = engine.remove(&item).await;
        });
    }

    /// Number of spawned operations not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Wait for every operation spawned so far.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *self.lock_tasks());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!(error = %e, "sync task panicked");
                }
            }
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock_tasks();
        // Reap finished tasks so the set does not grow unbounded.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(work);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        let tasks = self.lock_tasks();
        if !tasks.is_empty() {
            tracing::debug!(in_flight = tasks.len(), "abandoning sync tasks");
        }
        // JoinSet aborts its tasks when dropped.
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use stocksync_core::ItemId;

    use super::*;
    use crate::error::RemoteError;
    use crate::remote::ItemSource;
    use crate::store::{InMemoryItemStore, ItemStore};
    use crate::types::ItemBatch;

    fn item(id: i64, name: &str) -> Item {
        Item::new(ItemId::new(id), name, 2, "kg").unwrap()
    }

    struct SlowSource(Duration);

    #[async_trait]
    impl ItemSource for SlowSource {
        async fn fetch_all(&self, _token: &AuthToken) -> Result<ItemBatch, RemoteError> {
            tokio::time::sleep(self.0).await;
            Ok(ItemBatch::success(vec![item(10, "remote")]))
        }
    }

    #[tokio::test]
    async fn spawned_operations_land_in_projection() {
        let store = Arc::new(InMemoryItemStore::new());
        let engine = SyncEngine::new(store.clone(), Arc::new(SlowSource(Duration::ZERO)));
        let session = SyncSession::new(engine);

        session.create(item(1, "A"));
        session.create(item(2, "B"));
        session.settle().await;

        let state = session.engine().state();
        assert_eq!(state.items.len(), 2);
        assert!(!state.loading);
        assert_eq!(session.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_abandons_refresh() {
        let store = Arc::new(InMemoryItemStore::with_items([item(1, "local")]));
        let engine = SyncEngine::new(store.clone(), Arc::new(SlowSource(Duration::from_secs(5))));
        let session = SyncSession::new(engine.clone());

        session.refresh(AuthToken::new("t"));
        tokio::task::yield_now().await;
        assert!(engine.state().loading);

        drop(session);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.snapshot(), vec![item(1, "local")]);
        assert!(!engine.state().loading);
    }
}
