//! Synchronization Engine: reconciles the remote item list with the local store.
//!
//! - `refresh` is a full replace and all-or-nothing: on any failure the store
//!   and the projected items are left exactly as they were.
//! - `create` / `modify` / `remove` are local-only mutations.
//! - Every operation raises the loading flag for its whole duration and
//!   records its error text in the projection.
//!
//! Concurrent refreshes are not de-duplicated: each proceeds independently and
//! the one whose response is written last determines the store contents.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stocksync_core::Item;
use tokio::sync::watch;

use crate::error::{RemoteError, SyncError};
use crate::projection::{EnginePhase, ItemsState, OperationKind, Projection};
use crate::remote::{Authenticator, ItemSource};
use crate::store::{ItemStore, ItemStream};
use crate::types::{AuthToken, ConnectivityState, Credentials};

/// Tunables of the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound for one remote fetch; exceeding it is a transport failure.
    pub fetch_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates refreshes and local mutations.
///
/// Cheap to clone; clones share the store, source and projection.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn ItemStore>,
    source: Arc<dyn ItemSource>,
    projection: Arc<Projection>,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ItemStore>, source: Arc<dyn ItemSource>) -> Self {
        Self::with_options(store, source, EngineOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn ItemStore>,
        source: Arc<dyn ItemSource>,
        options: EngineOptions,
    ) -> Self {
        let projection = Arc::new(Projection::new(store.snapshot()));
        Self {
            inner: Arc::new(Inner {
                store,
                source,
                projection,
                options,
            }),
        }
    }

    /// Receiver of every projected state change.
    pub fn subscribe(&self) -> watch::Receiver<ItemsState> {
        self.inner.projection.subscribe()
    }

    /// Current projected state.
    pub fn state(&self) -> ItemsState {
        self.inner.projection.current()
    }

    pub fn phase(&self) -> EnginePhase {
        self.inner.projection.phase()
    }

    /// Live view straight from the store.
    pub fn observe_items(&self) -> ItemStream {
        self.inner.store.observe_all()
    }

    /// Dismiss the last surfaced error.
    pub fn clear_error(&self) {
        self.inner.projection.update(|state| state.last_error = None);
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Reported as `EnginePhase::Refreshing` while in flight (network-bound).
    pub async fn login(
        &self,
        authenticator: &dyn Authenticator,
        credentials: &Credentials,
    ) -> Result<AuthToken, SyncError> {
        let _loading = self.inner.projection.begin(OperationKind::Refresh);
        let result = authenticator.login(credentials).await;
        self.note_connectivity(&result);
        result.map_err(|e| self.surface("login", e.into()))
    }

    /// Replace the local store with the remote item list.
    ///
    /// Returns the number of items now stored.
    pub async fn refresh(&self, token: &AuthToken) -> Result<usize, SyncError> {
        let _loading = self.inner.projection.begin(OperationKind::Refresh);
        tracing::info!("refreshing items from remote");

        let timeout = self.inner.options.fetch_timeout;
        let fetched = tokio::time::timeout(timeout, self.inner.source.fetch_all(token))
            .await
            .unwrap_or_else(|_| {
                Err(RemoteError::TransportFailure(format!(
                    "request timed out after {timeout:?}"
                )))
            });
        self.note_connectivity(&fetched);

        let items = match fetched.and_then(|batch| batch.into_items()) {
            Ok(items) => items,
            Err(e) => return Err(self.surface("refresh", e.into())),
        };

        let count = items.len();
        if let Err(e) = self.inner.store.replace_all(items).await {
            return Err(self.surface("refresh", e.into()));
        }

        let store = &self.inner.store;
        self.inner.projection.update(|state| {
            state.items = store.snapshot();
            state.last_refreshed_at = Some(Utc::now());
        });
        tracing::info!(count, "refresh applied");
        Ok(count)
    }

    /// Add a locally created item (an existing id is replaced).
    pub async fn create(&self, item: Item) -> Result<(), SyncError> {
        let _loading = self.inner.projection.begin(OperationKind::Mutation);
        tracing::debug!(id = %item.id, name = %item.name, "creating item");

        let result = match item.validate() {
            Ok(()) => self.inner.store.upsert(item).await.map_err(SyncError::from),
            Err(e) => Err(e.into()),
        };
        self.settle_mutation("create", result)
    }

    /// Replace an existing item; fails with `StoreError::NotFound` if absent.
    pub async fn modify(&self, item: Item) -> Result<(), SyncError> {
        let _loading = self.inner.projection.begin(OperationKind::Mutation);
        tracing::debug!(id = %item.id, name = %item.name, "modifying item");

        let result = match item.validate() {
            Ok(()) => self.inner.store.update(item).await.map_err(SyncError::from),
            Err(e) => Err(e.into()),
        };
        self.settle_mutation("modify", result)
    }

    /// Remove an item; removing an absent item succeeds.
    pub async fn remove(&self, item: &Item) -> Result<(), SyncError> {
        let _loading = self.inner.projection.begin(OperationKind::Mutation);
        tracing::debug!(id = %item.id, name = %item.name, "removing item");

        let result = self.inner.store.delete(item).await.map_err(SyncError::from);
        self.settle_mutation("remove", result)
    }

    fn settle_mutation(&self, operation: &str, result: Result<(), SyncError>) -> Result<(), SyncError> {
        match result {
            Ok(()) => {
                let store = &self.inner.store;
                self.inner
                    .projection
                    .update(|state| state.items = store.snapshot());
                Ok(())
            }
            Err(e) => Err(self.surface(operation, e)),
        }
    }

    /// Record a failure in the projection and hand it back to the caller.
    fn surface(&self, operation: &str, err: SyncError) -> SyncError {
        tracing::warn!(operation, error = %err, "operation failed");
        let message = err.to_string();
        self.inner
            .projection
            .update(|state| state.last_error = Some(message));
        err
    }

    fn note_connectivity<T>(&self, outcome: &Result<T, RemoteError>) {
        let connectivity = match outcome {
            Err(RemoteError::TransportFailure(_)) => ConnectivityState::Offline,
            _ => ConnectivityState::Online,
        };
        self.inner
            .projection
            .update(|state| state.connectivity = connectivity);
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("options", &self.inner.options)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
