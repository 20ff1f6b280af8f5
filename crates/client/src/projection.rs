//! State Projection: the observable `{items, loading, last_error}` aggregate.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use stocksync_core::Item;
use tokio::sync::watch;

use crate::types::ConnectivityState;

/// What the presentation layer renders. Written only by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsState {
    pub items: Vec<Item>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub connectivity: ConnectivityState,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Coarse engine state derived from in-flight operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Refreshing,
    Mutating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Refresh,
    Mutation,
}

#[derive(Debug, Default)]
struct Activity {
    refreshing: usize,
    mutating: usize,
}

impl Activity {
    fn in_flight(&self) -> usize {
        self.refreshing + self.mutating
    }

    fn counter(&mut self, kind: OperationKind) -> &mut usize {
        match kind {
            OperationKind::Refresh => &mut self.refreshing,
            OperationKind::Mutation => &mut self.mutating,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Projection {
    tx: watch::Sender<ItemsState>,
    activity: Mutex<Activity>,
}

impl Projection {
    pub(crate) fn new(items: Vec<Item>) -> Self {
        let (tx, _rx) = watch::channel(ItemsState {
            items,
            ..ItemsState::default()
        });
        Self {
            tx,
            activity: Mutex::new(Activity::default()),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ItemsState> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> ItemsState {
        self.tx.borrow().clone()
    }

    pub(crate) fn phase(&self) -> EnginePhase {
        let activity = self.activity.lock().unwrap_or_else(PoisonError::into_inner);
        if activity.refreshing > 0 {
            EnginePhase::Refreshing
        } else if activity.mutating > 0 {
            EnginePhase::Mutating
        } else {
            EnginePhase::Idle
        }
    }

    /// Apply `change` under the channel's write lock.
    ///
    /// Reads done inside `change` are ordered with every other update, so a
    /// store snapshot taken there can never overwrite a newer one.
    pub(crate) fn update(&self, change: impl FnOnce(&mut ItemsState)) {
        self.tx.send_modify(change);
    }

    /// Raise the loading flag until the returned guard drops.
    pub(crate) fn begin(self: &Arc<Self>, kind: OperationKind) -> LoadingGuard {
        self.adjust(kind, |n| *n += 1);
        LoadingGuard {
            projection: Arc::clone(self),
            kind,
        }
    }

    fn adjust(&self, kind: OperationKind, step: impl FnOnce(&mut usize)) {
        let mut activity = self.activity.lock().unwrap_or_else(PoisonError::into_inner);
        step(activity.counter(kind));
        let loading = activity.in_flight() > 0;
        // Published under the activity lock so concurrent guards cannot reorder.
        self.tx.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }
}

/// Scoped loading indicator.
///
/// Dropping it (normal return, `?` early exit, panic unwinding or task abort)
/// lowers the flag once no other operation is in flight.
#[derive(Debug)]
pub(crate) struct LoadingGuard {
    projection: Arc<Projection>,
    kind: OperationKind,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.projection
            .adjust(self.kind, |n| *n = n.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_follows_guards() {
        let projection = Arc::new(Projection::new(Vec::new()));
        assert!(!projection.current().loading);
        assert_eq!(projection.phase(), EnginePhase::Idle);

        let refresh = projection.begin(OperationKind::Refresh);
        let mutation = projection.begin(OperationKind::Mutation);
        assert!(projection.current().loading);
        assert_eq!(projection.phase(), EnginePhase::Refreshing);

        drop(refresh);
        assert!(projection.current().loading);
        assert_eq!(projection.phase(), EnginePhase::Mutating);

        drop(mutation);
        assert!(!projection.current().loading);
        assert_eq!(projection.phase(), EnginePhase::Idle);
    }

    #[test]
    fn guard_released_on_early_return() {
        fn failing(projection: &Arc<Projection>) -> Result<(), &'static str> {
            let _loading = projection.begin(OperationKind::Mutation);
            let outcome: Result<(), &'static str> = Err("boom");
            outcome?;
            Ok(())
        }

        let projection = Arc::new(Projection::new(Vec::new()));
        assert!(failing(&projection).is_err());
        assert!(!projection.current().loading);
    }
}
