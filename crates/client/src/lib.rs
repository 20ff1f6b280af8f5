//! `stocksync-client`
//!
//! **Responsibility:** offline-first inventory client.
//!
//! This crate provides:
//! - A Local Item Store (SQLite, or in-memory for tests) with a live view
//! - A Remote Item Source speaking the inventory service's HTTP API
//! - The Synchronization Engine: full-replace refresh plus local mutations
//! - The State Projection consumed by a presentation layer
//!
//! The server stays the authority on refresh; local edits are never replayed
//! against it.

pub mod config;
pub mod engine;
pub mod error;
pub mod projection;
pub mod remote;
pub mod session;
pub mod store;
pub mod types;

pub use config::ClientConfig;
pub use engine::{EngineOptions, SyncEngine};
pub use error::{RemoteError, StoreError, SyncError};
pub use projection::{EnginePhase, ItemsState};
pub use remote::{Authenticator, HttpItemSource, ItemSource};
pub use session::SyncSession;
pub use store::{InMemoryItemStore, ItemStore, ItemStream, SqliteItemStore};
pub use types::{AuthToken, ConnectivityState, Credentials, ItemBatch};

pub use stocksync_core::{DomainError, Item, ItemId};
