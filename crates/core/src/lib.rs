//! `stocksync-core` — inventory domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod item;

pub use error::{DomainError, DomainResult};
pub use id::ItemId;
pub use item::Item;
