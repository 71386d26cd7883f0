//! Generic caching primitives shared by every domain store.
//!
//! This module provides a domain-agnostic layer that:
//! - Mirrors a server collection plus a "current" detail slot, keeping both coherent
//! - Indexes ordered child records by parent id, alongside a denormalized counter
//! - Computes read-only projections on demand
//! - Persists the session to durable storage

mod entity;
mod relation;
mod storage;
pub mod views;

pub use entity::{Entity, EntityCache};
pub use relation::{ChildCounter, RelationIndex};
pub use storage::{MemoryStorage, SessionStorage, SqliteStorage};
