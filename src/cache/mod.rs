//! Generic caching layer for data persistence and offline support.
//!
//! This module provides a backend-agnostic caching mechanism that:
//! - Caches query results under a fingerprint with a per-entry timestamp
//! - Serves fresh entries without touching the network (TTL-based expiry)
//! - Falls back to stale entries when the network is unavailable or a
//!   critical fetch fails
//! - Supports explicit invalidation after writes and periodic age sweeps

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, FetchOptions, QueryKey};
