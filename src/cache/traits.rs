//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
///
/// Entries are stored whole under a query fingerprint; the entity type name
/// groups them so writes can invalidate a whole query family at once.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Entity type name for storage organization (e.g., "employee", "task")
  fn entity_type() -> &'static str;
}

/// Trait for query keys that can be turned into cache fingerprints.
///
/// A fingerprint covers everything that changes the result set: table,
/// filters, ordering and pagination. Two logically identical queries must
/// produce the same hash.
pub trait QueryKey {
  /// Stable, fixed-length hash used as the cache lookup key.
  fn cache_hash(&self) -> String;

  /// Human-readable description for logs and diagnostics.
  fn description(&self) -> String;
}

/// Per-call options for a cached fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
  /// Always invoke the producer, even if a fresh entry exists.
  pub force_refresh: bool,
  /// Override the layer's default TTL for this call.
  pub ttl: Option<Duration>,
  /// Prefer a stale cache entry over a hard failure when the producer errors.
  pub critical: bool,
  /// Connectivity hint from the network probe. When true and any entry
  /// exists for the key, it is served immediately without a fetch attempt.
  pub offline: bool,
}

impl FetchOptions {
  /// Options for a forced refresh (pull-to-refresh).
  pub fn refresh() -> Self {
    Self {
      force_refresh: true,
      ..Self::default()
    }
  }

  /// Mark this read as critical: stale data is better than no data.
  pub fn critical(mut self) -> Self {
    self.critical = true;
    self
  }

  /// Set a per-call TTL.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// The fetch error, attached when stale data was served as a fallback
  pub error: Option<String>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      error: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
      error: None,
    }
  }

  /// Create a new cache result from a stale entry served after a failed fetch.
  pub fn stale_fallback(data: T, cached_at: DateTime<Utc>, error: String) -> Self {
    Self {
      data,
      source: CacheSource::CacheStale,
      cached_at: Some(cached_at),
      error: Some(error),
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
      error: None,
    }
  }

  /// Whether the data came from the cache rather than the network.
  pub fn from_cache_entry(&self) -> bool {
    self.source != CacheSource::Network
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its TTL
  CacheFresh,
  /// Data from cache past its TTL, served because the fetch failed
  CacheStale,
  /// Offline mode - network unavailable, serving cached data
  Offline,
}
