//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable, FetchOptions};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client,
/// providing transparent get-or-fetch caching with TTL-based expiry and
/// stale-cache fallback for offline or failed fetches.
///
/// Concurrent calls with the same key are NOT de-duplicated: each call
/// independently races to fetch and overwrite, and the last write wins.
/// This mirrors the behavior callers already rely on; de-duplicating here
/// would change observable fetch counts.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long before cached data is considered stale
  default_ttl: Duration,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      default_ttl: Duration::minutes(5),
    }
  }

  /// Set the default TTL for cached data.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  /// Fetch a list of entities with cache-first strategy.
  ///
  /// 1. If a fresh entry exists (and no forced refresh), return it immediately
  /// 2. If the probe reported offline and any entry exists, serve it as-is
  /// 3. Otherwise invoke the producer and store the result
  /// 4. On producer failure, serve the stale entry when the read is critical
  ///
  /// The `key` parameter is the query fingerprint used for cache lookup.
  pub async fn fetch_list<T, F, Fut>(
    &self,
    key: &str,
    description: &str,
    options: FetchOptions,
    fetcher: F,
  ) -> Result<CacheResult<Vec<T>>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    self
      .fetch_value(key, description, T::entity_type(), options, fetcher)
      .await
  }

  /// Fetch a single entity with caching.
  pub async fn fetch_one<T, F, Fut>(
    &self,
    key: &str,
    description: &str,
    options: FetchOptions,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    self
      .fetch_value(key, description, T::entity_type(), options, fetcher)
      .await
  }

  /// Shared get-or-fetch logic over any serializable value.
  async fn fetch_value<V, F, Fut>(
    &self,
    key: &str,
    description: &str,
    entity_type: &str,
    options: FetchOptions,
    fetcher: F,
  ) -> Result<CacheResult<V>>
  where
    V: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>>,
  {
    let ttl = options.ttl.unwrap_or(self.default_ttl);

    if let Some((value, cached_at)) = self.load_entry::<V>(key)? {
      if !options.force_refresh && Utc::now() - cached_at < ttl {
        // Cache is fresh, return immediately
        debug!(key, description, "cache hit (fresh)");
        return Ok(CacheResult::from_cache(value, cached_at));
      }

      // Offline: don't bother with the network if we have anything at all
      if options.offline {
        info!(key, description, "offline, serving cached data");
        return Ok(CacheResult::offline(value, cached_at));
      }

      // Entry is stale (or refresh was forced), try the network
      match fetcher().await {
        Ok(fetched) => {
          debug!(key, description, "fetched from network");
          self.store_entry(key, description, entity_type, &fetched)?;
          Ok(CacheResult::from_network(fetched))
        }
        Err(err) if options.critical => {
          // Stale data beats a hard failure for critical reads
          warn!(key, description, error = %err, "fetch failed, serving stale cache");
          Ok(CacheResult::stale_fallback(value, cached_at, err.to_string()))
        }
        Err(err) => Err(err),
      }
    } else {
      // No cache, must fetch from network
      let value = fetcher().await?;
      debug!(key, description, "fetched from network (cold)");
      self.store_entry(key, description, entity_type, &value)?;
      Ok(CacheResult::from_network(value))
    }
  }

  /// Load and decode an entry. Malformed entries are treated as misses.
  fn load_entry<V: DeserializeOwned>(&self, key: &str) -> Result<Option<(V, DateTime<Utc>)>> {
    let entry = match self.storage.get(key)? {
      Some(e) => e,
      None => return Ok(None),
    };

    match serde_json::from_slice(&entry.data) {
      Ok(value) => Ok(Some((value, entry.cached_at))),
      Err(err) => {
        warn!(key, error = %err, "discarding malformed cache entry");
        self.storage.invalidate(key)?;
        Ok(None)
      }
    }
  }

  fn store_entry<V: Serialize>(
    &self,
    key: &str,
    description: &str,
    entity_type: &str,
    value: &V,
  ) -> Result<()> {
    let data = serde_json::to_vec(value)
      .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize cache entry: {}", e))?;
    self.storage.put(key, description, entity_type, &data)
  }

  /// Drop the entry for a single query fingerprint.
  pub fn invalidate(&self, key: &str) -> Result<()> {
    debug!(key, "invalidating cache entry");
    self.storage.invalidate(key)
  }

  /// Drop every cached query for an entity type. Used after mutating writes.
  pub fn invalidate_type(&self, entity_type: &str) -> Result<usize> {
    let removed = self.storage.invalidate_type(entity_type)?;
    debug!(entity_type, removed, "invalidated cached queries");
    Ok(removed)
  }

  /// Delete entries older than `max_age`, regardless of TTL.
  pub fn sweep(&self, max_age: Duration) -> Result<usize> {
    let removed = self.storage.sweep_older_than(Utc::now() - max_age)?;
    if removed > 0 {
      info!(removed, "swept aged cache entries");
    }
    Ok(removed)
  }

  /// Delete all cache entries.
  pub fn clear(&self) -> Result<usize> {
    self.storage.clear()
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      default_ttl: self.default_ttl,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::SqliteStorage;
  use crate::cache::traits::CacheSource;
  use color_eyre::eyre::eyre;
  use serde::{Deserialize, Serialize};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Widget {
    id: String,
  }

  impl Cacheable for Widget {
    fn entity_type() -> &'static str {
      "widget"
    }
  }

  fn layer() -> CacheLayer<SqliteStorage> {
    CacheLayer::new(SqliteStorage::open_in_memory().unwrap())
  }

  fn widgets() -> Vec<Widget> {
    vec![Widget { id: "w1".into() }, Widget { id: "w2".into() }]
  }

  #[tokio::test]
  async fn test_second_fetch_within_ttl_skips_producer() {
    let layer = layer();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
      let result = layer
        .fetch_list("k1", "widgets", FetchOptions::default(), || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(widgets())
        })
        .await
        .unwrap();
      assert_eq!(result.data, widgets());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_after_ttl_invokes_producer_again() {
    let layer = layer();
    let calls = AtomicUsize::new(0);
    // Zero TTL: every entry is immediately stale
    let options = FetchOptions::default().with_ttl(Duration::zero());

    for _ in 0..2 {
      layer
        .fetch_list("k1", "widgets", options, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(widgets())
        })
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_force_refresh_always_invokes_producer() {
    let layer = layer();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
      let result = layer
        .fetch_list("k1", "widgets", FetchOptions::refresh(), || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(widgets())
        })
        .await
        .unwrap();
      assert_eq!(result.source, CacheSource::Network);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_critical_failure_serves_stale_with_error() {
    let layer = layer();

    // Prime the cache, then expire it via zero TTL on the second call
    layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        Ok(widgets())
      })
      .await
      .unwrap();

    let options = FetchOptions::default().critical().with_ttl(Duration::zero());
    let result = layer
      .fetch_list::<Widget, _, _>("k1", "widgets", options, || async {
        Err(eyre!("connection refused"))
      })
      .await
      .unwrap();

    assert_eq!(result.data, widgets());
    assert_eq!(result.source, CacheSource::CacheStale);
    assert!(result.from_cache_entry());
    assert!(result.error.unwrap().contains("connection refused"));
  }

  #[tokio::test]
  async fn test_failure_without_prior_entry_propagates() {
    let layer = layer();

    let result = layer
      .fetch_list::<Widget, _, _>("k1", "widgets", FetchOptions::default().critical(), || async {
        Err(eyre!("connection refused"))
      })
      .await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_non_critical_failure_ignores_stale_entry() {
    let layer = layer();

    layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        Ok(widgets())
      })
      .await
      .unwrap();

    let options = FetchOptions::default().with_ttl(Duration::zero());
    let result = layer
      .fetch_list::<Widget, _, _>("k1", "widgets", options, || async {
        Err(eyre!("connection refused"))
      })
      .await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_offline_serves_stale_without_fetch() {
    let layer = layer();

    layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        Ok(widgets())
      })
      .await
      .unwrap();

    let options = FetchOptions {
      offline: true,
      ttl: Some(Duration::zero()),
      ..FetchOptions::default()
    };
    let calls = AtomicUsize::new(0);
    let result = layer
      .fetch_list("k1", "widgets", options, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::<Widget>::new())
      })
      .await
      .unwrap();

    // Entry is past its TTL, but offline mode serves it without a fetch
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data, widgets());
  }

  #[tokio::test]
  async fn test_malformed_entry_is_a_miss() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "widgets", "widget", b"not json").unwrap();
    let layer = CacheLayer::new(storage);
    let calls = AtomicUsize::new(0);

    let result = layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(widgets())
      })
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.source, CacheSource::Network);
  }

  #[tokio::test]
  async fn test_invalidate_type_forces_refetch() {
    let layer = layer();
    let calls = AtomicUsize::new(0);

    layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(widgets())
      })
      .await
      .unwrap();

    layer.invalidate_type("widget").unwrap();

    layer
      .fetch_list("k1", "widgets", FetchOptions::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(widgets())
      })
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_one_roundtrip() {
    let layer = layer();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
      let result = layer
        .fetch_one("w1", "widget w1", FetchOptions::default(), || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(Widget { id: "w1".into() })
        })
        .await
        .unwrap();
      assert_eq!(result.data.id, "w1");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
