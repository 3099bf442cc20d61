//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// A raw cache entry: serialized value plus its storage timestamp.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// JSON-serialized value
  pub data: Vec<u8>,
  /// When the entry was stored
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Store (or overwrite) the entry for a query fingerprint.
  fn put(&self, key: &str, description: &str, entity_type: &str, data: &[u8]) -> Result<()>;

  /// Get the entry for a query fingerprint, if any.
  fn get(&self, key: &str) -> Result<Option<CachedEntry>>;

  /// Delete the entry for a query fingerprint.
  fn invalidate(&self, key: &str) -> Result<()>;

  /// Delete every entry stored under an entity type.
  fn invalidate_type(&self, entity_type: &str) -> Result<usize>;

  /// Delete entries stored before the cutoff. Returns the number removed.
  fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

  /// Delete all entries.
  fn clear(&self) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn put(&self, _key: &str, _description: &str, _entity_type: &str, _data: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn get(&self, _key: &str) -> Result<Option<CachedEntry>> {
    Ok(None) // Always miss
  }

  fn invalidate(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn invalidate_type(&self, _entity_type: &str) -> Result<usize> {
    Ok(0)
  }

  fn sweep_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
    Ok(0)
  }

  fn clear(&self) -> Result<usize> {
    Ok(0)
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Create an in-memory storage, used in tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("hrdesk").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
-- Query result cache (stores serialized JSON keyed by fingerprint)
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    query_description TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_query_cache_type ON query_cache(entity_type);
CREATE INDEX IF NOT EXISTS idx_query_cache_age ON query_cache(cached_at);
"#;

impl CacheStorage for SqliteStorage {
  fn put(&self, key: &str, description: &str, entity_type: &str, data: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_cache (query_hash, query_description, entity_type, data, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![key, description, entity_type, data],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT data, cached_at FROM query_cache WHERE query_hash = ?")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let result: Option<(Vec<u8>, String)> = stmt
      .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
      .ok();

    match result {
      Some((data, cached_at_str)) => {
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedEntry { data, cached_at }))
      }
      None => Ok(None),
    }
  }

  fn invalidate(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM query_cache WHERE query_hash = ?", params![key])
      .map_err(|e| eyre!("Failed to invalidate cache entry: {}", e))?;

    Ok(())
  }

  fn invalidate_type(&self, entity_type: &str) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute(
        "DELETE FROM query_cache WHERE entity_type = ?",
        params![entity_type],
      )
      .map_err(|e| eyre!("Failed to invalidate entity type: {}", e))?;

    Ok(removed)
  }

  fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let cutoff_str = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
    let removed = conn
      .execute(
        "DELETE FROM query_cache WHERE cached_at < ?",
        params![cutoff_str],
      )
      .map_err(|e| eyre!("Failed to sweep cache: {}", e))?;

    Ok(removed)
  }

  fn clear(&self) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute("DELETE FROM query_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(removed)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_put_get_roundtrip() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "employees", "employee", b"[1,2,3]").unwrap();

    let entry = storage.get("k1").unwrap().unwrap();
    assert_eq!(entry.data, b"[1,2,3]");
    assert!(Utc::now() - entry.cached_at < Duration::minutes(1));
  }

  #[test]
  fn test_get_missing_key() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert!(storage.get("absent").unwrap().is_none());
  }

  #[test]
  fn test_put_overwrites() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "tasks", "task", b"old").unwrap();
    storage.put("k1", "tasks", "task", b"new").unwrap();

    let entry = storage.get("k1").unwrap().unwrap();
    assert_eq!(entry.data, b"new");
  }

  #[test]
  fn test_invalidate() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "tasks", "task", b"x").unwrap();
    storage.invalidate("k1").unwrap();
    assert!(storage.get("k1").unwrap().is_none());
  }

  #[test]
  fn test_invalidate_type_only_removes_matching() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "tasks page 1", "task", b"x").unwrap();
    storage.put("k2", "tasks page 2", "task", b"y").unwrap();
    storage.put("k3", "employees", "employee", b"z").unwrap();

    let removed = storage.invalidate_type("task").unwrap();
    assert_eq!(removed, 2);
    assert!(storage.get("k1").unwrap().is_none());
    assert!(storage.get("k3").unwrap().is_some());
  }

  #[test]
  fn test_sweep_removes_old_entries() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("old", "stale query", "task", b"x").unwrap();
    storage.put("new", "fresh query", "task", b"y").unwrap();

    // Back-date one entry past the sweep cutoff
    {
      let conn = storage.conn.lock().unwrap();
      conn
        .execute(
          "UPDATE query_cache SET cached_at = datetime('now', '-8 days') WHERE query_hash = 'old'",
          [],
        )
        .unwrap();
    }

    let removed = storage.sweep_older_than(Utc::now() - Duration::days(7)).unwrap();
    assert_eq!(removed, 1);
    assert!(storage.get("old").unwrap().is_none());
    assert!(storage.get("new").unwrap().is_some());
  }

  #[test]
  fn test_clear() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.put("k1", "a", "task", b"x").unwrap();
    storage.put("k2", "b", "employee", b"y").unwrap();

    assert_eq!(storage.clear().unwrap(), 2);
    assert!(storage.get("k1").unwrap().is_none());
  }
}
