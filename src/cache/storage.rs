//! Cache storage trait with in-memory and SQLite implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::api::PageResult;

/// A cached listing page
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub result: PageResult,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Keys are signature hashes; `description` is only kept for inspection.
pub trait CacheStorage: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

  /// Insert or overwrite the entry for `key`
  fn put(
    &self,
    key: &str,
    description: &str,
    result: &PageResult,
    cached_at: DateTime<Utc>,
  ) -> Result<()>;

  fn remove(&self, key: &str) -> Result<()>;

  fn clear(&self) -> Result<()>;

  fn len(&self) -> Result<usize>;

  /// Drop the oldest entries until at most `keep` remain. Returns how many were dropped.
  fn evict_to(&self, keep: usize) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn put(
    &self,
    _key: &str,
    _description: &str,
    _result: &PageResult,
    _cached_at: DateTime<Utc>,
  ) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }

  fn len(&self) -> Result<usize> {
    Ok(0)
  }

  fn evict_to(&self, _keep: usize) -> Result<usize> {
    Ok(0)
  }
}

struct MemorySlot {
  entry: CacheEntry,
  /// Insertion order, used for eviction
  stamp: u64,
}

#[derive(Default)]
struct MemoryInner {
  slots: HashMap<String, MemorySlot>,
  next_stamp: u64,
}

/// Process-lifetime cache
#[derive(Default)]
pub struct MemoryStorage {
  inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    let inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(inner.slots.get(key).map(|slot| slot.entry.clone()))
  }

  fn put(
    &self,
    key: &str,
    _description: &str,
    result: &PageResult,
    cached_at: DateTime<Utc>,
  ) -> Result<()> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    inner.next_stamp += 1;
    let stamp = inner.next_stamp;
    inner.slots.insert(
      key.to_string(),
      MemorySlot {
        entry: CacheEntry {
          result: result.clone(),
          cached_at,
        },
        stamp,
      },
    );
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    inner.slots.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    inner.slots.clear();
    Ok(())
  }

  fn len(&self) -> Result<usize> {
    let inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(inner.slots.len())
  }

  fn evict_to(&self, keep: usize) -> Result<usize> {
    let mut inner = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let excess = inner.slots.len().saturating_sub(keep);
    if excess == 0 {
      return Ok(0);
    }

    let mut by_age: Vec<(u64, String)> = inner
      .slots
      .iter()
      .map(|(key, slot)| (slot.stamp, key.clone()))
      .collect();
    by_age.sort_unstable();

    for (_, key) in by_age.into_iter().take(excess) {
      inner.slots.remove(&key);
    }
    Ok(excess)
  }
}

/// SQLite-based cache storage, persisted across runs.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Create a new SQLite storage at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Private in-memory database, mostly for tests
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
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

    Ok(data_dir.join("crmdesk").join("cache.db"))
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

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per listing request signature. rowid grows with every write,
-- so it doubles as insertion order for eviction.
CREATE TABLE IF NOT EXISTS page_cache (
    signature TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    data BLOB NOT NULL,
    total_rows INTEGER NOT NULL,
    cached_at TEXT NOT NULL
);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM page_cache WHERE signature = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query page cache: {}", e))?;

    match row {
      Some((data, cached_at_str)) => {
        let result: PageResult = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize cached page: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CacheEntry { result, cached_at }))
      }
      None => Ok(None),
    }
  }

  fn put(
    &self,
    key: &str,
    description: &str,
    result: &PageResult,
    cached_at: DateTime<Utc>,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let data = serde_json::to_vec(result).map_err(|e| eyre!("Failed to serialize page: {}", e))?;

    // REPLACE deletes and reinserts, giving the row a fresh rowid
    conn
      .execute(
        "INSERT OR REPLACE INTO page_cache (signature, description, data, total_rows, cached_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
          key,
          description,
          data,
          result.total_rows as i64,
          cached_at.to_rfc3339()
        ],
      )
      .map_err(|e| eyre!("Failed to store cached page: {}", e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute("DELETE FROM page_cache WHERE signature = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cached page: {}", e))?;
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute("DELETE FROM page_cache", [])
      .map_err(|e| eyre!("Failed to clear page cache: {}", e))?;
    Ok(())
  }

  fn len(&self) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM page_cache", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count cached pages: {}", e))?;
    Ok(count as usize)
  }

  fn evict_to(&self, keep: usize) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let removed = conn
      .execute(
        "DELETE FROM page_cache WHERE rowid NOT IN
           (SELECT rowid FROM page_cache ORDER BY rowid DESC LIMIT ?)",
        params![keep as i64],
      )
      .map_err(|e| eyre!("Failed to evict cached pages: {}", e))?;
    Ok(removed)
  }
}

/// Parse an RFC 3339 timestamp written by [`SqliteStorage::put`].
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn page(ids: &[u64]) -> PageResult {
    PageResult {
      items: ids.iter().map(|id| json!({ "id": id })).collect(),
      total_rows: ids.len() as u64,
      root_data: Some(json!({ "data": ids })),
    }
  }

  fn exercise_backend(storage: &dyn CacheStorage) {
    let now = Utc::now();
    storage.put("a", "a", &page(&[1]), now).unwrap();
    storage.put("b", "b", &page(&[2]), now).unwrap();
    storage.put("c", "c", &page(&[3]), now).unwrap();
    assert_eq!(storage.len().unwrap(), 3);

    // Overwriting refreshes the entry's age
    storage.put("a", "a", &page(&[1, 4]), now).unwrap();
    assert_eq!(storage.get("a").unwrap().unwrap().result, page(&[1, 4]));

    assert_eq!(storage.evict_to(2).unwrap(), 1);
    assert!(storage.get("b").unwrap().is_none());
    assert!(storage.get("c").unwrap().is_some());
    assert!(storage.get("a").unwrap().is_some());

    storage.remove("c").unwrap();
    assert!(storage.get("c").unwrap().is_none());

    storage.clear().unwrap();
    assert_eq!(storage.len().unwrap(), 0);
  }

  #[test]
  fn test_memory_storage() {
    exercise_backend(&MemoryStorage::new());
  }

  #[test]
  fn test_sqlite_storage() {
    exercise_backend(&SqliteStorage::in_memory().unwrap());
  }

  #[test]
  fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let cached_at = Utc::now();

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.put("k", "brands page 1", &page(&[9]), cached_at).unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    let entry = storage.get("k").unwrap().unwrap();
    assert_eq!(entry.result, page(&[9]));
    assert_eq!(entry.cached_at.timestamp(), cached_at.timestamp());
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.put("k", "k", &page(&[1]), Utc::now()).unwrap();
    assert!(storage.get("k").unwrap().is_none());
    assert_eq!(storage.len().unwrap(), 0);
  }
}
