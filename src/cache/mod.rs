//! Page cache for listing requests.
//!
//! This module provides an explicitly owned cache that:
//! - Keys listing pages by their full request signature
//! - Stores the last successful response per signature, never merged
//! - Expires entries after a TTL and bounds the number of entries
//! - Can live in memory (per process) or in SQLite (across runs)

mod signature;
mod storage;

use chrono::{Duration, Utc};
use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;

use crate::api::PageResult;
use crate::config::CacheConfig;

pub use signature::RequestSignature;
pub use storage::{CacheEntry, CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};

/// Shared handle to a cache backend plus its expiry policy.
///
/// Cloning is cheap; clones share the same storage.
#[derive(Clone)]
pub struct PageCache {
  storage: Arc<dyn CacheStorage>,
  ttl: Option<Duration>,
  max_entries: usize,
}

impl PageCache {
  /// Create a cache over the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    let defaults = CacheConfig::default();
    Self {
      storage: Arc::new(storage),
      ttl: defaults.ttl(),
      max_entries: defaults.max_entries,
    }
  }

  pub fn in_memory() -> Self {
    Self::new(MemoryStorage::new())
  }

  pub fn disabled() -> Self {
    Self::new(NoopStorage)
  }

  /// Build the cache described by the configuration
  pub fn from_config(config: &CacheConfig) -> Result<Self> {
    let cache = if !config.enabled {
      Self::disabled()
    } else if config.persist {
      Self::new(SqliteStorage::open()?)
    } else {
      Self::in_memory()
    };

    Ok(
      cache
        .with_ttl(config.ttl())
        .with_max_entries(config.max_entries),
    )
  }

  /// Set how long entries stay valid; `None` keeps them until evicted.
  pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn with_max_entries(mut self, max_entries: usize) -> Self {
    self.max_entries = max_entries.max(1);
    self
  }

  /// Look up a page. Expired entries are removed and reported as a miss.
  pub fn get(&self, signature: &RequestSignature) -> Result<Option<PageResult>> {
    let key = signature.cache_hash();
    let Some(entry) = self.storage.get(&key)? else {
      return Ok(None);
    };

    if let Some(ttl) = self.ttl {
      if Utc::now() - entry.cached_at > ttl {
        debug!(signature = %signature.description(), "Cached page expired");
        self.storage.remove(&key)?;
        return Ok(None);
      }
    }

    Ok(Some(entry.result))
  }

  /// Store a page, overwriting any previous entry for the same signature
  pub fn put(&self, signature: &RequestSignature, result: &PageResult) -> Result<()> {
    self.storage.put(
      &signature.cache_hash(),
      &signature.description(),
      result,
      Utc::now(),
    )?;

    let evicted = self.storage.evict_to(self.max_entries)?;
    if evicted > 0 {
      debug!(evicted, "Evicted old cached pages");
    }
    Ok(())
  }

  pub fn invalidate(&self, signature: &RequestSignature) -> Result<()> {
    self.storage.remove(&signature.cache_hash())
  }

  pub fn clear(&self) -> Result<()> {
    self.storage.clear()
  }

  pub fn len(&self) -> Result<usize> {
    self.storage.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::BTreeMap;

  fn signature(page: u32) -> RequestSignature {
    RequestSignature {
      endpoint: "/brands".to_string(),
      page,
      limit: 10,
      search: String::new(),
      query: BTreeMap::new(),
      deps: Vec::new(),
    }
  }

  fn page(id: u64) -> PageResult {
    PageResult {
      items: vec![json!({ "id": id })],
      total_rows: 1,
      root_data: None,
    }
  }

  #[test]
  fn test_put_then_get() {
    let cache = PageCache::in_memory();
    cache.put(&signature(1), &page(1)).unwrap();
    assert_eq!(cache.get(&signature(1)).unwrap(), Some(page(1)));
    assert_eq!(cache.get(&signature(2)).unwrap(), None);
  }

  #[test]
  fn test_overwrite_replaces_entry() {
    let cache = PageCache::in_memory();
    cache.put(&signature(1), &page(1)).unwrap();
    cache.put(&signature(1), &page(2)).unwrap();
    assert_eq!(cache.get(&signature(1)).unwrap(), Some(page(2)));
    assert_eq!(cache.len().unwrap(), 1);
  }

  #[test]
  fn test_expired_entries_miss() {
    let storage = MemoryStorage::new();
    let sig = signature(1);
    storage
      .put(
        &sig.cache_hash(),
        &sig.description(),
        &page(1),
        Utc::now() - Duration::minutes(10),
      )
      .unwrap();

    let cache = PageCache::new(storage).with_ttl(Some(Duration::minutes(5)));
    assert_eq!(cache.get(&sig).unwrap(), None);
    assert_eq!(cache.len().unwrap(), 0);
  }

  #[test]
  fn test_no_ttl_keeps_old_entries() {
    let storage = MemoryStorage::new();
    let sig = signature(1);
    storage
      .put(
        &sig.cache_hash(),
        &sig.description(),
        &page(1),
        Utc::now() - Duration::days(30),
      )
      .unwrap();

    let cache = PageCache::new(storage).with_ttl(None);
    assert_eq!(cache.get(&sig).unwrap(), Some(page(1)));
  }

  #[test]
  fn test_capacity_evicts_oldest() {
    let cache = PageCache::in_memory().with_max_entries(2);
    cache.put(&signature(1), &page(1)).unwrap();
    cache.put(&signature(2), &page(2)).unwrap();
    cache.put(&signature(3), &page(3)).unwrap();

    assert_eq!(cache.len().unwrap(), 2);
    assert_eq!(cache.get(&signature(1)).unwrap(), None);
    assert_eq!(cache.get(&signature(3)).unwrap(), Some(page(3)));
  }

  #[test]
  fn test_disabled_cache_never_hits() {
    let cache = PageCache::disabled();
    cache.put(&signature(1), &page(1)).unwrap();
    assert_eq!(cache.get(&signature(1)).unwrap(), None);
  }
}
