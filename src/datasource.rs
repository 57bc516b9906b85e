//! Paginated, cached access to a listing endpoint.
//!
//! A [`PaginatedDataSource`] sits between UI controls (page, page size,
//! search box, filters) and a listing endpoint. It publishes its parameters
//! and its data through `watch` channels, answers repeated requests from the
//! [`PageCache`], and guards shared state with a request sequence number so
//! that only the most recently issued request can update it.
//!
//! ```ignore
//! let source = PaginatedDataSource::new(Some("/brands".into()), client, cache, notifier)
//!   .with_limit(25);
//! let effect = source.spawn_effect();   // fetches now and on every param change
//! source.search("acme");                // page resets to 1, effect refetches
//! let state = source.state();           // items, total_rows, loading
//! ```

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{decode_listing, ApiError, PageResult};
use crate::cache::{PageCache, RequestSignature};
use crate::notify::{Notification, Notifier};

/// Source of raw listing bodies
pub trait PageFetcher: Send + Sync {
  fn fetch_page<'a>(
    &'a self,
    endpoint: &'a str,
    params: &'a [(String, String)],
  ) -> BoxFuture<'a, Result<Value, ApiError>>;
}

/// Request parameters driven by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
  /// 1-based
  pub page: u32,
  pub limit: u32,
  pub search: String,
  /// Extra filters, sent as their own query parameters
  pub query: BTreeMap<String, String>,
  /// Caller-declared dependencies that are part of the cache key
  pub deps: Vec<String>,
}

impl Default for Params {
  fn default() -> Self {
    Self {
      page: 1,
      limit: 10,
      search: String::new(),
      query: BTreeMap::new(),
      deps: Vec::new(),
    }
  }
}

impl Params {
  /// Query string pairs for the listing request
  pub fn to_query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![
      ("page".to_string(), self.page.to_string()),
      ("per_page".to_string(), self.limit.to_string()),
    ];

    let search = self.search.trim();
    if !search.is_empty() {
      pairs.push(("search".to_string(), search.to_string()));
      pairs.push(("name".to_string(), search.to_string()));
    }

    for (key, value) in &self.query {
      if !value.trim().is_empty() {
        pairs.push((key.clone(), value.clone()));
      }
    }

    pairs
  }

  fn signature(&self, endpoint: &str) -> RequestSignature {
    RequestSignature {
      endpoint: endpoint.to_string(),
      page: self.page,
      limit: self.limit,
      search: self.search.clone(),
      query: self.query.clone(),
      deps: self.deps.clone(),
    }
  }
}

/// Observable data of a source
#[derive(Debug, Clone, PartialEq)]
pub struct DataState {
  pub items: Vec<Value>,
  pub total_rows: u64,
  pub root_data: Option<Value>,
  pub loading: bool,
}

impl Default for DataState {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      total_rows: 0,
      root_data: None,
      loading: true,
    }
  }
}

impl DataState {
  fn apply(&mut self, result: &PageResult) {
    self.items = result.items.clone();
    self.total_rows = result.total_rows;
    self.root_data = result.root_data.clone();
  }

  fn reset(&mut self) {
    self.items.clear();
    self.total_rows = 0;
    self.root_data = None;
  }
}

/// Per-call overrides for [`PaginatedDataSource::fetch`].
///
/// Omitted fields fall back to the source's current parameters.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub search: Option<String>,
  pub query: Option<BTreeMap<String, String>>,
  /// Skip the cache lookup and overwrite the entry afterwards
  pub force: bool,
  /// Leave the loading flag alone
  pub silent: bool,
}

impl FetchOptions {
  pub fn forced() -> Self {
    Self {
      force: true,
      ..Self::default()
    }
  }

  pub fn silent() -> Self {
    Self {
      silent: true,
      ..Self::default()
    }
  }

  pub fn with_page(mut self, page: u32) -> Self {
    self.page = Some(page);
    self
  }

  pub fn with_limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }
}

struct Inner {
  endpoint: Option<String>,
  fetcher: Arc<dyn PageFetcher>,
  cache: PageCache,
  notifier: Arc<dyn Notifier>,
  params: watch::Sender<Params>,
  state: watch::Sender<DataState>,
  /// Sequence number of the most recently issued fetch
  latest: AtomicU64,
  /// Non-silent fetches currently awaiting the network
  in_flight: AtomicUsize,
}

/// Keeps `loading` raised while a non-silent request is outstanding
struct LoadingGuard<'a> {
  inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
  fn start(inner: &'a Inner) -> Self {
    inner.state.send_modify(|s| {
      inner.in_flight.fetch_add(1, Ordering::SeqCst);
      s.loading = true;
    });
    Self { inner }
  }
}

impl Drop for LoadingGuard<'_> {
  fn drop(&mut self) {
    let inner = self.inner;
    inner.state.send_modify(|s| {
      let remaining = inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
      s.loading = remaining > 0;
    });
  }
}

/// Cached, paginated view over one listing endpoint.
///
/// Clones are handles to the same source.
#[derive(Clone)]
pub struct PaginatedDataSource {
  inner: Arc<Inner>,
}

impl PaginatedDataSource {
  /// Create a source. Without an endpoint every fetch yields an empty page.
  pub fn new(
    endpoint: Option<String>,
    fetcher: Arc<dyn PageFetcher>,
    cache: PageCache,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let (params, _) = watch::channel(Params::default());
    let (state, _) = watch::channel(DataState::default());

    Self {
      inner: Arc::new(Inner {
        endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        fetcher,
        cache,
        notifier,
        params,
        state,
        latest: AtomicU64::new(0),
        in_flight: AtomicUsize::new(0),
      }),
    }
  }

  pub fn with_limit(self, limit: u32) -> Self {
    self.inner.params.send_modify(|p| p.limit = limit.max(1));
    self
  }

  pub fn with_query(self, query: BTreeMap<String, String>) -> Self {
    self.inner.params.send_modify(|p| p.query = query);
    self
  }

  pub fn with_deps(self, deps: Vec<String>) -> Self {
    self.inner.params.send_modify(|p| p.deps = deps);
    self
  }

  pub fn endpoint(&self) -> Option<&str> {
    self.inner.endpoint.as_deref()
  }

  /// Snapshot of the current data
  pub fn state(&self) -> DataState {
    self.inner.state.borrow().clone()
  }

  /// Receiver that wakes on every data change
  pub fn subscribe(&self) -> watch::Receiver<DataState> {
    self.inner.state.subscribe()
  }

  pub fn params(&self) -> Params {
    self.inner.params.borrow().clone()
  }

  /// Number of pages for the current total (at least 1)
  pub fn page_count(&self) -> u32 {
    let limit = u64::from(self.inner.params.borrow().limit.max(1));
    let total = self.inner.state.borrow().total_rows;
    total.div_ceil(limit).max(1).min(u64::from(u32::MAX)) as u32
  }

  /// Fetch a page.
  ///
  /// Returns `None` if the request failed (state is reset and the failure is
  /// reported through the notifier); an empty page is `Some` with no items.
  pub async fn fetch(&self, options: FetchOptions) -> Option<PageResult> {
    let inner = &*self.inner;

    let Some(endpoint) = inner.endpoint.as_deref() else {
      inner.state.send_modify(|s| {
        s.loading = inner.in_flight.load(Ordering::SeqCst) > 0;
      });
      return Some(PageResult::empty());
    };

    let params = self.effective_params(&options);
    let signature = params.signature(endpoint);
    let seq = inner.latest.fetch_add(1, Ordering::SeqCst) + 1;

    if !options.force {
      match inner.cache.get(&signature) {
        Ok(Some(hit)) => {
          debug!(signature = %signature.description(), "Serving page from cache");
          self.publish(seq, |s| s.apply(&hit));
          return Some(hit);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Page cache lookup failed"),
      }
    }

    let _loading = (!options.silent).then(|| LoadingGuard::start(inner));
    let pairs = params.to_query_pairs();
    debug!(signature = %signature.description(), seq, "Fetching page");

    match inner.fetcher.fetch_page(endpoint, &pairs).await {
      Ok(body) => {
        let result = decode_listing(body);
        if let Err(e) = inner.cache.put(&signature, &result) {
          warn!(error = %e, "Failed to cache page");
        }
        self.publish(seq, |s| s.apply(&result));
        Some(result)
      }
      Err(e) => {
        warn!(endpoint, error = %e, "Listing request failed");
        inner.notifier.notify(Notification::error(e.to_string()));
        self.publish(seq, DataState::reset);
        None
      }
    }
  }

  /// Refetch the current page, bypassing the cache
  pub async fn refresh(&self) -> Option<PageResult> {
    self.fetch(FetchOptions::forced()).await
  }

  /// Replace the search term and go back to the first page.
  ///
  /// Does not fetch by itself; the effect task reacts to the change.
  pub fn search(&self, term: impl Into<String>) {
    let term = term.into();
    self.inner.params.send_if_modified(|p| {
      let changed = p.search != term || p.page != 1;
      p.search = term;
      p.page = 1;
      changed
    });
  }

  pub fn set_page(&self, page: u32) {
    let page = page.max(1);
    self.inner.params.send_if_modified(|p| {
      let changed = p.page != page;
      p.page = page;
      changed
    });
  }

  pub fn next_page(&self) {
    let params = self.params();
    let more = {
      let state = self.inner.state.borrow();
      has_more(params.page, params.limit, state.total_rows, state.items.len())
    };
    if more {
      self.set_page(params.page + 1);
    }
  }

  pub fn prev_page(&self) {
    let page = self.params().page;
    if page > 1 {
      self.set_page(page - 1);
    }
  }

  /// Change the page size; returns to the first page
  pub fn set_limit(&self, limit: u32) {
    let limit = limit.max(1);
    self.inner.params.send_if_modified(|p| {
      let changed = p.limit != limit || p.page != 1;
      p.limit = limit;
      p.page = 1;
      changed
    });
  }

  /// Replace the extra filters; returns to the first page
  pub fn set_query(&self, query: BTreeMap<String, String>) {
    self.inner.params.send_if_modified(|p| {
      let changed = p.query != query || p.page != 1;
      p.query = query;
      p.page = 1;
      changed
    });
  }

  pub fn set_deps(&self, deps: Vec<String>) {
    self.inner.params.send_if_modified(|p| {
      let changed = p.deps != deps || p.page != 1;
      p.deps = deps;
      p.page = 1;
      changed
    });
  }

  /// Fetch now and again whenever the parameters change.
  ///
  /// Each fetch runs in its own task; abort the handle to stop reacting.
  pub fn spawn_effect(&self) -> JoinHandle<()> {
    let source = self.clone();
    let mut changes = self.inner.params.subscribe();

    tokio::spawn(async move {
      loop {
        let fetcher = source.clone();
        tokio::spawn(async move {
          fetcher.fetch(FetchOptions::default()).await;
        });

        if changes.changed().await.is_err() {
          break;
        }
      }
    })
  }

  fn effective_params(&self, options: &FetchOptions) -> Params {
    let mut params = self.params();
    if let Some(page) = options.page {
      params.page = page.max(1);
    }
    if let Some(limit) = options.limit {
      params.limit = limit.max(1);
    }
    if let Some(search) = &options.search {
      params.search = search.clone();
    }
    if let Some(query) = &options.query {
      params.query = query.clone();
    }
    params
  }

  /// Apply `update` to the shared state if `seq` is still the latest request
  fn publish(&self, seq: u64, update: impl FnOnce(&mut DataState)) {
    let inner = &*self.inner;
    let applied = inner.state.send_if_modified(|s| {
      if inner.latest.load(Ordering::SeqCst) != seq {
        return false;
      }
      update(s);
      s.loading = inner.in_flight.load(Ordering::SeqCst) > 0;
      true
    });

    if !applied {
      debug!(seq, "Discarding response of a superseded request");
    }
  }
}

/// Whether a page after `page` exists. Without a total, a full page
/// suggests there may be more.
pub fn has_more(page: u32, limit: u32, total_rows: u64, items: usize) -> bool {
  let limit = limit.max(1);
  if total_rows == 0 {
    return items >= limit as usize;
  }
  u64::from(page) < total_rows.div_ceil(u64::from(limit))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notify::{NotificationLevel, RecordingNotifier};
  use serde_json::json;
  use std::sync::Mutex;
  use std::time::Duration;
  use tokio::sync::Notify;

  type Responder = Box<dyn Fn(&[(String, String)]) -> Result<Value, ApiError> + Send + Sync>;

  /// Records every request and answers through a closure
  struct StubFetcher {
    calls: Mutex<Vec<Vec<(String, String)>>>,
    respond: Responder,
    /// Requests wait here until released
    gate: Option<Arc<Notify>>,
    /// Requests for page 1 are delayed by this much
    slow_first_page: Duration,
  }

  impl StubFetcher {
    fn new<F>(respond: F) -> Self
    where
      F: Fn(&[(String, String)]) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
      Self {
        calls: Mutex::new(Vec::new()),
        respond: Box::new(respond),
        gate: None,
        slow_first_page: Duration::ZERO,
      }
    }

    fn ok(body: Value) -> Self {
      Self::new(move |_| Ok(body.clone()))
    }

    fn failing() -> Self {
      Self::new(|_| {
        Err(ApiError::Http {
          status: 500,
          message: "Server Error".to_string(),
          field_errors: BTreeMap::new(),
        })
      })
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> Vec<(String, String)> {
      self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
  }

  impl PageFetcher for StubFetcher {
    fn fetch_page<'a>(
      &'a self,
      _endpoint: &'a str,
      params: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Value, ApiError>> {
      Box::pin(async move {
        self.calls.lock().unwrap().push(params.to_vec());
        if let Some(gate) = &self.gate {
          gate.notified().await;
        }
        let first_page = params.iter().any(|(k, v)| k == "page" && v == "1");
        if first_page && !self.slow_first_page.is_zero() {
          tokio::time::sleep(self.slow_first_page).await;
        }
        (self.respond)(params)
      })
    }
  }

  fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  fn source_with(
    endpoint: Option<&str>,
    fetcher: Arc<StubFetcher>,
  ) -> (PaginatedDataSource, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let source = PaginatedDataSource::new(
      endpoint.map(String::from),
      fetcher,
      PageCache::in_memory(),
      notifier.clone(),
    );
    (source, notifier)
  }

  fn widgets_body() -> Value {
    json!({ "data": [{"id": 1}, {"id": 2}], "meta": {"total": 2} })
  }

  #[tokio::test]
  async fn test_widgets_scenario() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    assert!(source.state().loading);
    let result = source.fetch(FetchOptions::default()).await.unwrap();

    assert_eq!(fetcher.last_call(), pairs(&[("page", "1"), ("per_page", "10")]));
    assert_eq!(result.total_rows, 2);

    let state = source.state();
    assert_eq!(state.items, vec![json!({"id": 1}), json!({"id": 2})]);
    assert_eq!(state.total_rows, 2);
    assert!(!state.loading);
    assert_eq!(state.root_data, Some(widgets_body()));
  }

  #[tokio::test]
  async fn test_identical_fetch_hits_cache() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    let first = source.fetch(FetchOptions::default()).await;
    let second = source.fetch(FetchOptions::default()).await;

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(first, second);
    assert_eq!(source.state().items.len(), 2);
  }

  #[tokio::test]
  async fn test_cache_is_shared_between_sources() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let cache = PageCache::in_memory();
    let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
    let a = PaginatedDataSource::new(
      Some("/widgets".into()),
      fetcher.clone(),
      cache.clone(),
      notifier.clone(),
    );
    let b = PaginatedDataSource::new(Some("/widgets".into()), fetcher.clone(), cache, notifier);

    a.fetch(FetchOptions::default()).await;
    b.fetch(FetchOptions::default()).await;

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(b.state().total_rows, 2);
    assert!(!b.state().loading);
  }

  #[tokio::test]
  async fn test_forced_fetch_bypasses_and_overwrites_cache() {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = counter.clone();
    let fetcher = Arc::new(StubFetcher::new(move |_| {
      let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
      Ok(json!({ "data": [{"version": n}], "total": n }))
    }));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    source.fetch(FetchOptions::default()).await;
    let refreshed = source.refresh().await.unwrap();
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(refreshed.total_rows, 2);

    // The forced response replaced the cached one
    let cached = source.fetch(FetchOptions::default()).await.unwrap();
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(cached.items, vec![json!({"version": 2})]);
  }

  #[tokio::test]
  async fn test_no_endpoint_short_circuits() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, notifier) = source_with(None, fetcher.clone());

    let result = source.fetch(FetchOptions::default()).await;
    assert_eq!(result, Some(PageResult::empty()));
    assert_eq!(source.refresh().await, Some(PageResult::empty()));
    assert_eq!(fetcher.call_count(), 0);
    assert!(!source.state().loading);
    assert!(notifier.messages().is_empty());
  }

  #[tokio::test]
  async fn test_non_array_payload_is_empty_page() {
    let fetcher = Arc::new(StubFetcher::ok(json!({ "data": "nope", "total": 9 })));
    let (source, notifier) = source_with(Some("/widgets"), fetcher);

    let result = source.fetch(FetchOptions::default()).await.unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.total_rows, 0);
    assert!(notifier.messages().is_empty());
  }

  #[tokio::test]
  async fn test_failure_resets_state_and_notifies() {
    let ok = Arc::new(StubFetcher::ok(widgets_body()));
    let failing = Arc::new(StubFetcher::failing());
    let notifier = Arc::new(RecordingNotifier::default());
    let cache = PageCache::in_memory();

    // Same cache so the ok source leaves data behind
    let source = PaginatedDataSource::new(
      Some("/widgets".into()),
      ok,
      cache.clone(),
      notifier.clone(),
    );
    source.fetch(FetchOptions::default()).await;
    assert_eq!(source.state().items.len(), 2);

    let broken =
      PaginatedDataSource::new(Some("/widgets".into()), failing, cache, notifier.clone());
    broken.fetch(FetchOptions::default()).await;
    assert_eq!(broken.state().items.len(), 2);

    assert_eq!(broken.refresh().await, None);
    let state = broken.state();
    assert!(state.items.is_empty());
    assert_eq!(state.total_rows, 0);
    assert_eq!(state.root_data, None);
    assert!(!state.loading);
    assert_eq!(
      notifier.messages(),
      vec![(
        NotificationLevel::Error,
        "Server Error (HTTP 500)".to_string()
      )]
    );
  }

  #[tokio::test]
  async fn test_loading_clears_after_failure() {
    let gate = Arc::new(Notify::new());
    let mut stub = StubFetcher::failing();
    stub.gate = Some(gate.clone());
    let fetcher = Arc::new(stub);
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    for round in 1..=2 {
      let handle = tokio::spawn({
        let source = source.clone();
        async move { source.fetch(FetchOptions::forced()).await }
      });

      // Wait for the request to be in flight
      while fetcher.call_count() < round {
        tokio::task::yield_now().await;
      }
      assert!(source.state().loading);

      gate.notify_one();
      assert_eq!(handle.await.unwrap(), None);
      assert!(!source.state().loading);
    }
  }

  #[tokio::test]
  async fn test_silent_fetch_leaves_loading_alone() {
    let gate = Arc::new(Notify::new());
    let mut stub = StubFetcher::ok(widgets_body());
    stub.gate = Some(gate.clone());
    let fetcher = Arc::new(stub);
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    // Settle the initial loading flag first
    gate.notify_one();
    source.fetch(FetchOptions::default()).await;
    assert!(!source.state().loading);

    let handle = tokio::spawn({
      let source = source.clone();
      async move { source.fetch(FetchOptions::silent().with_page(2)).await }
    });
    while fetcher.call_count() < 2 {
      tokio::task::yield_now().await;
    }
    assert!(!source.state().loading);

    gate.notify_one();
    assert!(handle.await.unwrap().is_some());
    assert!(!source.state().loading);
  }

  #[tokio::test]
  async fn test_search_params_and_signature() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    source
      .fetch(FetchOptions::default().with_search("  abc "))
      .await;
    assert_eq!(
      fetcher.last_call(),
      pairs(&[
        ("page", "1"),
        ("per_page", "10"),
        ("search", "abc"),
        ("name", "abc")
      ])
    );

    // Empty search is a different signature
    source.fetch(FetchOptions::default().with_search("")).await;
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(fetcher.last_call(), pairs(&[("page", "1"), ("per_page", "10")]));
  }

  #[tokio::test]
  async fn test_extra_query_skips_empty_values() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let mut query = BTreeMap::new();
    query.insert("status".to_string(), "paid".to_string());
    query.insert("brand_id".to_string(), "  ".to_string());
    let (source, _) = source_with(Some("/invoices"), fetcher.clone());
    let source = source.with_query(query).with_limit(25);

    source.fetch(FetchOptions::default()).await;
    assert_eq!(
      fetcher.last_call(),
      pairs(&[("page", "1"), ("per_page", "25"), ("status", "paid")])
    );
  }

  #[tokio::test]
  async fn test_deps_are_part_of_signature() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());

    source.fetch(FetchOptions::default()).await;
    source.set_deps(vec!["brand:7".to_string()]);
    source.fetch(FetchOptions::default()).await;
    assert_eq!(fetcher.call_count(), 2);
  }

  #[tokio::test]
  async fn test_search_resets_page() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher);

    source.set_page(4);
    assert_eq!(source.params().page, 4);
    source.search("acme");
    assert_eq!(source.params().page, 1);
    assert_eq!(source.params().search, "acme");

    source.set_page(3);
    source.set_limit(50);
    assert_eq!(source.params().page, 1);
    assert_eq!(source.params().limit, 50);
  }

  #[tokio::test]
  async fn test_page_navigation_is_bounded() {
    let fetcher = Arc::new(StubFetcher::ok(json!({ "data": [], "total": 25 })));
    let (source, _) = source_with(Some("/widgets"), fetcher);
    source.fetch(FetchOptions::default()).await;

    assert_eq!(source.page_count(), 3);
    source.prev_page();
    assert_eq!(source.params().page, 1);
    source.next_page();
    source.next_page();
    source.next_page();
    assert_eq!(source.params().page, 3);
  }

  #[tokio::test]
  async fn test_next_page_without_total_follows_full_pages() {
    let fetcher = Arc::new(StubFetcher::ok(json!({ "data": [{ "id": 1 }, { "id": 2 }] })));
    let (source, _) = source_with(Some("/widgets"), fetcher);
    source.set_limit(2);
    source.fetch(FetchOptions::default()).await;

    assert_eq!(source.state().total_rows, 0);
    source.next_page();
    assert_eq!(source.params().page, 2);
  }

  #[test]
  fn test_has_more() {
    assert!(has_more(1, 10, 25, 10));
    assert!(!has_more(3, 10, 25, 5));
    assert!(has_more(1, 2, 0, 2));
    assert!(!has_more(1, 10, 0, 4));
    assert!(!has_more(1, 10, 0, 0));
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_response_does_not_overwrite_newer() {
    let mut stub = StubFetcher::new(|params| {
      let page = params
        .iter()
        .find(|(k, _)| k == "page")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
      Ok(json!({ "data": [{ "page": page }], "total": 20 }))
    });
    stub.slow_first_page = Duration::from_millis(200);
    let (source, _) = source_with(Some("/widgets"), Arc::new(stub));

    let slow = tokio::spawn({
      let source = source.clone();
      async move { source.fetch(FetchOptions::default().with_page(1)).await }
    });
    tokio::task::yield_now().await;

    let fast = source.fetch(FetchOptions::default().with_page(2)).await;
    assert_eq!(fast.unwrap().items, vec![json!({"page": "2"})]);

    // The slow response still reaches its caller but not the shared state
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.items, vec![json!({"page": "1"})]);
    assert_eq!(source.state().items, vec![json!({"page": "2"})]);
    assert!(!source.state().loading);
  }

  #[tokio::test]
  async fn test_effect_refetches_on_search() {
    let fetcher = Arc::new(StubFetcher::ok(widgets_body()));
    let (source, _) = source_with(Some("/widgets"), fetcher.clone());
    source.set_page(2);

    let effect = source.spawn_effect();
    let mut states = source.subscribe();
    states.wait_for(|s| !s.loading).await.unwrap();
    assert_eq!(fetcher.call_count(), 1);

    source.search("abc");
    tokio::time::timeout(Duration::from_secs(5), async {
      while fetcher.call_count() < 2 {
        tokio::task::yield_now().await;
      }
    })
    .await
    .unwrap();

    assert_eq!(
      fetcher.last_call(),
      pairs(&[
        ("page", "1"),
        ("per_page", "10"),
        ("search", "abc"),
        ("name", "abc")
      ])
    );
    effect.abort();
  }
}
