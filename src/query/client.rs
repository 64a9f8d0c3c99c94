//! Shared query cache: entries, freshness, retention and notifications.

use super::observer::Query;
use super::QueryKey;
use crate::api::ApiError;
use futures::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Type-erased cached value
pub(crate) type QueryValue = Arc<dyn Any + Send + Sync>;

/// Produces a fresh value for one bound key
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<QueryValue, ApiError>> + Send + Sync>;

type Listener<K> = Arc<dyn Fn(&K) + Send + Sync>;

/// Default retention for entries nobody observes
const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// Per-query freshness and retention settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
  /// Data older than this is refetched on mount. Zero means always.
  pub stale_time: Duration,
  /// How long an entry survives after its last observer unmounts
  pub cache_time: Duration,
  /// Keep showing the previous key's data while a new key loads
  pub keep_previous_data: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::ZERO,
      cache_time: DEFAULT_CACHE_TIME,
      keep_previous_data: false,
    }
  }
}

impl QueryOptions {
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
    self.cache_time = cache_time;
    self
  }

  pub fn keep_previous_data(mut self) -> Self {
    self.keep_previous_data = true;
    self
  }
}

struct Entry {
  data: Option<QueryValue>,
  error: Option<ApiError>,
  updated_at: Option<Instant>,
  stale_time: Duration,
  cache_time: Duration,
  invalidated: bool,
  fetching: bool,
  refetch_queued: bool,
  observers: usize,
  inactive_since: Option<Instant>,
  fetcher: Option<Fetcher>,
}

impl Entry {
  fn new(now: Instant) -> Self {
    Self {
      data: None,
      error: None,
      updated_at: None,
      stale_time: Duration::ZERO,
      cache_time: DEFAULT_CACHE_TIME,
      invalidated: false,
      fetching: false,
      refetch_queued: false,
      observers: 0,
      inactive_since: Some(now),
      fetcher: None,
    }
  }

  fn is_stale(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.updated_at {
      Some(at) => now.saturating_duration_since(at) >= self.stale_time,
      None => true,
    }
  }

  fn is_expired(&self, now: Instant) -> bool {
    self.observers == 0
      && !self.fetching
      && self
        .inactive_since
        .is_some_and(|since| now.saturating_duration_since(since) >= self.cache_time)
  }

  fn write(&mut self, value: QueryValue, now: Instant) {
    self.data = Some(value);
    self.error = None;
    self.updated_at = Some(now);
    self.invalidated = false;
  }
}

/// Read-only view of one entry handed to observers
pub(crate) struct EntrySnapshot {
  pub data: Option<QueryValue>,
  pub error: Option<ApiError>,
  pub fetching: bool,
}

struct Inner<K> {
  entries: HashMap<K, Entry>,
  listeners: Vec<(u64, Listener<K>)>,
  next_listener_id: u64,
}

/// Process-wide query cache, shared by cloning.
///
/// Writes go through a fetch function, [`set_data`](Self::set_data) /
/// [`update_data`](Self::update_data), or [`invalidate`](Self::invalidate).
/// Every write notifies subscribed listeners synchronously, after the lock is
/// released.
pub struct QueryClient<K: QueryKey> {
  inner: Arc<Mutex<Inner<K>>>,
}

impl<K: QueryKey> Clone for QueryClient<K> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<K: QueryKey> Default for QueryClient<K> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: QueryKey> QueryClient<K> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        entries: HashMap::new(),
        listeners: Vec::new(),
        next_listener_id: 0,
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner<K>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Mount an observer on `key`, fetching if the cached data is missing or stale.
  ///
  /// `fetch` receives the key so the same query can move between keys (pages).
  pub fn query<T, F, Fut>(&self, key: K, options: QueryOptions, fetch: F) -> Query<K, T>
  where
    T: Send + Sync + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Query::mount(self.clone(), key, options, keyed(fetch))
  }

  /// Populate `key` without mounting an observer.
  ///
  /// Does nothing when the entry is fresh under `stale_time` or already being
  /// fetched. Returns whether a fetch was started.
  pub fn prefetch<T, F, Fut>(&self, key: K, stale_time: Duration, fetch: F) -> bool
  where
    T: Send + Sync + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let now = Instant::now();
    let mut inner = self.lock();
    let entry = inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));

    entry.stale_time = stale_time;
    if entry.fetching || !entry.is_stale(now) {
      return false;
    }
    // A mounted observer's fetch function stays in charge of the entry
    if entry.observers == 0 || entry.fetcher.is_none() {
      entry.fetcher = Some(bind(keyed(fetch), key.clone()));
    }

    debug!(key = %key.description(), "prefetch");
    self.start_fetch(&mut inner, &key);
    true
  }

  /// Cached value for `key`, fresh or stale
  pub fn get_data<T: Send + Sync + 'static>(&self, key: &K) -> Option<Arc<T>> {
    let inner = self.lock();
    let value = inner.entries.get(key)?.data.clone()?;
    value.downcast::<T>().ok()
  }

  /// Overwrite the cached value for `key` without fetching
  pub fn set_data<T: Send + Sync + 'static>(&self, key: K, value: T) {
    let now = Instant::now();
    {
      let mut inner = self.lock();
      inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(now))
        .write(Arc::new(value), now);
    }
    debug!(key = %key.description(), "set data");
    self.notify(&key);
  }

  /// Replace the cached value of every matching key that holds a `T`.
  ///
  /// Entries without data, or with data of another type, are left alone.
  /// Returns the keys that were updated.
  pub fn update_data_where<T, P, F>(&self, mut predicate: P, mut update: F) -> Vec<K>
  where
    T: Clone + Send + Sync + 'static,
    P: FnMut(&K) -> bool,
    F: FnMut(&mut T),
  {
    let now = Instant::now();
    let mut updated = Vec::new();
    {
      let mut inner = self.lock();
      for (key, entry) in inner.entries.iter_mut() {
        if !predicate(key) {
          continue;
        }
        let Some(current) = entry.data.as_ref().and_then(|d| d.downcast_ref::<T>()) else {
          continue;
        };
        let mut next = current.clone();
        update(&mut next);
        entry.write(Arc::new(next), now);
        updated.push(key.clone());
      }
    }
    for key in &updated {
      self.notify(key);
    }
    updated
  }

  /// Update the cached value for one key; see [`update_data_where`](Self::update_data_where)
  pub fn update_data<T, F>(&self, key: &K, update: F) -> bool
  where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&mut T),
  {
    !self.update_data_where(|k| k == key, update).is_empty()
  }

  /// Mark `key` stale and refetch it if an observer is mounted
  pub fn invalidate(&self, key: &K) {
    self.invalidate_where(|k| k == key);
  }

  /// Mark every matching key stale and refetch those with mounted observers
  pub fn invalidate_where<P: FnMut(&K) -> bool>(&self, mut predicate: P) {
    let keys: Vec<K> = {
      let mut inner = self.lock();
      let keys: Vec<K> = inner
        .entries
        .keys()
        .filter(|k| predicate(*k))
        .cloned()
        .collect();

      for key in &keys {
        let Some(entry) = inner.entries.get_mut(key) else {
          continue;
        };
        entry.invalidated = true;
        if entry.observers == 0 {
          continue;
        }
        if entry.fetching {
          entry.refetch_queued = true;
        } else {
          self.start_fetch(&mut inner, key);
        }
      }
      keys
    };

    for key in &keys {
      debug!(key = %key.description(), "invalidated");
      self.notify(key);
    }
  }

  /// Drop entries that have had no observers for longer than their cache time.
  ///
  /// Returns the number of evicted entries.
  pub fn collect_garbage(&self) -> usize {
    let now = Instant::now();
    let mut inner = self.lock();
    let before = inner.entries.len();
    inner.entries.retain(|key, entry| {
      let expired = entry.is_expired(now);
      if expired {
        debug!(key = %key.description(), "evicted");
      }
      !expired
    });
    before - inner.entries.len()
  }

  /// Register a listener called after every write to any entry.
  ///
  /// The listener stays registered until the returned subscription is dropped.
  pub fn subscribe<F>(&self, listener: F) -> Subscription<K>
  where
    F: Fn(&K) + Send + Sync + 'static,
  {
    let mut inner = self.lock();
    let id = inner.next_listener_id;
    inner.next_listener_id += 1;
    inner.listeners.push((id, Arc::new(listener)));
    Subscription {
      inner: Arc::downgrade(&self.inner),
      id,
    }
  }

  pub fn contains(&self, key: &K) -> bool {
    self.lock().entries.contains_key(key)
  }

  // ==========================================================================
  // Observer plumbing
  // ==========================================================================

  pub(crate) fn mount(&self, key: &K, options: QueryOptions, fetcher: Fetcher) {
    let now = Instant::now();
    let mut inner = self.lock();
    let entry = inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));

    entry.observers += 1;
    entry.inactive_since = None;
    entry.stale_time = options.stale_time;
    entry.cache_time = options.cache_time;
    entry.fetcher = Some(fetcher);

    if !entry.fetching && entry.is_stale(now) {
      self.start_fetch(&mut inner, key);
    }
  }

  pub(crate) fn unmount(&self, key: &K) {
    let mut inner = self.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.observers = entry.observers.saturating_sub(1);
      if entry.observers == 0 {
        entry.inactive_since = Some(Instant::now());
      }
    }
  }

  /// Fetch `key` now unless a fetch is already in flight
  pub(crate) fn refetch(&self, key: &K) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };
    if entry.fetching {
      entry.refetch_queued = true;
      return;
    }
    self.start_fetch(&mut inner, key);
  }

  pub(crate) fn snapshot(&self, key: &K) -> Option<EntrySnapshot> {
    let inner = self.lock();
    inner.entries.get(key).map(|entry| EntrySnapshot {
      data: entry.data.clone(),
      error: entry.error.clone(),
      fetching: entry.fetching,
    })
  }

  fn start_fetch(&self, inner: &mut Inner<K>, key: &K) {
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };
    let Some(fetcher) = entry.fetcher.clone() else {
      return;
    };
    entry.fetching = true;
    entry.refetch_queued = false;

    debug!(key = %key.description(), "fetch");
    let client = self.clone();
    let key = key.clone();
    let future = fetcher();
    tokio::spawn(async move {
      let result = future.await;
      client.finish_fetch(key, result);
    });
  }

  fn finish_fetch(&self, key: K, result: Result<QueryValue, ApiError>) {
    let now = Instant::now();
    {
      let mut inner = self.lock();
      let Some(entry) = inner.entries.get_mut(&key) else {
        return;
      };
      entry.fetching = false;
      match result {
        Ok(value) => entry.write(value, now),
        Err(error) => {
          debug!(key = %key.description(), %error, "fetch failed");
          entry.error = Some(error);
        }
      }
      if entry.refetch_queued && entry.observers > 0 {
        self.start_fetch(&mut inner, &key);
      }
    }
    self.notify(&key);
  }

  fn notify(&self, key: &K) {
    let listeners: Vec<Listener<K>> = self
      .lock()
      .listeners
      .iter()
      .map(|(_, listener)| Arc::clone(listener))
      .collect();
    for listener in listeners {
      listener(key);
    }
  }
}

/// Keeps a cache listener registered; dropping it unsubscribes
pub struct Subscription<K> {
  inner: Weak<Mutex<Inner<K>>>,
  id: u64,
}

impl<K> Drop for Subscription<K> {
  fn drop(&mut self) {
    if let Some(inner) = self.inner.upgrade() {
      let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
      inner.listeners.retain(|(id, _)| *id != self.id);
    }
  }
}

/// Fetch function that receives the key it is fetching for
pub(crate) type KeyedFetch<K, T> =
  Arc<dyn Fn(K) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

pub(crate) fn keyed<K, T, F, Fut>(fetch: F) -> KeyedFetch<K, T>
where
  K: QueryKey,
  T: Send + Sync + 'static,
  F: Fn(K) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  Arc::new(move |key: K| -> BoxFuture<'static, Result<T, ApiError>> { Box::pin(fetch(key)) })
}

/// Bind a keyed fetch function to one key, erasing the value type
pub(crate) fn bind<K, T>(fetch: KeyedFetch<K, T>, key: K) -> Fetcher
where
  K: QueryKey,
  T: Send + Sync + 'static,
{
  Arc::new(move || -> BoxFuture<'static, Result<QueryValue, ApiError>> {
    let future = fetch(key.clone());
    Box::pin(async move { future.await.map(|value| Arc::new(value) as QueryValue) })
  })
}
