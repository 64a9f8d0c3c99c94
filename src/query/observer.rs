use super::client::{bind, KeyedFetch, QueryClient, QueryOptions};
use super::QueryKey;
use crate::api::ApiError;
use std::sync::Arc;

/// A mounted observer of one cache key.
///
/// Reads always go to the shared cache, so every observer of a key sees the
/// same value. Dropping the query unmounts it and starts the entry's
/// retention countdown.
pub struct Query<K: QueryKey, T> {
  client: QueryClient<K>,
  key: K,
  options: QueryOptions,
  fetch: KeyedFetch<K, T>,
  /// Last data of a previous key, shown until the current key resolves
  placeholder: Option<Arc<T>>,
}

impl<K: QueryKey, T: Send + Sync + 'static> Query<K, T> {
  pub(crate) fn mount(
    client: QueryClient<K>,
    key: K,
    options: QueryOptions,
    fetch: KeyedFetch<K, T>,
  ) -> Self {
    client.mount(&key, options, bind(fetch.clone(), key.clone()));
    Self {
      client,
      key,
      options,
      fetch,
      placeholder: None,
    }
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  fn current(&self) -> Option<Arc<T>> {
    let snapshot = self.client.snapshot(&self.key)?;
    snapshot.data?.downcast::<T>().ok()
  }

  /// Last known value for this key, or the previous key's value while this
  /// one loads when `keep_previous_data` is set. Stale data is still returned.
  pub fn data(&self) -> Option<Arc<T>> {
    self.current().or_else(|| self.placeholder.clone())
  }

  /// True while the key has never produced data or an error and there is no
  /// placeholder to show
  pub fn is_loading(&self) -> bool {
    if self.placeholder.is_some() {
      return false;
    }
    match self.client.snapshot(&self.key) {
      Some(snapshot) => snapshot.data.is_none() && snapshot.error.is_none(),
      None => true,
    }
  }

  /// True when `data()` is the previous key's value
  pub fn is_placeholder(&self) -> bool {
    self.placeholder.is_some() && self.current().is_none()
  }

  /// True while a request for this key is in flight
  pub fn is_fetching(&self) -> bool {
    self
      .client
      .snapshot(&self.key)
      .is_some_and(|snapshot| snapshot.fetching)
  }

  /// Error of the most recent failed fetch, cleared by the next success
  pub fn error(&self) -> Option<ApiError> {
    self.client.snapshot(&self.key)?.error
  }

  /// Force a refetch of the current key
  pub fn refetch(&mut self) {
    self.client.refetch(&self.key);
  }

  /// Move the observer to another key, e.g. the next page
  pub fn set_key(&mut self, key: K) {
    if key == self.key {
      return;
    }

    self.placeholder = if self.options.keep_previous_data {
      self.data()
    } else {
      None
    };

    self.client.unmount(&self.key);
    self.key = key;
    self
      .client
      .mount(&self.key, self.options, bind(self.fetch.clone(), self.key.clone()));

    if self.current().is_some() {
      self.placeholder = None;
    }
  }
}

impl<K: QueryKey, T> Drop for Query<K, T> {
  fn drop(&mut self) {
    self.client.unmount(&self.key);
  }
}

impl<K: QueryKey, T> std::fmt::Debug for Query<K, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::testing::{settle, TestKey};
  use std::time::Duration;

  fn page_fetch(key: TestKey) -> impl std::future::Future<Output = Result<String, ApiError>> {
    async move {
      match key {
        TestKey::List(page) => Ok(format!("page {}", page)),
        TestKey::Item(id) => Ok(format!("item {}", id)),
      }
    }
  }

  #[tokio::test]
  async fn test_loading_until_first_data() {
    let client = QueryClient::new();
    let query = client.query(TestKey::List(1), QueryOptions::default(), page_fetch);

    assert!(query.is_loading());
    assert!(query.is_fetching());
    assert!(query.data().is_none());

    settle().await;
    assert!(!query.is_loading());
    assert!(!query.is_fetching());
    assert_eq!(query.data().as_deref().map(String::as_str), Some("page 1"));
  }

  #[tokio::test]
  async fn test_error_is_not_loading() {
    let client = QueryClient::new();
    let query = client.query(TestKey::Item(1), QueryOptions::default(), |_key| async {
      Err::<String, _>(ApiError::Http {
        status: 404,
        body: serde_json::Value::Null,
      })
    });
    settle().await;

    assert!(!query.is_loading());
    assert_eq!(query.error().and_then(|e| e.status()), Some(404));
  }

  #[tokio::test]
  async fn test_keep_previous_data_while_next_page_loads() {
    let client = QueryClient::new();
    let options = QueryOptions::default().keep_previous_data();
    let mut query = client.query(TestKey::List(1), options, page_fetch);
    settle().await;

    query.set_key(TestKey::List(2));
    assert!(!query.is_loading());
    assert!(query.is_placeholder());
    assert_eq!(query.data().as_deref().map(String::as_str), Some("page 1"));

    settle().await;
    assert!(!query.is_placeholder());
    assert_eq!(query.data().as_deref().map(String::as_str), Some("page 2"));
  }

  #[tokio::test]
  async fn test_without_keep_previous_data_key_change_loads() {
    let client = QueryClient::new();
    let mut query = client.query(TestKey::List(1), QueryOptions::default(), page_fetch);
    settle().await;

    query.set_key(TestKey::List(2));
    assert!(query.is_loading());
    assert!(query.data().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_set_key_releases_previous_key() {
    let client = QueryClient::new();
    let options = QueryOptions::default().with_cache_time(Duration::from_secs(4));
    let mut query = client.query(TestKey::List(1), options, page_fetch);
    settle().await;

    query.set_key(TestKey::List(2));
    settle().await;
    tokio::time::advance(Duration::from_secs(5)).await;
    client.collect_garbage();

    assert!(!client.contains(&TestKey::List(1)));
    assert!(client.contains(&TestKey::List(2)));
  }

  #[tokio::test]
  async fn test_observers_share_set_data() {
    let client = QueryClient::new();
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(60));
    let a = client.query(TestKey::Item(5), options, page_fetch);
    let b = client.query(TestKey::Item(5), options, page_fetch);
    settle().await;

    client.set_data(TestKey::Item(5), "edited".to_string());
    assert_eq!(a.data().as_deref().map(String::as_str), Some("edited"));
    assert_eq!(b.data().as_deref().map(String::as_str), Some("edited"));
  }
}
