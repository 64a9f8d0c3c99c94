use crate::api::error::ApiError;
use crate::config::ApiConfig;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A response as seen by the resource layer: status, lower-cased headers and
/// the body decoded as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
  pub status: u16,
  pub headers: HashMap<String, String>,
  pub body: Value,
}

impl HttpResponse {
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }
}

/// Minimal HTTP surface used by the resource API.
///
/// Paths are relative to the configured base address. Implementations fail
/// with `ApiError::Http` on non-2xx statuses and `ApiError::Transport` when no
/// response was received.
#[async_trait]
pub trait HttpBackend: Send + Sync {
  async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<HttpResponse, ApiError>;
  async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError>;
  async fn put(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError>;
  async fn delete(&self, path: &str) -> Result<HttpResponse, ApiError>;
}

/// Hook applied to every completed request, successful or not
pub trait ResponseInterceptor: Send + Sync {
  fn on_response(&self, response: HttpResponse) -> Result<HttpResponse, ApiError>;
  fn on_error(&self, error: ApiError) -> ApiError;
}

/// Interceptor that leaves responses and errors untouched
pub struct PassThrough;

impl ResponseInterceptor for PassThrough {
  fn on_response(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
    debug!(status = response.status, "response");
    Ok(response)
  }

  fn on_error(&self, error: ApiError) -> ApiError {
    debug!(%error, "request failed");
    error
  }
}

/// REST client bound to one base address, timeout and default header
#[derive(Clone)]
pub struct RestClient {
  http: reqwest::Client,
  base_url: Url,
  interceptor: Arc<dyn ResponseInterceptor>,
}

impl RestClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut base = config.base_url.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid base URL {}: {}", config.base_url, e))?;

    let mut headers = HeaderMap::new();
    let name = HeaderName::from_bytes(config.header.name.as_bytes())
      .map_err(|e| eyre!("Invalid header name {}: {}", config.header.name, e))?;
    let value = HeaderValue::from_str(&config.header.value)
      .map_err(|e| eyre!("Invalid header value for {}: {}", config.header.name, e))?;
    headers.insert(name, value);

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      interceptor: Arc::new(PassThrough),
    })
  }

  /// Replace the response interceptor
  #[allow(dead_code)]
  pub fn with_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
    self.interceptor = interceptor;
    self
  }

  fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
    let mut url = self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::Transport(format!("invalid path {}: {}", path, e)))?;
    if !params.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in params {
        pairs.append_pair(key, value);
      }
    }
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, ApiError> {
    let result = match request.send().await {
      Ok(response) => read_response(response).await,
      Err(e) => Err(ApiError::Transport(e.to_string())),
    };

    match result {
      Ok(response) => self.interceptor.on_response(response),
      Err(error) => Err(self.interceptor.on_error(error)),
    }
  }

  fn with_json(request: reqwest::RequestBuilder, body: &Value) -> Result<reqwest::RequestBuilder, ApiError> {
    let bytes = serde_json::to_vec(body)?;
    Ok(request.header(CONTENT_TYPE, "application/json").body(bytes))
  }
}

#[async_trait]
impl HttpBackend for RestClient {
  async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<HttpResponse, ApiError> {
    let url = self.url(path, params)?;
    debug!(%url, "GET");
    self.send(self.http.get(url)).await
  }

  async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
    let url = self.url(path, &[])?;
    debug!(%url, "POST");
    self.send(Self::with_json(self.http.post(url), body)?).await
  }

  async fn put(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
    let url = self.url(path, &[])?;
    debug!(%url, "PUT");
    self.send(Self::with_json(self.http.put(url), body)?).await
  }

  async fn delete(&self, path: &str) -> Result<HttpResponse, ApiError> {
    let url = self.url(path, &[])?;
    debug!(%url, "DELETE");
    self.send(self.http.delete(url)).await
  }
}

async fn read_response(response: reqwest::Response) -> Result<HttpResponse, ApiError> {
  let status = response.status().as_u16();
  let headers = response
    .headers()
    .iter()
    .filter_map(|(name, value)| {
      value
        .to_str()
        .ok()
        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
    })
    .collect();
  let bytes = response
    .bytes()
    .await
    .map_err(|e| ApiError::Transport(e.to_string()))?;
  let body = parse_body(&bytes);

  if (200..300).contains(&status) {
    Ok(HttpResponse {
      status,
      headers,
      body,
    })
  } else {
    Err(ApiError::Http { status, body })
  }
}

/// Decode a response body: JSON when possible, otherwise the raw text as a
/// JSON string. An empty body decodes to `null`.
fn parse_body(bytes: &[u8]) -> Value {
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Value::Null;
  }
  serde_json::from_slice(bytes)
    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::HeaderConfig;
  use serde_json::json;

  fn config(base_url: &str) -> ApiConfig {
    ApiConfig {
      base_url: base_url.to_string(),
      timeout_secs: 1,
      header: HeaderConfig {
        name: "X-Custom-Header".to_string(),
        value: "foobar".to_string(),
      },
    }
  }

  #[test]
  fn test_parse_body() {
    assert_eq!(parse_body(b""), Value::Null);
    assert_eq!(parse_body(b"  \n"), Value::Null);
    assert_eq!(parse_body(br#"{"a":1}"#), json!({"a": 1}));
    assert_eq!(parse_body(b"Not Found"), json!("Not Found"));
  }

  #[test]
  fn test_url_joins_base_and_params() {
    let client = RestClient::new(&config("http://localhost:4000")).unwrap();
    let url = client
      .url("students", &[("_page", "2".to_string()), ("_limit", "10".to_string())])
      .unwrap();
    assert_eq!(
      url.as_str(),
      "http://localhost:4000/students?_page=2&_limit=10"
    );

    let url = client.url("/students/5", &[]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:4000/students/5");
  }

  #[test]
  fn test_base_path_is_preserved() {
    let client = RestClient::new(&config("http://localhost:4000/api")).unwrap();
    let url = client.url("students", &[]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:4000/api/students");
  }

  #[test]
  fn test_invalid_config_is_rejected() {
    assert!(RestClient::new(&config("not a url")).is_err());

    let mut bad_header = config("http://localhost:4000");
    bad_header.header.name = "bad header".to_string();
    assert!(RestClient::new(&bad_header).is_err());
  }

  #[test]
  fn test_response_header_lookup_is_case_insensitive() {
    let response = HttpResponse {
      status: 200,
      headers: HashMap::from([("x-total-count".to_string(), "25".to_string())]),
      body: Value::Null,
    };
    assert_eq!(response.header("X-Total-Count"), Some("25"));
  }

  #[tokio::test]
  async fn test_connection_refused_is_transport_error() {
    // Port 9 (discard) is not expected to accept HTTP connections
    let client = RestClient::new(&config("http://127.0.0.1:9")).unwrap();
    let err = client.get("students", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
  }

  /// Counts errors and relabels them
  struct Relabel(std::sync::atomic::AtomicUsize);

  impl ResponseInterceptor for Relabel {
    fn on_response(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
      Ok(response)
    }

    fn on_error(&self, error: ApiError) -> ApiError {
      self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      ApiError::Decode(format!("relabelled: {}", error))
    }
  }

  #[tokio::test]
  async fn test_interceptor_sees_every_error() {
    let interceptor = Arc::new(Relabel(std::sync::atomic::AtomicUsize::new(0)));
    let client = RestClient::new(&config("http://127.0.0.1:9"))
      .unwrap()
      .with_interceptor(interceptor.clone());

    let err = client.get("students", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(ref msg) if msg.starts_with("relabelled")));
    client.delete("students/1").await.unwrap_err();
    assert_eq!(interceptor.0.load(std::sync::atomic::Ordering::SeqCst), 2);
  }
}
