//! In-memory backend with json-server semantics, used by tests.

use crate::api::client::{HttpBackend, HttpResponse};
use crate::api::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct State {
  records: BTreeMap<u64, Value>,
  next_id: u64,
  calls: Vec<String>,
  offline: bool,
}

/// Fake `students` collection that records every request it receives
#[derive(Default)]
pub struct MemoryBackend {
  state: Mutex<State>,
  required: Vec<&'static str>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject writes that leave any of these fields empty with a 422
  pub fn with_required(mut self, fields: &[&'static str]) -> Self {
    self.required = fields.to_vec();
    self
  }

  /// Seed `count` students with ids 1..=count
  pub fn seeded(count: u64) -> Self {
    let backend = Self::new();
    {
      let mut state = backend.state.lock().unwrap();
      for id in 1..=count {
        state.records.insert(
          id,
          json!({
            "id": id,
            "first_name": format!("First{}", id),
            "last_name": format!("Last{}", id),
            "email": format!("student{}@example.com", id),
            "country": "Vietnam",
            "gender": "other",
            "avatar": "",
            "btc_address": "",
          }),
        );
      }
      state.next_id = count + 1;
    }
    backend
  }

  /// Requests received so far, formatted as `METHOD path[?query]`
  pub fn calls(&self) -> Vec<String> {
    self.state.lock().unwrap().calls.clone()
  }

  pub fn call_count(&self) -> usize {
    self.state.lock().unwrap().calls.len()
  }

  pub fn record(&self, id: u64) -> Option<Value> {
    self.state.lock().unwrap().records.get(&id).cloned()
  }

  /// Make every subsequent request fail as if the server were unreachable
  pub fn set_offline(&self, offline: bool) {
    self.state.lock().unwrap().offline = offline;
  }

  fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(call);
    if state.offline {
      return Err(ApiError::Transport("connection refused".to_string()));
    }
    Ok(state)
  }

  fn validate(&self, body: &Value) -> Result<(), ApiError> {
    let errors: Map<String, Value> = self
      .required
      .iter()
      .filter(|field| {
        body
          .get(**field)
          .and_then(Value::as_str)
          .map_or(true, str::is_empty)
      })
      .map(|field| (field.to_string(), json!("required")))
      .collect();

    if errors.is_empty() {
      Ok(())
    } else {
      Err(ApiError::Http {
        status: 422,
        body: json!({ "error": errors }),
      })
    }
  }
}

fn ok(body: Value) -> HttpResponse {
  HttpResponse {
    status: 200,
    headers: HashMap::new(),
    body,
  }
}

fn not_found() -> ApiError {
  ApiError::Http {
    status: 404,
    body: json!({}),
  }
}

fn parse_id(path: &str) -> Option<u64> {
  path.trim_start_matches('/').strip_prefix("students/")?.parse().ok()
}

#[async_trait]
impl HttpBackend for MemoryBackend {
  async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<HttpResponse, ApiError> {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let call = if query.is_empty() {
      format!("GET {}", path)
    } else {
      format!("GET {}?{}", path, query.join("&"))
    };
    let state = self.begin(call)?;

    if let Some(id) = parse_id(path) {
      return state.records.get(&id).cloned().map(ok).ok_or_else(not_found);
    }

    let param = |name: &str| -> Option<usize> {
      params
        .iter()
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
    };
    let page = param("_page").unwrap_or(1).max(1);
    let limit = param("_limit").unwrap_or(10);

    let rows: Vec<Value> = state
      .records
      .values()
      .skip((page - 1) * limit)
      .take(limit)
      .map(|r| json!({ "id": r["id"], "avatar": r["avatar"], "last_name": r["last_name"], "email": r["email"] }))
      .collect();

    let mut response = ok(Value::Array(rows));
    response
      .headers
      .insert("x-total-count".to_string(), state.records.len().to_string());
    Ok(response)
  }

  async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
    let mut state = self.begin(format!("POST {}", path))?;
    self.validate(body)?;

    let id = state.next_id.max(1);
    state.next_id = id + 1;
    let mut record = body.clone();
    record["id"] = json!(id);
    state.records.insert(id, record.clone());
    Ok(HttpResponse {
      status: 201,
      ..ok(record)
    })
  }

  async fn put(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
    let mut state = self.begin(format!("PUT {} {}", path, body))?;
    let id = parse_id(path).ok_or_else(not_found)?;
    if !state.records.contains_key(&id) {
      return Err(not_found());
    }
    self.validate(body)?;

    let mut record = body.clone();
    record["id"] = json!(id);
    state.records.insert(id, record.clone());
    Ok(ok(record))
  }

  async fn delete(&self, path: &str) -> Result<HttpResponse, ApiError> {
    let mut state = self.begin(format!("DELETE {}", path))?;
    let id = parse_id(path).ok_or_else(not_found)?;
    state.records.remove(&id).ok_or_else(not_found)?;
    Ok(ok(json!({})))
  }
}
