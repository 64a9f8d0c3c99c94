use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by the REST client and the resource API.
///
/// The enum is `Clone` so a failed fetch can be stored in the query cache and
/// shown by every observer of the same key.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
  /// Network failure, connect error or timeout
  #[error("transport error: {0}")]
  Transport(String),

  /// The server answered with a non-2xx status
  #[error("HTTP {status}")]
  Http { status: u16, body: Value },

  /// A 2xx response whose body did not have the expected shape
  #[error("unexpected response body: {0}")]
  Decode(String),
}

/// HTTP status the server uses for field-level validation failures
pub const UNPROCESSABLE_ENTITY: u16 = 422;

impl ApiError {
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Per-field validation messages from a 422 `{ "error": { field: message } }` body.
  ///
  /// Returns `None` for any other error so callers can fall back to a generic
  /// message.
  pub fn validation_errors(&self) -> Option<BTreeMap<String, String>> {
    let ApiError::Http { status, body } = self else {
      return None;
    };
    if *status != UNPROCESSABLE_ENTITY {
      return None;
    }

    let fields = body.get("error")?.as_object()?;
    Some(
      fields
        .iter()
        .filter_map(|(name, message)| {
          let message = match message {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
          };
          Some((name.clone(), message))
        })
        .collect(),
    )
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(e: serde_json::Error) -> Self {
    ApiError::Decode(e.to_string())
  }
}
