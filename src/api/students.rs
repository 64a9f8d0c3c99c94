use crate::api::client::HttpBackend;
use crate::api::error::ApiError;
use crate::api::types::{Student, StudentDraft, StudentId, StudentPage, StudentSummary, PAGE_SIZE};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const COLLECTION: &str = "students";
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Typed operations over the `students` collection.
///
/// Errors from the backend are returned unchanged: no retries, no mapping.
#[derive(Clone)]
pub struct StudentApi {
  http: Arc<dyn HttpBackend>,
}

impl StudentApi {
  pub fn new(http: Arc<dyn HttpBackend>) -> Self {
    Self { http }
  }

  /// Fetch one page of student summaries plus the collection total.
  ///
  /// `page` defaults to 1 and `limit` to 10 when unset or zero.
  pub async fn list(&self, page: Option<u32>, limit: Option<u32>) -> Result<StudentPage, ApiError> {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit.filter(|l| *l > 0).unwrap_or(PAGE_SIZE);

    let response = self
      .http
      .get(
        COLLECTION,
        &[("_page", page.to_string()), ("_limit", limit.to_string())],
      )
      .await?;

    let total = match response.header(TOTAL_COUNT_HEADER).map(str::parse::<u64>) {
      Some(Ok(total)) => total,
      other => {
        warn!(page, header = ?other, "list response has no usable total count");
        0
      }
    };
    let students: Vec<StudentSummary> = serde_json::from_value(response.body)?;

    Ok(StudentPage { students, total })
  }

  /// Fetch a single student. An unset or zero id yields `None` without a request.
  pub async fn get(&self, id: Option<StudentId>) -> Result<Option<Student>, ApiError> {
    let Some(id) = id.filter(|id| *id != 0) else {
      return Ok(None);
    };

    let response = self.http.get(&Self::path(id), &[]).await?;
    Ok(Some(serde_json::from_value(response.body)?))
  }

  /// Create a student; the server assigns the id
  pub async fn create(&self, draft: &StudentDraft) -> Result<Student, ApiError> {
    let body = serde_json::to_value(draft)?;
    let response = self.http.post(COLLECTION, &body).await?;
    Ok(serde_json::from_value(response.body)?)
  }

  /// Replace a student's fields, targeting the resource of `student.id`
  pub async fn update(&self, student: &Student) -> Result<Student, ApiError> {
    let body = serde_json::to_value(student)?;
    let response = self.http.put(&Self::path(student.id), &body).await?;
    // Servers that answer with an empty body still confirmed the write
    if response.body == Value::Null {
      return Ok(student.clone());
    }
    Ok(serde_json::from_value(response.body)?)
  }

  pub async fn delete(&self, id: StudentId) -> Result<(), ApiError> {
    self.http.delete(&Self::path(id)).await?;
    Ok(())
  }

  fn path(id: StudentId) -> String {
    format!("{}/{}", COLLECTION, id)
  }
}
