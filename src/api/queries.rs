//! Cache keys and fetch functions for student queries.

use crate::api::error::ApiError;
use crate::api::students::StudentApi;
use crate::api::types::{Student, StudentId, StudentPage, PAGE_SIZE};
use crate::query::{QueryClient, QueryKey};
use futures::future::BoxFuture;
use std::time::Duration;

/// How long a single student stays fresh after it was fetched
pub const STUDENT_STALE_TIME: Duration = Duration::from_secs(10);

/// Retention of list pages nobody is looking at
pub const LIST_CACHE_TIME: Duration = Duration::from_secs(4);

/// Cache keys for student queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StudentQueryKey {
  /// One page of the student list
  Students { page: u32 },
  /// A single student by id
  Student { id: StudentId },
}

impl StudentQueryKey {
  pub fn page(&self) -> Option<u32> {
    match self {
      Self::Students { page } => Some(*page),
      Self::Student { .. } => None,
    }
  }

  pub fn student_id(&self) -> Option<StudentId> {
    match self {
      Self::Student { id } => Some(*id),
      Self::Students { .. } => None,
    }
  }

  pub fn is_list(&self) -> bool {
    matches!(self, Self::Students { .. })
  }
}

impl QueryKey for StudentQueryKey {
  fn description(&self) -> String {
    match self {
      Self::Students { page } => format!("students page {}", page),
      Self::Student { id } => format!("student {}", id),
    }
  }
}

/// Fetch function for `Students { page }` keys
pub fn fetch_students(
  api: &StudentApi,
) -> impl Fn(StudentQueryKey) -> BoxFuture<'static, Result<StudentPage, ApiError>> + Send + Sync + 'static
{
  let api = api.clone();
  move |key: StudentQueryKey| -> BoxFuture<'static, Result<StudentPage, ApiError>> {
    let api = api.clone();
    Box::pin(async move { api.list(key.page(), Some(PAGE_SIZE)).await })
  }
}

/// Fetch function for `Student { id }` keys
pub fn fetch_student(
  api: &StudentApi,
) -> impl Fn(StudentQueryKey) -> BoxFuture<'static, Result<Option<Student>, ApiError>> + Send + Sync + 'static
{
  let api = api.clone();
  move |key: StudentQueryKey| -> BoxFuture<'static, Result<Option<Student>, ApiError>> {
    let api = api.clone();
    Box::pin(async move { api.get(key.student_id()).await })
  }
}

/// Reflect a saved student in the cache without a round trip: the detail
/// entry is overwritten and the matching row of every cached list page is
/// patched in place.
pub fn store_student(client: &QueryClient<StudentQueryKey>, student: &Student) {
  client.set_data(StudentQueryKey::Student { id: student.id }, Some(student.clone()));

  let summary = student.summary();
  client.update_data_where(StudentQueryKey::is_list, |page: &mut StudentPage| {
    for row in page.students.iter_mut().filter(|row| row.id == summary.id) {
      *row = summary.clone();
    }
  });
}
