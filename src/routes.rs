//! Navigable locations and their string form.

use crate::api::types::StudentId;
use std::fmt;

/// A location in the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// `/students?page=n`
  StudentList { page: u32 },
  /// `/students/add`
  AddStudent,
  /// `/students/{id}`
  EditStudent { id: StudentId },
}

impl Default for Route {
  fn default() -> Self {
    Route::StudentList { page: 1 }
  }
}

impl Route {
  /// Parse a location such as `/students/?page=2`.
  ///
  /// Unknown paths resolve to the first list page; a missing or invalid
  /// `page` parameter resolves to page 1.
  pub fn parse(location: &str) -> Self {
    let (path, query) = match location.split_once('?') {
      Some((path, query)) => (path, Some(query)),
      None => (location, None),
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
      ["students", "add"] => Route::AddStudent,
      ["students", id] => match id.parse::<StudentId>() {
        Ok(id) if id != 0 => Route::EditStudent { id },
        _ => Route::default(),
      },
      _ => Route::StudentList {
        page: query.map(page_param).unwrap_or(1),
      },
    }
  }
}

/// Read the `page` query parameter, falling back to 1 when absent or invalid
fn page_param(query: &str) -> u32 {
  query
    .split('&')
    .filter_map(|pair| pair.split_once('='))
    .find(|(key, _)| *key == "page")
    .and_then(|(_, value)| value.parse::<u32>().ok())
    .filter(|page| *page > 0)
    .unwrap_or(1)
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Route::StudentList { page } => write!(f, "/students/?page={}", page),
      Route::AddStudent => write!(f, "/students/add"),
      Route::EditStudent { id } => write!(f, "/students/{}", id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_list_page() {
    assert_eq!(Route::parse("/students/?page=2"), Route::StudentList { page: 2 });
    assert_eq!(Route::parse("/students?foo=1&page=3"), Route::StudentList { page: 3 });
  }

  #[test]
  fn test_invalid_page_falls_back_to_first() {
    for location in [
      "/students",
      "/students?page=",
      "/students?page=0",
      "/students?page=-1",
      "/students?page=abc",
      "/",
      "/unknown/path",
    ] {
      assert_eq!(Route::parse(location), Route::StudentList { page: 1 }, "{}", location);
    }
  }

  #[test]
  fn test_parse_form_routes() {
    assert_eq!(Route::parse("/students/add"), Route::AddStudent);
    assert_eq!(Route::parse("/students/5"), Route::EditStudent { id: 5 });
    assert_eq!(Route::parse("/students/0"), Route::default());
  }

  #[test]
  fn test_display_parses_back() {
    for route in [
      Route::StudentList { page: 4 },
      Route::AddStudent,
      Route::EditStudent { id: 12 },
    ] {
      assert_eq!(Route::parse(&route.to_string()), route);
    }
  }
}
