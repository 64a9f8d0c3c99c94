mod components;
mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb = app.breadcrumb();
  let title = app.title().to_string();
  let Some(view) = app.current_view_mut() else {
    return;
  };

  let location = view.route().to_string();
  draw_header(frame, chunks[0], &title, &location, &view.shortcuts());
  view.render(frame, chunks[1]);
  let status = view.status();
  draw_footer(frame, chunks[2], &breadcrumb, status.as_deref());
}

/// Keep the table selection within `len` rows, selecting the first row when
/// rows appear
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_follows_rows() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(2));
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(1));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
