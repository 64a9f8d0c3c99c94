use crate::api::queries::{fetch_student, fetch_students, LIST_CACHE_TIME, STUDENT_STALE_TIME};
use crate::api::types::{StudentId, StudentPage, StudentSummary, PAGE_SIZE};
use crate::api::{StudentApi, StudentQueryKey};
use crate::query::{Mutation, Query, QueryClient, QueryOptions};
use crate::routes::Route;
use crate::ui::components::Pagination;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{avatar_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use std::sync::Arc;
use tracing::{debug, warn};

/// Paginated table of students
pub struct StudentListView {
  api: StudentApi,
  client: QueryClient<StudentQueryKey>,
  page: u32,
  query: Query<StudentQueryKey, StudentPage>,
  table_state: TableState,
  /// Row whose detail was last prefetched
  hovered: Option<StudentId>,
  delete: Mutation<StudentId>,
}

impl StudentListView {
  pub fn new(page: u32, api: StudentApi, client: QueryClient<StudentQueryKey>) -> Self {
    let page = page.max(1);
    let options = QueryOptions::default()
      .with_cache_time(LIST_CACHE_TIME)
      .keep_previous_data();
    let query = client.query(
      StudentQueryKey::Students { page },
      options,
      fetch_students(&api),
    );

    Self {
      api,
      client,
      page,
      query,
      table_state: TableState::default(),
      hovered: None,
      delete: Mutation::new(),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  fn data(&self) -> Option<Arc<StudentPage>> {
    self.query.data()
  }

  fn selected_student(&self) -> Option<StudentSummary> {
    let idx = self.table_state.selected()?;
    self.data()?.students.get(idx).cloned()
  }

  pub fn pagination(&self) -> Pagination {
    let page_count = self.data().map(|d| d.page_count()).unwrap_or(0);
    Pagination::new(self.page, page_count)
  }

  /// Show another page; the current rows stay visible until it loads
  pub fn go_to_page(&mut self, page: u32) {
    if page == self.page || page == 0 {
      return;
    }
    debug!(from = self.page, to = page, "change page");
    self.page = page;
    self.query.set_key(StudentQueryKey::Students { page });
    self.table_state.select(None);
    self.hovered = None;
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.data().map(|d| d.students.len()).unwrap_or(0);
    if len == 0 {
      return;
    }
    let next = match self.table_state.selected() {
      Some(current) => (current as i32 + delta).clamp(0, len as i32 - 1) as usize,
      None => 0,
    };
    self.table_state.select(Some(next));
    self.hover_selected();
  }

  /// Warm the cache for the row under the cursor so opening it is instant
  fn hover_selected(&mut self) {
    let Some(student) = self.selected_student() else {
      return;
    };
    if self.hovered == Some(student.id) {
      return;
    }
    self.hovered = Some(student.id);
    self.client.prefetch(
      StudentQueryKey::Student { id: student.id },
      STUDENT_STALE_TIME,
      fetch_student(&self.api),
    );
  }

  fn delete_selected(&mut self) {
    let Some(student) = self.selected_student() else {
      return;
    };
    let api = self.api.clone();
    let client = self.client.clone();
    let key = StudentQueryKey::Students { page: self.page };
    let id = student.id;

    self.delete.mutate(async move {
      api.delete(id).await?;
      client.invalidate(&key);
      Ok(id)
    });
  }

  /// Clamp the cursor to the current rows. The row it lands on counts as
  /// hovered, except while the previous page is still shown.
  fn sync_selection(&mut self) {
    let len = self.data().map(|d| d.students.len()).unwrap_or(0);
    ensure_valid_selection(&mut self.table_state, len);
    if !self.query.is_placeholder() {
      self.hover_selected();
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    self.sync_selection();
    let data = self.data();

    let pagination = self.pagination();
    let title = if self.query.is_loading() {
      " Students (loading...) ".to_string()
    } else if let Some(e) = self.query.error() {
      format!(" Students (error: {}) ", e)
    } else if self.query.is_placeholder() || self.query.is_fetching() {
      format!(" Students [page {}] (refreshing...) ", self.page)
    } else {
      format!(
        " Students [page {}/{}] ",
        self.page,
        pagination.page_count.max(1)
      )
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.query.is_loading() {
      // Skeleton rows while the first page loads
      let lines: Vec<Line> = (0..PAGE_SIZE)
        .map(|_| {
          Line::styled(
            "░".repeat(area.width.saturating_sub(4) as usize),
            Style::default().fg(Color::DarkGray),
          )
        })
        .chain(std::iter::once(Line::raw("Loading...")))
        .collect();
      frame.render_widget(Paragraph::new(lines).block(block), area);
      return;
    }

    let Some(data) = data.filter(|d| !d.students.is_empty()) else {
      let content = if self.query.error().is_some() {
        "Failed to load students. Press 'r' to retry."
      } else {
        "No students found. Press 'a' to add one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let rows: Vec<Row> = data
      .students
      .iter()
      .map(|student| {
        Row::new(vec![
          Span::styled(student.id.to_string(), Style::default().fg(Color::Cyan)),
          Span::styled(avatar_label(&student.avatar), Style::default().fg(Color::DarkGray)),
          Span::raw(truncate(&student.last_name, 24)),
          Span::raw(truncate(&student.email, 40)),
        ])
      })
      .collect();

    let header = Row::new(vec!["#", "Avatar", "Name", "Email"])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(
      rows,
      [
        Constraint::Length(6),
        Constraint::Length(16),
        Constraint::Length(26),
        Constraint::Min(10),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('h') | KeyCode::Left => {
        if let Some(page) = self.pagination().previous() {
          self.go_to_page(page);
        }
      }
      KeyCode::Char('l') | KeyCode::Right => {
        if let Some(page) = self.pagination().next() {
          self.go_to_page(page);
        }
      }
      KeyCode::Char(c @ '1'..='9') => {
        let page = c.to_digit(10).unwrap_or(1);
        if self.pagination().contains(page) {
          self.go_to_page(page);
        }
      }
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('a') => Some(ViewAction::Navigate(Route::AddStudent)),
      KeyCode::Enter | KeyCode::Char('e') => {
        let student = self.selected_student()?;
        Some(ViewAction::Navigate(Route::EditStudent { id: student.id }))
      }
      KeyCode::Char('d') => {
        self.delete_selected();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for StudentListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(3),    // Table
        Constraint::Length(1), // Pagination
      ])
      .split(area);

    self.render_table(frame, chunks[0]);
    self.pagination().render(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Students [page {}]", self.page)
  }

  fn route(&self) -> Route {
    Route::StudentList { page: self.page }
  }

  fn on_cache_update(&mut self, key: &StudentQueryKey) {
    if key == self.query.key() {
      self.sync_selection();
    }
  }

  fn tick(&mut self) {
    if self.delete.poll() {
      match self.delete.error() {
        Some(e) => warn!(error = %e, "delete failed"),
        None => debug!(id = ?self.delete.data(), "student deleted"),
      }
    }
  }

  fn status(&self) -> Option<String> {
    if self.delete.is_pending() {
      return Some("Deleting...".to_string());
    }
    self
      .delete
      .error()
      .map(|e| format!("Delete failed: {}", e))
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("a", "add").with_priority(10),
      ShortcutInfo::new("enter", "edit").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("h/l", "page").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
