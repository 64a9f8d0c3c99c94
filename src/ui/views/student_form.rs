use crate::api::queries::{fetch_student, store_student, STUDENT_STALE_TIME};
use crate::api::types::{Field, Student, StudentDraft, StudentId, GENDERS};
use crate::api::{StudentApi, StudentQueryKey};
use crate::query::{Mutation, MutationState, Query, QueryClient, QueryOptions};
use crate::routes::Route;
use crate::ui::components::{ChoiceInput, KeyResult, TextInput};
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Whether the form creates a new student or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
  Add,
  Edit { id: StudentId },
}

/// Create/edit form for a single student.
///
/// All inputs write into one draft. A single `TextInput` edits whichever text
/// field has focus; the gender field uses a `ChoiceInput`.
pub struct StudentFormView {
  api: StudentApi,
  client: QueryClient<StudentQueryKey>,
  mode: FormMode,
  draft: StudentDraft,
  focus: usize,
  editor: TextInput,
  gender: ChoiceInput,
  /// Loaded record when editing
  student: Option<Query<StudentQueryKey, Option<Student>>>,
  /// Draft was filled from the loaded record
  populated: bool,
  /// Submit was refused because the record is not loaded
  unloaded_submit: bool,
  save: Mutation<Student>,
}

impl StudentFormView {
  pub fn new(mode: FormMode, api: StudentApi, client: QueryClient<StudentQueryKey>) -> Self {
    let student = match mode {
      FormMode::Add => None,
      FormMode::Edit { id } => Some(client.query(
        StudentQueryKey::Student { id },
        QueryOptions::default().with_stale_time(STUDENT_STALE_TIME),
        fetch_student(&api),
      )),
    };

    let mut view = Self {
      api,
      client,
      mode,
      draft: StudentDraft::default(),
      focus: 0,
      editor: TextInput::new(),
      gender: ChoiceInput::new(GENDERS),
      student,
      populated: false,
      unloaded_submit: false,
      save: Mutation::new(),
    };
    // A prefetched record is available right away
    view.populate();
    view
  }

  pub fn draft(&self) -> &StudentDraft {
    &self.draft
  }

  fn focused(&self) -> Field {
    Field::ALL[self.focus]
  }

  /// Fill the draft from the loaded record, once
  fn populate(&mut self) {
    if self.populated {
      return;
    }
    let Some(data) = self.student.as_ref().and_then(|q| q.data()) else {
      return;
    };
    let Some(student) = data.as_ref() else {
      return;
    };

    debug!(id = student.id, "populate form");
    self.draft = student.fields.clone();
    self.populated = true;
    self.unloaded_submit = false;
    self.sync_inputs();
  }

  /// Point the inputs at the draft after focus moves or the draft is replaced
  fn sync_inputs(&mut self) {
    self.gender.set_value(&self.draft.gender);
    let focused = self.focused();
    if focused == Field::Gender {
      self.editor.clear();
    } else {
      self.editor.set_value(self.draft.field(focused));
    }
  }

  fn move_focus(&mut self, delta: isize) {
    let len = Field::ALL.len() as isize;
    self.focus = (self.focus as isize + delta).rem_euclid(len) as usize;
    self.sync_inputs();
  }

  fn set_field(&mut self, field: Field, value: String) {
    *self.draft.field_mut(field) = value;
    // Editing after a result or error clears it
    if self.save.is_settled() {
      self.save.reset();
    }
  }

  fn submit(&mut self) {
    // An update replaces the whole record, so it needs the loaded fields
    if let FormMode::Edit { id } = self.mode {
      if !self.populated {
        debug!(id, "submit ignored before the record loaded");
        self.unloaded_submit = true;
        return;
      }
    }

    let api = self.api.clone();
    let draft = self.draft.clone();

    let started = match self.mode {
      FormMode::Add => self.save.mutate(async move { api.create(&draft).await }),
      FormMode::Edit { id } => {
        let client = self.client.clone();
        self.save.mutate(async move {
          let saved = api.update(&draft.with_id(id)).await?;
          store_student(&client, &saved);
          Ok(saved)
        })
      }
    };
    if !started {
      debug!("submit ignored while saving");
    }
  }

  fn on_saved(&mut self) {
    if let Some(e) = self.save.error() {
      warn!(error = %e, "save failed");
      return;
    }
    let Some(id) = self.save.data().map(|s| s.id) else {
      return;
    };
    match self.mode {
      FormMode::Add => {
        debug!(id, "student created");
        self.draft = StudentDraft::default();
        self.save.reset();
        self.sync_inputs();
      }
      FormMode::Edit { .. } => debug!(id, "student updated"),
    }
  }

  fn field_errors(&self) -> BTreeMap<String, String> {
    self
      .save
      .error()
      .and_then(|e| e.validation_errors())
      .unwrap_or_default()
  }

  pub fn notice(&self) -> Option<&'static str> {
    match (self.mode, self.save.state()) {
      (FormMode::Edit { .. }, MutationState::Success(_)) => Some("Updated successfully"),
      _ => None,
    }
  }

  fn title(&self) -> String {
    let loading = self.student.as_ref().is_some_and(|q| q.is_loading());
    let error = self.student.as_ref().and_then(|q| q.error());
    match (self.mode, loading, error) {
      (FormMode::Add, _, _) => " Add student ".to_string(),
      (FormMode::Edit { id }, true, _) => format!(" Edit student #{} (loading...) ", id),
      (FormMode::Edit { id }, _, Some(e)) => format!(" Edit student #{} (error: {}) ", id, e),
      (FormMode::Edit { id }, _, None) => format!(" Edit student #{} ", id),
    }
  }

  fn render_form(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let errors = self.field_errors();
    let width = inner.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    let mut cursor = None;

    for (i, field) in Field::ALL.iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      lines.push(Line::styled(field.label(), label_style));

      if *field == Field::Gender {
        let mut line = self.gender.line(focused);
        line.spans.insert(0, Span::raw("  "));
        lines.push(line);
      } else {
        let value = if focused {
          self.editor.value()
        } else {
          self.draft.field(*field)
        };
        if focused {
          let col = 2 + self.editor.cursor_position().min(width) as u16;
          cursor = Some(Position::new(inner.x + col, inner.y + lines.len() as u16));
        }
        lines.push(Line::from(vec![
          Span::raw("  "),
          Span::raw(truncate(value, width.max(1))),
        ]));
      }

      if let Some(message) = errors.get(field.name()) {
        lines.push(Line::styled(
          format!("  {}", message),
          Style::default().fg(Color::Red),
        ));
      }
    }

    lines.push(Line::raw(""));
    let button = match self.mode {
      FormMode::Add => "[ Add ]",
      FormMode::Edit { .. } => "[ Update ]",
    };
    let mut footer = vec![Span::styled(button, Style::default().fg(Color::Cyan).bold())];
    if self.save.is_pending() {
      footer.push(Span::styled("  Saving...", Style::default().fg(Color::Yellow)));
    } else if let Some(notice) = self.notice() {
      footer.push(Span::styled(format!("  {}", notice), Style::default().fg(Color::Green)));
    }
    lines.push(Line::from(footer));

    frame.render_widget(Paragraph::new(lines), inner);
    if let Some(position) = cursor.filter(|p| p.y < inner.bottom()) {
      frame.set_cursor_position(position);
    }
  }

  // Key handling helpers for or_else chain pattern
  fn handle_form_keys(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => return Some(ViewAction::Pop),
      KeyCode::Tab | KeyCode::Down => self.move_focus(1),
      KeyCode::BackTab | KeyCode::Up => self.move_focus(-1),
      KeyCode::Enter => self.submit(),
      KeyCode::Char('s') if ctrl => self.submit(),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_input(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let field = self.focused();
    if field == Field::Gender {
      match self.gender.handle_key(key) {
        KeyResult::Event(value) => self.set_field(field, value.to_string()),
        KeyResult::Handled => {}
        KeyResult::NotHandled => return None,
      }
    } else {
      match self.editor.handle_key(key) {
        KeyResult::Event(changed) => self.set_field(field, changed.0),
        KeyResult::Handled => {}
        KeyResult::NotHandled => return None,
      }
    }
    Some(ViewAction::None)
  }
}

impl View for StudentFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_form_keys(key)
      .or_else(|| self.handle_input(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_form(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      FormMode::Add => "Add".to_string(),
      FormMode::Edit { id } => format!("#{}", id),
    }
  }

  fn route(&self) -> Route {
    match self.mode {
      FormMode::Add => Route::AddStudent,
      FormMode::Edit { id } => Route::EditStudent { id },
    }
  }

  fn tick(&mut self) {
    self.populate();
    if self.save.poll() {
      self.on_saved();
    }
  }

  fn on_cache_update(&mut self, key: &StudentQueryKey) {
    if self.student.as_ref().is_some_and(|q| q.key() == key) {
      self.populate();
    }
  }

  fn status(&self) -> Option<String> {
    if self.unloaded_submit {
      let failed = self.student.as_ref().is_some_and(|q| q.error().is_some());
      return Some(if failed {
        "Cannot save: the student failed to load".to_string()
      } else {
        "Still loading, try again shortly".to_string()
      });
    }
    let error = self.save.error()?;
    if error.validation_errors().is_some() {
      return None;
    }
    Some(format!("Save failed: {}", error))
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("enter", "submit").with_priority(20),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}
