use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;

/// Inline single-choice selector (radio group) over a fixed set of options
#[derive(Debug, Clone)]
pub struct ChoiceInput {
  options: &'static [&'static str],
  selected: Option<usize>,
}

impl ChoiceInput {
  pub fn new(options: &'static [&'static str]) -> Self {
    Self {
      options,
      selected: None,
    }
  }

  pub fn value(&self) -> Option<&'static str> {
    self.selected.map(|i| self.options[i])
  }

  /// Select the option equal to `value`; anything else clears the selection
  pub fn set_value(&mut self, value: &str) {
    self.selected = self.options.iter().position(|o| *o == value);
  }

  /// Handle a key event; emits the newly selected option
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<&'static str> {
    if self.options.is_empty() {
      return KeyResult::NotHandled;
    }
    let len = self.options.len();

    let next = match key.code {
      KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('l') => match self.selected {
        Some(i) => (i + 1) % len,
        None => 0,
      },
      KeyCode::Left | KeyCode::Char('h') => match self.selected {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
      },
      _ => return KeyResult::NotHandled,
    };

    self.selected = Some(next);
    KeyResult::Event(self.options[next])
  }

  /// Render options as `(•) male  ( ) female  ( ) other`
  pub fn line(&self, focused: bool) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, option) in self.options.iter().enumerate() {
      if i > 0 {
        spans.push(Span::raw("  "));
      }
      let checked = self.selected == Some(i);
      let marker = if checked { "(•) " } else { "( ) " };
      let style = match (checked, focused) {
        (true, true) => Style::default().fg(Color::Cyan).bold(),
        (true, false) => Style::default().fg(Color::White).bold(),
        (false, _) => Style::default().fg(Color::DarkGray),
      };
      spans.push(Span::styled(format!("{}{}", marker, option), style));
    }
    Line::from(spans)
  }
}
