use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Emitted when an edit changed the input's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changed(pub String);

/// Single-line text editor used by form fields.
///
/// The cursor is a character index, so multi-byte input (names, countries)
/// edits correctly. Enter, Esc and Tab are left to the parent.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Get the current input value
  pub fn value(&self) -> &str {
    &self.buffer
  }

  /// Replace the value and move the cursor to the end
  pub fn set_value(&mut self, value: &str) {
    self.buffer = value.to_string();
    self.cursor = self.len();
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Cursor position in characters
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  fn len(&self) -> usize {
    self.buffer.chars().count()
  }

  fn byte_index(&self, char_index: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(char_index)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  fn changed(&self) -> KeyResult<Changed> {
    KeyResult::Event(Changed(self.buffer.clone()))
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<Changed> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Backspace => {
        if self.cursor == 0 {
          return KeyResult::Handled;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        self.changed()
      }
      KeyCode::Delete => {
        if self.cursor >= self.len() {
          return KeyResult::Handled;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        self.changed()
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        KeyResult::Handled
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.len());
        KeyResult::Handled
      }
      KeyCode::Home => {
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::End => {
        self.cursor = self.len();
        KeyResult::Handled
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.len();
        KeyResult::Handled
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        let at = self.byte_index(self.cursor);
        self.buffer.replace_range(..at, "");
        self.cursor = 0;
        self.changed()
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        if self.cursor == 0 {
          return KeyResult::Handled;
        }
        let at = self.byte_index(self.cursor);
        let start = self.buffer[..at]
          .trim_end()
          .rfind(' ')
          .map(|i| i + 1)
          .unwrap_or(0);
        self.buffer.replace_range(start..at, "");
        self.cursor = self.buffer[..start].chars().count();
        self.changed()
      }
      KeyCode::Char(_) if ctrl => KeyResult::NotHandled,
      KeyCode::Char(c) => {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        self.changed()
      }
      _ => KeyResult::NotHandled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_typing_reports_changes() {
    let mut input = TextInput::new();
    input.handle_key(key(KeyCode::Char('h')));
    let result = input.handle_key(key(KeyCode::Char('i')));
    assert_eq!(result, KeyResult::Event(Changed("hi".to_string())));
  }

  #[test]
  fn test_enter_and_esc_are_not_handled() {
    let mut input = TextInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
    assert_eq!(input.handle_key(key(KeyCode::Esc)), KeyResult::NotHandled);
    assert_eq!(input.handle_key(ctrl_key(KeyCode::Char('s'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_backspace() {
    let mut input = TextInput::new();
    type_str(&mut input, "abc");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_cursor_movement_with_multibyte_chars() {
    let mut input = TextInput::new();
    type_str(&mut input, "Nguyễn");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "Nguyn");
    assert_eq!(input.cursor_position(), 4);
  }

  #[test]
  fn test_set_value_moves_cursor_to_end() {
    let mut input = TextInput::new();
    input.set_value("Việt Nam");
    assert_eq!(input.cursor_position(), 8);
    type_str(&mut input, "!");
    assert_eq!(input.value(), "Việt Nam!");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = TextInput::new();
    type_str(&mut input, "hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
    assert_eq!(input.cursor_position(), 0);
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = TextInput::new();
    type_str(&mut input, "hello big world");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "hello big ");
  }
}
