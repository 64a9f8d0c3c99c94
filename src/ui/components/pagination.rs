use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Pagination controls for the student list.
///
/// `Previous` is disabled on the first page and `Next` on the last computed
/// page. While the total is unknown (zero pages) only `Previous` can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub page: u32,
  pub page_count: u32,
}

impl Pagination {
  pub fn new(page: u32, page_count: u32) -> Self {
    Self { page, page_count }
  }

  /// Target of `Previous`, if navigable
  pub fn previous(&self) -> Option<u32> {
    (self.page > 1).then(|| self.page - 1)
  }

  /// Target of `Next`, if navigable
  pub fn next(&self) -> Option<u32> {
    (self.page < self.page_count).then(|| self.page + 1)
  }

  /// Numbered links 1..=page_count
  pub fn links(&self) -> impl Iterator<Item = u32> {
    1..=self.page_count
  }

  /// Whether `page` is a valid jump target
  pub fn contains(&self, page: u32) -> bool {
    (1..=self.page_count).contains(&page)
  }

  pub fn line(&self) -> Line<'static> {
    let enabled = Style::default().fg(Color::Gray);
    let disabled = Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
    let active = Style::default().fg(Color::Black).bg(Color::Gray).bold();

    let mut spans = vec![Span::styled(
      " Previous ",
      if self.previous().is_some() { enabled } else { disabled },
    )];
    for page in self.links() {
      spans.push(Span::raw(" "));
      let style = if page == self.page { active } else { enabled };
      spans.push(Span::styled(format!(" {} ", page), style));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
      " Next ",
      if self.next().is_some() { enabled } else { disabled },
    ));
    Line::from(spans)
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(self.line()).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::page_count;

  #[test]
  fn test_middle_page() {
    let pagination = Pagination::new(2, page_count(25));
    assert_eq!(pagination.links().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(pagination.previous(), Some(1));
    assert_eq!(pagination.next(), Some(3));
  }

  #[test]
  fn test_first_page_disables_previous() {
    let pagination = Pagination::new(1, 3);
    assert_eq!(pagination.previous(), None);
    assert_eq!(pagination.next(), Some(2));
  }

  #[test]
  fn test_last_page_disables_next() {
    let pagination = Pagination::new(3, 3);
    assert_eq!(pagination.next(), None);
    assert!(pagination.contains(3));
    assert!(!pagination.contains(4));
    assert!(!pagination.contains(0));
  }

  #[test]
  fn test_unknown_total_has_no_links() {
    let pagination = Pagination::new(1, 0);
    assert_eq!(pagination.links().count(), 0);
    assert_eq!(pagination.next(), None);
  }

  #[test]
  fn test_active_page_is_highlighted() {
    let line = Pagination::new(2, 3).line();
    let active: Vec<String> = line
      .spans
      .iter()
      .filter(|s| s.style.bg == Some(Color::Gray))
      .map(|s| s.content.trim().to_string())
      .collect();
    assert_eq!(active, vec!["2"]);
  }
}
