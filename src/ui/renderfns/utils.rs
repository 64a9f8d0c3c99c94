/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Short label for an avatar reference: inline images are summarised, URLs
/// keep their last path segment
pub fn avatar_label(avatar: &str) -> String {
  if avatar.is_empty() {
    return "-".to_string();
  }
  if let Some(rest) = avatar.strip_prefix("data:") {
    let kind = rest.split([';', ',']).next().unwrap_or("");
    return format!("[{}]", if kind.is_empty() { "inline" } else { kind });
  }
  let name = avatar.rsplit('/').find(|s| !s.is_empty()).unwrap_or(avatar);
  truncate(name, 16)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Trần Thị Hồng", 7), "Trần...");
  }

  #[test]
  fn test_avatar_label() {
    assert_eq!(avatar_label(""), "-");
    assert_eq!(avatar_label("data:image/png;base64,AAAA"), "[image/png]");
    assert_eq!(avatar_label("data:,"), "[inline]");
    assert_eq!(
      avatar_label("https://cdn.example.com/avatars/42.jpg"),
      "42.jpg"
    );
  }
}
