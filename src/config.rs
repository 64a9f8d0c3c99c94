use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
}

/// Connection settings for the roster backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
  /// Header sent with every request
  pub header: HeaderConfig,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:4000/".to_string(),
      timeout_secs: 10,
      header: HeaderConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
  pub name: String,
  pub value: String,
}

impl Default for HeaderConfig {
  fn default() -> Self {
    Self {
      name: "X-Custom-Header".to_string(),
      value: "foobar".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./roster.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/roster/config.yaml
  ///
  /// Without a config file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("roster.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("roster").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Header title: the configured one, else the backend host
  pub fn display_title(&self) -> String {
    self
      .title
      .clone()
      .unwrap_or_else(|| extract_host(&self.api.base_url).to_string())
  }
}

/// Extract host[:port] from a URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:4000/");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.api.header.name, "X-Custom-Header");
    assert_eq!(config.api.header.value, "foobar");
  }

  #[test]
  fn test_partial_override() {
    let config = Config::parse(
      "api:\n  base_url: https://roster.example.com/api\n  timeout_secs: 3\ntitle: Class 10A\n",
    )
    .unwrap();
    assert_eq!(config.api.base_url, "https://roster.example.com/api");
    assert_eq!(config.api.timeout_secs, 3);
    assert_eq!(config.api.header.value, "foobar");
    assert_eq!(config.display_title(), "Class 10A");
  }

  #[test]
  fn test_display_title_falls_back_to_host() {
    assert_eq!(Config::default().display_title(), "localhost:4000");
  }

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("https://roster.example.com/api"), "roster.example.com");
    assert_eq!(extract_host("http://localhost:4000/"), "localhost:4000");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/roster.yaml"))).is_err());
  }
}
