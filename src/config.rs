use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  pub default_company: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL of the hosted backend, e.g. https://acme.backend.example
  pub url: String,
  /// Sender address used for outbound email
  pub sender_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long cached query results stay fresh, in seconds
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  /// Entries older than this many days are removed by `cache sweep`
  #[serde(default = "default_sweep_age_days")]
  pub sweep_age_days: u32,
  /// Disable caching entirely (every read goes to the network)
  #[serde(default)]
  pub disabled: bool,
}

fn default_ttl_secs() -> u64 {
  300
}

fn default_sweep_age_days() -> u32 {
  7
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
      sweep_age_days: default_sweep_age_days(),
      disabled: false,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::seconds(self.ttl_secs as i64)
  }

  pub fn sweep_age(&self) -> Duration {
    Duration::days(self.sweep_age_days as i64)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hrdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hrdesk/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/hrdesk/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hrdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hrdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the backend API token from environment variables.
  ///
  /// Checks HRDESK_API_TOKEN first, then HR_API_TOKEN as fallback.
  pub fn api_token() -> Result<String> {
    std::env::var("HRDESK_API_TOKEN")
      .or_else(|_| std::env::var("HR_API_TOKEN"))
      .map_err(|_| {
        eyre!("Backend API token not found. Set HRDESK_API_TOKEN or HR_API_TOKEN environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_cache_defaults() {
    let config: Config = serde_yaml::from_str(
      "backend:\n  url: https://acme.backend.example\n",
    )
    .unwrap();

    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.cache.sweep_age_days, 7);
    assert!(!config.cache.disabled);
    assert_eq!(config.cache.ttl(), Duration::minutes(5));
  }

  #[test]
  fn test_cache_overrides() {
    let config: Config = serde_yaml::from_str(
      "backend:\n  url: https://acme.backend.example\ncache:\n  ttl_secs: 60\n  disabled: true\n",
    )
    .unwrap();

    assert_eq!(config.cache.ttl(), Duration::minutes(1));
    assert!(config.cache.disabled);
  }
}
