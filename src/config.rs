use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors raised while resolving the API configuration.
///
/// Configuration failures are fatal at startup: there is no runtime fallback
/// for a missing or unparseable base URL.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(
    "no configuration found; create ~/.config/reelkit/config.yaml or set \
     REELKIT_API_SCHEME and REELKIT_API_HOST"
  )]
  NotFound,
  #[error("config file not found: {0}")]
  ExplicitPathMissing(PathBuf),
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
  #[error("invalid api base url {0}")]
  BaseUrl(String),
}

/// Base API configuration for the data layer.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// URL scheme of the API host ("https" in production)
  pub scheme: String,
  /// API host, optionally with a port ("api.reel.example" or "127.0.0.1:8080")
  pub host: String,
  /// Override for the response-cache database directory
  #[serde(default)]
  pub cache_dir: Option<PathBuf>,
}

impl ApiConfig {
  /// Resolve configuration at startup.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reelkit.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reelkit/config.yaml
  /// 4. REELKIT_API_SCHEME + REELKIT_API_HOST environment variables
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(p) = explicit_path {
      if !p.exists() {
        return Err(ConfigError::ExplicitPathMissing(p.to_path_buf()));
      }
      return Self::load_from_path(p);
    }

    if let Some(p) = Self::find_config_file() {
      return Self::load_from_path(&p);
    }

    Self::from_env().ok_or(ConfigError::NotFound)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reelkit.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reelkit").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
      path: path.to_path_buf(),
      source: e,
    })?;

    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: e,
    })
  }

  /// Build a configuration from environment variables alone.
  ///
  /// Returns `None` unless both REELKIT_API_SCHEME and REELKIT_API_HOST are set.
  pub fn from_env() -> Option<Self> {
    let scheme = std::env::var("REELKIT_API_SCHEME").ok()?;
    let host = std::env::var("REELKIT_API_HOST").ok()?;
    Some(Self {
      scheme,
      host,
      cache_dir: None,
    })
  }

  /// The `scheme://host` base every endpoint path is joined onto.
  pub fn base_url(&self) -> Result<Url, ConfigError> {
    let raw = format!("{}://{}/", self.scheme, self.host);
    Url::parse(&raw).map_err(|_| ConfigError::BaseUrl(raw))
  }
}
