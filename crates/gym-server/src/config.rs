//! Runtime server configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use gym_core::service::EnrollmentPolicy;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml` and
/// `GYM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  #[serde(default = "default_cors_origins")]
  pub cors_origins:           Vec<String>,
  /// Give the seat back when an enrollment is cancelled.
  #[serde(default)]
  pub restore_seat_on_cancel: bool,
  /// Seeded at startup when both are set and the user does not exist yet.
  pub admin_username:         Option<String>,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub admin_password_hash:    Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("gym.sqlite3") }

fn default_cors_origins() -> Vec<String> {
  vec!["http://localhost:3000".to_string()]
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `GYM_*` environment
  /// variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("GYM")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn policy(&self) -> EnrollmentPolicy {
    EnrollmentPolicy { restore_seat_on_cancel: self.restore_seat_on_cancel }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The admin account to seed, if fully configured.
  pub fn admin_seed(&self) -> Option<(&str, &str)> {
    match (&self.admin_username, &self.admin_password_hash) {
      (Some(u), Some(h)) if !u.trim().is_empty() && !h.is_empty() => {
        Some((u.trim(), h.as_str()))
      }
      _ => None,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
