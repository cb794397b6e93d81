//! User-level directories derived from a session environment.
//!
//! Every lookup reads the session's environment map rather than the process
//! environment, so a session built for a test resolves its own private tree.

use std::path::PathBuf;

use crate::consts::{APP_NAME, COLLECTION_DIR};
use crate::session::EnvMap;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir(env: &EnvMap) -> PathBuf {
  env
    .get("USERPROFILE")
    .or_else(|| env.get("HOME"))
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir(env: &EnvMap) -> PathBuf {
  env.get("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"))
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir(env: &EnvMap) -> PathBuf {
  env
    .get("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|| home_dir(env))
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir(env: &EnvMap) -> PathBuf {
  let config_home = env
    .get("XDG_CONFIG_HOME")
    .filter(|v| !v.is_empty())
    .map(PathBuf::from)
    .unwrap_or_else(|| home_dir(env).join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory holding saved collections.
///
/// `MODULES_COLLECTION_DIR` wins over the `~/.module` default.
pub fn collections_dir(env: &EnvMap) -> PathBuf {
  match env.get(COLLECTION_DIR).filter(|v| !v.is_empty()) {
    Some(dir) => PathBuf::from(dir),
    None => home_dir(env).join(".module"),
  }
}
