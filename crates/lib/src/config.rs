//! Engine configuration.
//!
//! Configuration comes from the session environment: the variables the shell
//! passes down on every invocation, plus the user directories derived from it.

use std::path::PathBuf;

use crate::consts::{COLLECTION_TARGET, DEFAULT_PAGER, MODULES_PAGER, RUN_QUARANTINE};
use crate::platform::paths;
use crate::session::EnvMap;

/// Settings read once at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Pager command line, `None` when paging is disabled by an empty override.
  pub pager: Option<String>,
  /// Active collection target qualifier.
  pub collection_target: Option<String>,
  /// Variable names hidden from subprocesses.
  pub quarantine: Vec<String>,
  /// Where collections are saved.
  pub collections_dir: PathBuf,
  /// Where `modulespath` and `initrc` live.
  pub config_dir: PathBuf,
}

impl Config {
  /// Build the configuration from an environment map.
  pub fn from_env(env: &EnvMap) -> Self {
    let pager = match env.get(MODULES_PAGER) {
      Some(value) if value.trim().is_empty() => None,
      Some(value) => Some(value.clone()),
      None => Some(
        env
          .get("PAGER")
          .filter(|v| !v.trim().is_empty())
          .cloned()
          .unwrap_or_else(|| DEFAULT_PAGER.to_string()),
      ),
    };

    let collection_target = env.get(COLLECTION_TARGET).filter(|v| !v.is_empty()).cloned();

    let quarantine = env
      .get(RUN_QUARANTINE)
      .map(|v| v.split_whitespace().map(str::to_string).collect())
      .unwrap_or_default();

    Self {
      pager,
      collection_target,
      quarantine,
      collections_dir: paths::collections_dir(env),
      config_dir: paths::config_dir(env),
    }
  }
}

/// Presentation switches given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
  /// One entry per line, no decoration.
  pub terse: bool,
  /// Include paths and modification times.
  pub long: bool,
  /// Only the default element of each directory.
  pub default_only: bool,
  /// Only the highest element of each directory.
  pub latest_only: bool,
  /// Machine-readable output.
  pub json: bool,
}
