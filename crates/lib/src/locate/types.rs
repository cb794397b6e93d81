use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

/// One element of a modulepath listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModuleEntry {
  Directory {
    name: String,
  },
  Alias {
    name: String,
    target: String,
  },
  Version {
    name: String,
    target: String,
  },
  Modulefile {
    name: String,
    file: PathBuf,
    #[serde(skip)]
    modified: Option<SystemTime>,
  },
  Virtual {
    name: String,
    file: PathBuf,
  },
  Invalid {
    name: String,
    file: PathBuf,
  },
  #[serde(rename = "access-error")]
  AccessError {
    name: String,
    file: PathBuf,
  },
}

impl ModuleEntry {
  pub fn name(&self) -> &str {
    match self {
      ModuleEntry::Directory { name }
      | ModuleEntry::Alias { name, .. }
      | ModuleEntry::Version { name, .. }
      | ModuleEntry::Modulefile { name, .. }
      | ModuleEntry::Virtual { name, .. }
      | ModuleEntry::Invalid { name, .. }
      | ModuleEntry::AccessError { name, .. } => name,
    }
  }

  /// Entries that can be loaded.
  pub fn is_module(&self) -> bool {
    matches!(self, ModuleEntry::Modulefile { .. } | ModuleEntry::Virtual { .. })
  }

  pub fn file(&self) -> Option<&Path> {
    match self {
      ModuleEntry::Modulefile { file, .. }
      | ModuleEntry::Virtual { file, .. }
      | ModuleEntry::Invalid { file, .. }
      | ModuleEntry::AccessError { file, .. } => Some(file),
      _ => None,
    }
  }
}

/// Entries found under one modulepath directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
  pub modpath: PathBuf,
  pub entries: Vec<ModuleEntry>,
}

/// Selection applied to listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filter<'a> {
  /// Name prefixes; empty selects everything.
  pub patterns: &'a [String],
  pub default_only: bool,
  pub latest_only: bool,
}
