//! Saved collections of modulepaths and loaded modules.
//!
//! # Storage Layout
//!
//! ```text
//! {collections_dir}/
//! ├── default          # collection saved without a name
//! ├── dev              # named collection
//! └── dev.x86          # `dev` saved under target `x86`
//! ```
//!
//! A collection file is a modulefile made of `use` and `load` lines, so it can
//! be sourced directly.

mod plan;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use plan::RestorePlan;

use crate::config::Config;
use crate::consts::MAGIC_MARKER;

/// Name used when no collection name is given.
pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Debug, Error)]
pub enum CollectionError {
  #[error("Collection {0} cannot be found")]
  NotFound(String),

  #[error("Invalid directive at line {line} of collection {name}: {text}")]
  Malformed { name: String, line: usize, text: String },

  #[error("Failed to access collection file '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Search paths and loaded modules, both in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
  pub paths: Vec<String>,
  pub modules: Vec<String>,
}

impl Collection {
  /// Serialize. The same collection always yields the same text.
  pub fn to_text(&self) -> String {
    let mut out = format!("{MAGIC_MARKER}\n");
    for path in &self.paths {
      out.push_str(&format!("module use --append {path}\n"));
    }
    for module in &self.modules {
      out.push_str(&format!("module load {module}\n"));
    }
    out
  }

  /// Parse collection text; `name` only labels errors.
  pub fn parse(name: &str, text: &str) -> Result<Self, CollectionError> {
    let mut collection = Collection::default();
    for (index, line) in text.lines().enumerate() {
      let trimmed = line.trim();
      if trimmed.is_empty() || trimmed.starts_with('#') {
        continue;
      }
      let mut words: Vec<&str> = trimmed.split_whitespace().collect();
      if words.first() == Some(&"module") {
        words.remove(0);
      }
      let malformed = || CollectionError::Malformed {
        name: name.to_string(),
        line: index + 1,
        text: trimmed.to_string(),
      };

      match words.split_first() {
        Some((&"use", rest)) => {
          let mut prepend = false;
          let mut dirs = Vec::new();
          for word in rest {
            match *word {
              "--append" | "-a" | "-append" => prepend = false,
              "--prepend" | "-p" | "-prepend" => prepend = true,
              flag if flag.starts_with('-') => return Err(malformed()),
              dir => dirs.push(dir.to_string()),
            }
          }
          collection.paths.retain(|p| !dirs.contains(p));
          if prepend {
            collection.paths.splice(0..0, dirs);
          } else {
            collection.paths.extend(dirs);
          }
        }
        Some((&"load", rest)) | Some((&"add", rest)) => {
          collection.modules.extend(rest.iter().map(|m| m.to_string()));
        }
        _ => return Err(malformed()),
      }
    }
    Ok(collection)
  }
}

/// Collection files of one user, optionally qualified by a target.
#[derive(Debug, Clone)]
pub struct CollectionStore {
  dir: PathBuf,
  target: Option<String>,
}

impl CollectionStore {
  pub fn new(dir: PathBuf, target: Option<String>) -> Self {
    Self { dir, target }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.collections_dir.clone(), config.collection_target.clone())
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn target(&self) -> Option<&str> {
    self.target.as_deref()
  }

  /// File backing collection `name`. Names containing `/` are file paths.
  pub fn path_for(&self, name: &str) -> PathBuf {
    if name.contains('/') {
      return PathBuf::from(name);
    }
    match &self.target {
      Some(target) => self.dir.join(format!("{name}.{target}")),
      None => self.dir.join(name),
    }
  }

  pub fn exists(&self, name: &str) -> bool {
    self.path_for(name).is_file()
  }

  /// Write `collection` under `name`, replacing any previous one.
  pub fn save(&self, name: &str, collection: &Collection) -> Result<PathBuf, CollectionError> {
    let path = self.path_for(name);
    let io_err = |source| CollectionError::Io {
      path: path.clone(),
      source,
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&temp_path, collection.to_text()).map_err(io_err)?;
    fs::rename(&temp_path, &path).map_err(io_err)?;
    debug!(collection = name, path = %path.display(), "collection saved");
    Ok(path)
  }

  /// Raw text of collection `name`.
  pub fn show(&self, name: &str) -> Result<String, CollectionError> {
    let path = self.path_for(name);
    fs::read_to_string(&path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        CollectionError::NotFound(self.label(name))
      } else {
        CollectionError::Io { path, source: e }
      }
    })
  }

  pub fn load(&self, name: &str) -> Result<Collection, CollectionError> {
    let text = self.show(name)?;
    Collection::parse(name, &text)
  }

  pub fn remove(&self, name: &str) -> Result<(), CollectionError> {
    let path = self.path_for(name);
    match fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CollectionError::NotFound(self.label(name))),
      Err(e) => Err(CollectionError::Io { path, source: e }),
    }
  }

  /// Names of the collections saved for the active target, sorted.
  pub fn list(&self) -> Result<Vec<String>, CollectionError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => {
        return Err(CollectionError::Io {
          path: self.dir.clone(),
          source: e,
        });
      }
    };

    let mut names = Vec::new();
    for entry in entries.flatten() {
      if !entry.path().is_file() {
        continue;
      }
      let file_name = entry.file_name().to_string_lossy().into_owned();
      if file_name.starts_with('.') {
        continue;
      }
      let name = match &self.target {
        Some(target) => file_name.strip_suffix(&format!(".{target}")).map(str::to_string),
        None => (!file_name.contains('.')).then_some(file_name),
      };
      names.extend(name);
    }
    names.sort();
    Ok(names)
  }

  fn label(&self, name: &str) -> String {
    match &self.target {
      Some(target) => format!("{name} (target: {target})"),
      None => name.to_string(),
    }
  }
}
