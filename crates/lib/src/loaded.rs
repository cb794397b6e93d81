//! Registry of loaded modules.
//!
//! The registry has no storage of its own: it is rebuilt from `LOADEDMODULES`,
//! `_LMFILES_` and `__MODULES_LMALTNAME` whenever it is needed and written back
//! the same way, so the settings stack rolls it back with the environment.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::consts::{ALTNAME_SEP, LIST_DELIM, LMALTNAME, LMFILES, LOADEDMODULES};
use crate::ident::designates;
use crate::session::EnvMap;

/// One loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedModule {
  /// Canonical name.
  pub name: String,
  /// Script the module was loaded from.
  pub file: PathBuf,
  /// Other names on the resolution chain (`foo`, `foo/default`).
  pub alt_names: Vec<String>,
}

impl LoadedModule {
  /// The module answers to `query` by canonical name, alternative name, or directory.
  pub fn answers_to(&self, query: &str) -> bool {
    designates(query, &self.name) || self.alt_names.iter().any(|alt| designates(query, alt))
  }
}

/// Loaded modules in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadedModules {
  modules: Vec<LoadedModule>,
}

impl LoadedModules {
  /// Rebuild the registry from the environment.
  pub fn from_env(env: &EnvMap) -> Self {
    let names = split_list(env.get(LOADEDMODULES));
    let files = split_list(env.get(LMFILES));
    if names.len() != files.len() {
      warn!(
        names = names.len(),
        files = files.len(),
        "loaded module list and file list are out of step"
      );
    }

    let alt_records: Vec<Vec<String>> = split_list(env.get(LMALTNAME))
      .into_iter()
      .map(|record| record.split(ALTNAME_SEP).map(str::to_string).collect())
      .collect();

    let modules = names
      .into_iter()
      .zip(files)
      .map(|(name, file)| {
        let alt_names = alt_records
          .iter()
          .find(|record| record.first() == Some(&name))
          .map(|record| record[1..].to_vec())
          .unwrap_or_default();
        LoadedModule {
          name,
          file: PathBuf::from(file),
          alt_names,
        }
      })
      .collect();

    Self { modules }
  }

  /// Variable assignments describing this registry; `None` unsets.
  pub fn to_env(&self) -> Vec<(&'static str, Option<String>)> {
    if self.modules.is_empty() {
      return vec![(LOADEDMODULES, None), (LMFILES, None), (LMALTNAME, None)];
    }
    let names: Vec<&str> = self.modules.iter().map(|m| m.name.as_str()).collect();
    let files: Vec<String> = self.modules.iter().map(|m| m.file.to_string_lossy().into_owned()).collect();
    let alts: Vec<String> = self
      .modules
      .iter()
      .filter(|m| !m.alt_names.is_empty())
      .map(|m| {
        let mut record = vec![m.name.clone()];
        record.extend(m.alt_names.iter().cloned());
        record.join(&ALTNAME_SEP.to_string())
      })
      .collect();

    vec![
      (LOADEDMODULES, Some(names.join(LIST_DELIM))),
      (LMFILES, Some(files.join(LIST_DELIM))),
      (LMALTNAME, if alts.is_empty() { None } else { Some(alts.join(LIST_DELIM)) }),
    ]
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LoadedModule> {
    self.modules.iter()
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Canonical names in load order.
  pub fn names(&self) -> Vec<String> {
    self.modules.iter().map(|m| m.name.clone()).collect()
  }

  /// A module with exactly this canonical name.
  pub fn get(&self, name: &str) -> Option<&LoadedModule> {
    self.modules.iter().find(|m| m.name == name)
  }

  /// The most recently loaded module answering to `query`.
  pub fn find(&self, query: &str) -> Option<&LoadedModule> {
    self.modules.iter().rev().find(|m| m.answers_to(query))
  }

  /// Every module answering to `query`, in load order.
  pub fn matching(&self, query: &str) -> Vec<&LoadedModule> {
    self.modules.iter().filter(|m| m.answers_to(query)).collect()
  }

  pub fn is_loaded(&self, query: &str) -> bool {
    self.find(query).is_some()
  }

  /// Identifiers backed by one script file.
  pub fn by_file(&self, file: &Path) -> Vec<&LoadedModule> {
    self.modules.iter().filter(|m| m.file == file).collect()
  }

  /// Record more names for the module `name`; `true` when any was new.
  pub fn add_alt_names(&mut self, name: &str, alt_names: &[String]) -> bool {
    let Some(module) = self.modules.iter_mut().find(|m| m.name == name) else {
      return false;
    };
    let mut added = false;
    for alt in alt_names {
      if alt != name && !module.alt_names.contains(alt) {
        module.alt_names.push(alt.clone());
        added = true;
      }
    }
    added
  }

  pub fn push(&mut self, module: LoadedModule) {
    self.modules.retain(|m| m.name != module.name);
    self.modules.push(module);
  }

  /// Remove the module with this canonical name.
  pub fn remove(&mut self, name: &str) -> Option<LoadedModule> {
    let index = self.modules.iter().position(|m| m.name == name)?;
    Some(self.modules.remove(index))
  }
}

fn split_list(value: Option<&String>) -> Vec<String> {
  match value {
    Some(v) if !v.is_empty() => v.split(LIST_DELIM).map(str::to_string).collect(),
    _ => Vec::new(),
  }
}
