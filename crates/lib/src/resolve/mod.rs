//! Resolution graph: aliases, symbolic versions, defaults and virtual modules.
//!
//! Entries map a source name to a target identifier. Resolution follows entries
//! and directory defaults until a name backed by a script is reached. The graph
//! never holds a cycle that resolution could loop on: revisiting a name aborts
//! the traversal with [`ResolveError::Cycle`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::DEFAULT_SYMBOL;
use crate::ident::{ModuleIdentifier, root_of};

/// How a resolution entry was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
  Alias,
  Version,
  Default,
}

/// One declared hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionEntry {
  pub target: ModuleIdentifier,
  pub kind: EntryKind,
  /// Modulepath directory whose rc declared the entry, if any.
  pub origin: Option<PathBuf>,
}

/// A module backed by a script outside its name-derived location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualEntry {
  pub file: PathBuf,
  pub origin: Option<PathBuf>,
}

/// What a name denotes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  /// A configuration script.
  Script(PathBuf),
  /// A directory; `default` is the child to descend into.
  Directory { default: Option<String> },
  /// A file lacking the magic marker.
  Invalid(PathBuf),
  /// A file that cannot be read.
  Denied(PathBuf),
  Missing,
}

/// Filesystem view used during resolution.
pub trait NodeSource {
  /// Whether declarations for names under `root` have been collected.
  fn is_scanned(&self, _root: &str) -> bool {
    true
  }

  fn node(&mut self, name: &str) -> Node;
}

/// A fully resolved module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// Canonical name.
  pub name: String,
  pub file: PathBuf,
  /// Names traversed before reaching `name`.
  pub chain: Vec<String>,
  pub is_virtual: bool,
}

impl Resolution {
  pub fn identifier(&self) -> ModuleIdentifier {
    ModuleIdentifier::parse(&self.name)
  }
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Resolved(Resolution),
  /// Declarations under this root must be collected before retrying.
  NeedsScan(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  #[error("module alias or symbolic version cycle: {}", chain.join(" -> "))]
  Cycle { chain: Vec<String> },

  #[error("unable to locate a modulefile for '{0}'")]
  NotFound(String),

  #[error("invalid modulefile '{}' for '{name}': missing magic marker", file.display())]
  InvalidFormat { name: String, file: PathBuf },

  #[error("permission denied reading '{}' for '{name}'", file.display())]
  AccessDenied { name: String, file: PathBuf },
}

/// Visited-set guard for a traversal.
#[derive(Debug, Default)]
pub struct Traversal {
  visited: Vec<String>,
}

impl Traversal {
  /// Record `name`, failing when it was already visited.
  pub fn visit(&mut self, name: &str) -> Result<(), ResolveError> {
    if self.visited.iter().any(|v| v == name) {
      let mut chain = self.visited.clone();
      chain.push(name.to_string());
      return Err(ResolveError::Cycle { chain });
    }
    self.visited.push(name.to_string());
    Ok(())
  }

  pub fn into_chain(self) -> Vec<String> {
    self.visited
  }
}

/// Declared aliases, symbolic versions and virtual modules.
#[derive(Debug, Clone, Default)]
pub struct ResolutionGraph {
  entries: BTreeMap<String, ResolutionEntry>,
  virtuals: BTreeMap<String, VirtualEntry>,
}

impl ResolutionGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare `name` as an alias of `target`.
  pub fn add_alias(&mut self, name: &str, target: &str, origin: Option<&Path>) {
    debug!(name, target, "module alias");
    self.entries.insert(
      name.to_string(),
      ResolutionEntry {
        target: ModuleIdentifier::parse(target),
        kind: EntryKind::Alias,
        origin: origin.map(Path::to_path_buf),
      },
    );
  }

  /// Declare `symbol` (a full `dir/sym` name) as a symbolic version of `target`.
  pub fn add_version(&mut self, symbol: &str, target: &str, origin: Option<&Path>) {
    debug!(symbol, target, "module version");
    let kind = if symbol.rsplit('/').next() == Some(DEFAULT_SYMBOL) {
      EntryKind::Default
    } else {
      EntryKind::Version
    };
    self.entries.insert(
      symbol.to_string(),
      ResolutionEntry {
        target: ModuleIdentifier::parse(target),
        kind,
        origin: origin.map(Path::to_path_buf),
      },
    );
  }

  /// Declare a virtual module backed by `file`.
  pub fn add_virtual(&mut self, name: &str, file: &Path, origin: Option<&Path>) {
    debug!(name, file = %file.display(), "virtual module");
    self.virtuals.insert(
      name.to_string(),
      VirtualEntry {
        file: file.to_path_buf(),
        origin: origin.map(Path::to_path_buf),
      },
    );
  }

  pub fn entry(&self, name: &str) -> Option<&ResolutionEntry> {
    self.entries.get(name)
  }

  pub fn virtual_entry(&self, name: &str) -> Option<&VirtualEntry> {
    self.virtuals.get(name)
  }

  pub fn entries(&self) -> impl Iterator<Item = (&String, &ResolutionEntry)> {
    self.entries.iter()
  }

  pub fn virtuals(&self) -> impl Iterator<Item = (&String, &VirtualEntry)> {
    self.virtuals.iter()
  }

  /// Last components of the symbolic versions pointing at `target`.
  pub fn symbols_for(&self, target: &str) -> Vec<String> {
    self
      .entries
      .iter()
      .filter(|(_, e)| e.kind != EntryKind::Alias && e.target.canonical() == target)
      .filter_map(|(name, _)| name.rsplit('/').next().map(str::to_string))
      .collect()
  }

  /// Follow entries and directory defaults from `name` to a script.
  pub fn resolve(&self, name: &str, source: &mut impl NodeSource) -> Result<Outcome, ResolveError> {
    let requested = name.trim_end_matches('/').to_string();
    let mut traversal = Traversal::default();
    let mut current = requested.clone();

    loop {
      let root = root_of(&current);
      if !source.is_scanned(root) {
        return Ok(Outcome::NeedsScan(root.to_string()));
      }

      traversal.visit(&current)?;

      if let Some(entry) = self.entries.get(&current) {
        debug!(from = %current, to = %entry.target, kind = ?entry.kind, "resolution hop");
        current = entry.target.canonical();
        continue;
      }

      if let Some(virt) = self.virtuals.get(&current) {
        return Ok(Outcome::Resolved(finish(traversal, current, virt.file.clone(), true)));
      }

      match source.node(&current) {
        Node::Script(file) => return Ok(Outcome::Resolved(finish(traversal, current, file, false))),
        Node::Directory { default: Some(child) } => {
          debug!(dir = %current, child = %child, "directory default");
          current = child;
        }
        Node::Directory { default: None } | Node::Missing => return Err(ResolveError::NotFound(requested)),
        Node::Invalid(file) => return Err(ResolveError::InvalidFormat { name: requested, file }),
        Node::Denied(file) => return Err(ResolveError::AccessDenied { name: requested, file }),
      }
    }
  }
}

fn finish(traversal: Traversal, name: String, file: PathBuf, is_virtual: bool) -> Resolution {
  let mut chain = traversal.into_chain();
  chain.retain(|n| *n != name);
  Resolution {
    name,
    file,
    chain,
    is_virtual,
  }
}
