//! Module locator.
//!
//! Turns a requested name into a script path by walking the modulepath
//! directories in order. Rc files (`.modulerc`, `.version`) are evaluated the
//! first time a root is looked at, feeding the resolution graph; resolution
//! itself is delegated to [`ResolutionGraph::resolve`] over the scanned trees.

mod scan;
mod types;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

pub use scan::{ModTree, TreeNode, classify};
pub use types::{Filter, Listing, ModuleEntry};

use crate::consts::DEFAULT_SYMBOL;
use crate::engine::Ctx;
use crate::ident::{compare_versions, designates, is_hidden, is_path_like, parent_of};
use crate::resolve::{EntryKind, Node, NodeSource, Outcome, Resolution, ResolutionGraph, ResolveError};
use crate::sandbox::{self, Mode, Script, expand_in};

#[derive(Debug, Clone, Error)]
pub enum LocateError {
  #[error("Unable to locate a modulefile for '{0}'")]
  NotFound(String),

  #[error("Magic cookie '#%Module' missing in '{}' for '{name}'", file.display())]
  InvalidFormat { name: String, file: PathBuf },

  #[error("Permission denied on '{}' for '{name}'", file.display())]
  AccessError { name: String, file: PathBuf },

  #[error("No module path defined, cannot locate '{0}'")]
  NoModulePath(String),

  #[error("Module alias or symbolic version cycle: {}", chain.join(" -> "))]
  Cycle { chain: Vec<String> },
}

impl LocateError {
  /// Errors that abort the whole invocation.
  pub fn is_fatal(&self) -> bool {
    matches!(self, LocateError::Cycle { .. } | LocateError::NoModulePath(_))
  }
}

impl From<ResolveError> for LocateError {
  fn from(err: ResolveError) -> Self {
    match err {
      ResolveError::Cycle { chain } => LocateError::Cycle { chain },
      ResolveError::NotFound(name) => LocateError::NotFound(name),
      ResolveError::InvalidFormat { name, file } => LocateError::InvalidFormat { name, file },
      ResolveError::AccessDenied { name, file } => LocateError::AccessError { name, file },
    }
  }
}

/// Scanned trees and rc bookkeeping, kept for the whole invocation.
#[derive(Debug, Default)]
pub struct LocatorState {
  trees: BTreeMap<PathBuf, ModTree>,
  rc_modpaths: BTreeSet<PathBuf>,
  rc_roots: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl LocatorState {
  /// The tree of `modpath`, scanning it on first use.
  pub fn tree(&mut self, modpath: &Path) -> &ModTree {
    self
      .trees
      .entry(modpath.to_path_buf())
      .or_insert_with(|| ModTree::scan(modpath))
  }

  pub fn cached(&self, modpath: &Path) -> Option<&ModTree> {
    self.trees.get(modpath)
  }

  fn root_scanned(&self, modpath: &Path, root: &str) -> bool {
    self.rc_roots.get(modpath).is_some_and(|roots| roots.contains(root))
  }
}

/// Resolution view over the scanned trees of the active modulepaths.
struct TreeSource<'a> {
  locator: &'a LocatorState,
  graph: &'a ResolutionGraph,
  modpaths: &'a [PathBuf],
}

impl NodeSource for TreeSource<'_> {
  fn is_scanned(&self, root: &str) -> bool {
    self.modpaths.iter().all(|mp| self.locator.root_scanned(mp, root))
  }

  fn node(&mut self, name: &str) -> Node {
    for modpath in self.modpaths {
      let Some(tree) = self.locator.cached(modpath) else {
        continue;
      };
      match tree.get(name) {
        Some(TreeNode::Directory) => {
          return Node::Directory {
            default: default_child(self.graph, tree, name),
          };
        }
        Some(TreeNode::Script { file, .. }) => return Node::Script(file.clone()),
        Some(TreeNode::Invalid(file)) => return Node::Invalid(file.clone()),
        Some(TreeNode::Denied(file)) => return Node::Denied(file.clone()),
        None => {}
      }
    }
    Node::Missing
  }
}

/// Explicit `dir/default` when declared, otherwise the highest visible child.
fn default_child(graph: &ResolutionGraph, tree: &ModTree, dir: &str) -> Option<String> {
  let symbol = format!("{dir}/{DEFAULT_SYMBOL}");
  if graph.entry(&symbol).is_some() {
    return Some(symbol);
  }
  tree
    .children(dir)
    .filter(|(name, node)| {
      !is_hidden(name) && matches!(node, TreeNode::Directory | TreeNode::Script { .. })
    })
    .map(|(name, _)| name)
    .max_by(|a, b| compare_versions(a, b))
    .cloned()
}

/// Resolve `name` to a script.
pub fn resolve(ctx: Ctx<'_>, name: &str) -> Result<Resolution, LocateError> {
  let mut name = name.trim_end_matches('/').to_string();

  if is_path_like(&name) {
    let (path, module_dir) = {
      let session = ctx.session.borrow();
      let dir = session.frame().map(|f| f.module_dir().to_string()).unwrap_or_default();
      (session.absolute(&name), dir)
    };
    if path.is_file() {
      return direct(&name, path);
    }
    if !(name.starts_with('/') && !module_dir.is_empty()) {
      return Err(LocateError::NotFound(name));
    }
    name = expand_in(&module_dir, &name);
  }

  let modpaths = ctx.session.borrow().modulepaths();
  if modpaths.is_empty() {
    return Err(LocateError::NoModulePath(name));
  }
  prepare(ctx, &modpaths);

  loop {
    let outcome = {
      let session = ctx.session.borrow();
      let mut source = TreeSource {
        locator: &session.locator,
        graph: &session.graph,
        modpaths: &modpaths,
      };
      session.graph.resolve(&name, &mut source)?
    };
    match outcome {
      Outcome::Resolved(resolution) => {
        debug!(requested = %name, resolved = %resolution.name, "module located");
        return Ok(resolution);
      }
      Outcome::NeedsScan(root) => scan_root(ctx, &modpaths, &root),
    }
  }
}

fn direct(name: &str, path: PathBuf) -> Result<Resolution, LocateError> {
  match classify(&path) {
    TreeNode::Script { file, .. } => Ok(Resolution {
      name: file.to_string_lossy().into_owned(),
      file,
      chain: Vec::new(),
      is_virtual: false,
    }),
    TreeNode::Invalid(file) => Err(LocateError::InvalidFormat {
      name: name.to_string(),
      file,
    }),
    TreeNode::Denied(file) => Err(LocateError::AccessError {
      name: name.to_string(),
      file,
    }),
    TreeNode::Directory => Err(LocateError::NotFound(name.to_string())),
  }
}

/// Scan the trees and evaluate modulepath-level rc files not seen yet.
fn prepare(ctx: Ctx<'_>, modpaths: &[PathBuf]) {
  let pending: Vec<(PathBuf, PathBuf)> = {
    let mut session = ctx.session.borrow_mut();
    let mut pending = Vec::new();
    for modpath in modpaths {
      let rc = session.locator.tree(modpath).modpath_rc().cloned();
      if session.locator.rc_modpaths.insert(modpath.clone()) {
        pending.extend(rc.map(|rc| (modpath.clone(), rc)));
      }
    }
    pending
  };
  // lowest priority first so earlier search directories win
  for (modpath, rc) in pending.iter().rev() {
    evaluate_rc(ctx, modpath, crate::consts::MODULERC, rc);
  }
}

/// Evaluate every rc file under `root` in every modulepath.
fn scan_root(ctx: Ctx<'_>, modpaths: &[PathBuf], root: &str) {
  let pending: Vec<(PathBuf, String, PathBuf)> = {
    let mut session = ctx.session.borrow_mut();
    let mut pending = Vec::new();
    for modpath in modpaths.iter().rev() {
      session
        .locator
        .rc_roots
        .entry(modpath.clone())
        .or_default()
        .insert(root.to_string());
      if let Some(tree) = session.locator.cached(modpath) {
        for (name, file) in tree.rc_files_under(root) {
          pending.push((modpath.clone(), name, file));
        }
      }
    }
    pending
  };
  debug!(root, rc_files = pending.len(), "scanning root");
  for (modpath, name, file) in &pending {
    evaluate_rc(ctx, modpath, name, file);
  }
}

fn evaluate_rc(ctx: Ctx<'_>, modpath: &Path, name: &str, file: &Path) {
  let script = Script::new(name, file, Mode::Scan).modpath(Some(modpath));
  match sandbox::evaluate(ctx, script) {
    Ok(outcome) => {
      if let (Some(version), Some(dir)) = (outcome.modules_version, parent_of(name)) {
        ctx.session.borrow_mut().graph.add_version(
          &format!("{dir}/{DEFAULT_SYMBOL}"),
          &format!("{dir}/{version}"),
          Some(modpath),
        );
      }
    }
    Err(err) => {
      warn!(file = %file.display(), error = %err, "rc file failed");
      ctx
        .session
        .borrow_mut()
        .report
        .warning(format!("Error in rc file '{}': {err}", file.display()));
    }
  }
}

/// Collect listings for every modulepath, filtered.
pub fn available(ctx: Ctx<'_>, filter: Filter<'_>) -> Result<Vec<Listing>, LocateError> {
  let modpaths = ctx.session.borrow().modulepaths();
  if modpaths.is_empty() {
    return Err(LocateError::NoModulePath(filter.patterns.join(" ")));
  }
  prepare(ctx, &modpaths);

  let roots: BTreeSet<String> = {
    let session = ctx.session.borrow();
    modpaths
      .iter()
      .filter_map(|mp| session.locator.cached(mp))
      .flat_map(|tree| tree.roots().cloned().collect::<Vec<_>>())
      .collect()
  };
  for root in roots {
    let scanned = {
      let session = ctx.session.borrow();
      modpaths.iter().all(|mp| session.locator.root_scanned(mp, &root))
    };
    if !scanned {
      scan_root(ctx, &modpaths, &root);
    }
  }

  let session = ctx.session.borrow();
  let mut source = TreeSource {
    locator: &session.locator,
    graph: &session.graph,
    modpaths: &modpaths,
  };

  let mut listings = Vec::new();
  for modpath in &modpaths {
    let Some(tree) = session.locator.cached(modpath) else {
      continue;
    };
    let mut entries = collect_entries(&session.graph, tree, modpath);
    entries.retain(|entry| matches_patterns(entry.name(), filter.patterns));
    if filter.default_only {
      entries.retain(|entry| entry.is_module() && is_default(&session.graph, &mut source, entry.name()));
    }
    if filter.latest_only {
      entries = keep_latest(entries);
    }
    listings.push(Listing {
      modpath: modpath.clone(),
      entries,
    });
  }
  Ok(listings)
}

/// Every loadable module, first modulepath winning on duplicate names.
pub fn all_modules(ctx: Ctx<'_>, patterns: &[String]) -> Result<Vec<(String, PathBuf)>, LocateError> {
  let listings = available(
    ctx,
    Filter {
      patterns,
      ..Filter::default()
    },
  )?;
  let mut seen = BTreeSet::new();
  let mut modules = Vec::new();
  for entry in listings.into_iter().flat_map(|l| l.entries) {
    if let ModuleEntry::Modulefile { name, file, .. } | ModuleEntry::Virtual { name, file } = entry {
      if seen.insert(name.clone()) {
        modules.push((name, file));
      }
    }
  }
  Ok(modules)
}

fn collect_entries(graph: &ResolutionGraph, tree: &ModTree, modpath: &Path) -> Vec<ModuleEntry> {
  let mut entries: Vec<ModuleEntry> = tree
    .nodes()
    .filter(|(name, _)| !is_hidden(name))
    .map(|(name, node)| {
      let name = name.clone();
      match node {
        TreeNode::Directory => ModuleEntry::Directory { name },
        TreeNode::Script { file, modified } => ModuleEntry::Modulefile {
          name,
          file: file.clone(),
          modified: *modified,
        },
        TreeNode::Invalid(file) => ModuleEntry::Invalid {
          name,
          file: file.clone(),
        },
        TreeNode::Denied(file) => ModuleEntry::AccessError {
          name,
          file: file.clone(),
        },
      }
    })
    .collect();

  for (name, entry) in graph.entries() {
    if is_hidden(name) || entry.origin.as_deref() != Some(modpath) {
      continue;
    }
    let target = entry.target.canonical();
    entries.push(match entry.kind {
      EntryKind::Alias => ModuleEntry::Alias {
        name: name.clone(),
        target,
      },
      EntryKind::Version | EntryKind::Default => ModuleEntry::Version {
        name: name.clone(),
        target,
      },
    });
  }

  for (name, virt) in graph.virtuals() {
    if !is_hidden(name) && virt.origin.as_deref() == Some(modpath) {
      entries.push(ModuleEntry::Virtual {
        name: name.clone(),
        file: virt.file.clone(),
      });
    }
  }

  entries.sort_by(|a, b| compare_versions(a.name(), b.name()));
  entries
}

fn matches_patterns(name: &str, patterns: &[String]) -> bool {
  patterns.is_empty() || patterns.iter().any(|p| designates(p, name) || name.starts_with(p.as_str()))
}

/// `name` is what its parent directory resolves to.
fn is_default(graph: &ResolutionGraph, source: &mut TreeSource<'_>, name: &str) -> bool {
  let Some(dir) = parent_of(name) else {
    return true;
  };
  matches!(graph.resolve(dir, source), Ok(Outcome::Resolved(r)) if r.name == name)
}

/// Keep the highest module of each directory.
fn keep_latest(entries: Vec<ModuleEntry>) -> Vec<ModuleEntry> {
  let mut best: BTreeMap<String, ModuleEntry> = BTreeMap::new();
  for entry in entries.into_iter().filter(ModuleEntry::is_module) {
    let dir = parent_of(entry.name()).unwrap_or("").to_string();
    let replace = match best.get(&dir) {
      Some(current) => compare_versions(entry.name(), current.name()) == Ordering::Greater,
      None => true,
    };
    if replace {
      best.insert(dir, entry);
    }
  }
  let mut latest: Vec<ModuleEntry> = best.into_values().collect();
  latest.sort_by(|a, b| compare_versions(a.name(), b.name()));
  latest
}
