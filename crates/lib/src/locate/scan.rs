//! Modulepath directory scanning.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::consts::{MAGIC_MARKER, MODULERC, VERSION_FILE};
use crate::ident::parent_of;

/// Version-control directories never hold modulefiles.
const IGNORED_DIRS: &[&str] = &[".git", ".svn", ".hg", "CVS"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
  Directory,
  Script { file: PathBuf, modified: Option<SystemTime> },
  Invalid(PathBuf),
  Denied(PathBuf),
}

/// Contents of one modulepath directory, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct ModTree {
  modpath: PathBuf,
  nodes: BTreeMap<String, TreeNode>,
  /// Rc files by the module directory holding them (`""` for the modulepath itself).
  rc_files: BTreeMap<String, Vec<PathBuf>>,
}

impl ModTree {
  pub fn scan(modpath: &Path) -> Self {
    let mut tree = Self {
      modpath: modpath.to_path_buf(),
      ..Self::default()
    };
    if !modpath.is_dir() {
      debug!(modpath = %modpath.display(), "modulepath directory not found");
      return tree;
    }

    let walker = WalkDir::new(modpath)
      .min_depth(1)
      .follow_links(true)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| !(e.file_type().is_dir() && IGNORED_DIRS.iter().any(|d| e.file_name() == *d)));

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
          debug!(error = %err, "skipping unreadable modulepath entry");
          continue;
        }
      };
      let Ok(relative) = entry.path().strip_prefix(modpath) else {
        continue;
      };
      let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
      let file_name = entry.file_name().to_string_lossy();

      if entry.file_type().is_dir() {
        tree.nodes.insert(name, TreeNode::Directory);
        continue;
      }
      if file_name == MODULERC || file_name == VERSION_FILE {
        let dir = parent_of(&name).unwrap_or("").to_string();
        tree.rc_files.entry(dir).or_default().push(entry.path().to_path_buf());
        continue;
      }
      // editor backups
      if file_name.ends_with('~') || file_name.starts_with(".#") {
        continue;
      }
      tree.nodes.insert(name, classify(entry.path()));
    }

    debug!(modpath = %modpath.display(), nodes = tree.nodes.len(), "modulepath scanned");
    tree
  }

  pub fn modpath(&self) -> &Path {
    &self.modpath
  }

  pub fn get(&self, name: &str) -> Option<&TreeNode> {
    self.nodes.get(name)
  }

  pub fn nodes(&self) -> impl Iterator<Item = (&String, &TreeNode)> {
    self.nodes.iter()
  }

  /// Direct children of directory `dir`.
  pub fn children<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a TreeNode)> + 'a {
    self.nodes.iter().filter(move |(name, _)| parent_of(name) == Some(dir))
  }

  /// Top-level names.
  pub fn roots(&self) -> impl Iterator<Item = &String> {
    self.nodes.keys().filter(|name| !name.contains('/'))
  }

  /// The modulepath-level `.modulerc`, if present.
  pub fn modpath_rc(&self) -> Option<&PathBuf> {
    self
      .rc_files
      .get("")?
      .iter()
      .find(|file| file.file_name().is_some_and(|n| n == MODULERC))
  }

  /// Rc files in `root` and every directory below it, as `(rc name, file)`.
  pub fn rc_files_under(&self, root: &str) -> Vec<(String, PathBuf)> {
    let prefix = format!("{root}/");
    self
      .rc_files
      .iter()
      .filter(|(dir, _)| *dir == root || dir.starts_with(&prefix))
      .flat_map(|(dir, files)| {
        files.iter().map(move |file| {
          let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
          (format!("{dir}/{file_name}"), file.clone())
        })
      })
      .collect()
  }
}

/// Check a candidate file for the magic marker.
pub fn classify(path: &Path) -> TreeNode {
  let file = match File::open(path) {
    Ok(file) => file,
    Err(err) => {
      if err.kind() != io::ErrorKind::PermissionDenied {
        debug!(file = %path.display(), error = %err, "cannot open modulefile");
      }
      return TreeNode::Denied(path.to_path_buf());
    }
  };

  let mut header = Vec::with_capacity(MAGIC_MARKER.len());
  match file.take(MAGIC_MARKER.len() as u64).read_to_end(&mut header) {
    Ok(_) if header == MAGIC_MARKER.as_bytes() => TreeNode::Script {
      file: path.to_path_buf(),
      modified: fs::metadata(path).and_then(|m| m.modified()).ok(),
    },
    Ok(_) => TreeNode::Invalid(path.to_path_buf()),
    Err(_) => TreeNode::Denied(path.to_path_buf()),
  }
}
