//! Settings transaction stack.
//!
//! Every module evaluation inside a batch runs between a `push` and a `pop`.
//! A failed evaluation calls `restore` first, putting the settings back to the
//! snapshot so only the failing module's edits are lost.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use super::EnvMap;

/// Mutable state one module evaluation may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
  pub env: EnvMap,
  /// Alias edits: `Some` defines, `None` removes.
  pub aliases: BTreeMap<String, Option<String>>,
  pub x_resources: Vec<String>,
  pub chdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsStack {
  snapshots: Vec<Settings>,
}

impl SettingsStack {
  /// Snapshot `current`.
  pub fn push(&mut self, current: &Settings) {
    self.snapshots.push(current.clone());
    debug!(depth = self.snapshots.len(), "settings pushed");
  }

  /// Discard the most recent snapshot.
  pub fn pop(&mut self) -> Option<Settings> {
    let popped = self.snapshots.pop();
    debug!(depth = self.snapshots.len(), "settings popped");
    popped
  }

  /// Replace `current` with the top snapshot, keeping the snapshot.
  ///
  /// Returns false when the stack is empty.
  pub fn restore(&self, current: &mut Settings) -> bool {
    match self.snapshots.last() {
      Some(top) => {
        debug!(depth = self.snapshots.len(), "settings restored");
        *current = top.clone();
        true
      }
      None => false,
    }
  }

  pub fn depth(&self) -> usize {
    self.snapshots.len()
  }
}
