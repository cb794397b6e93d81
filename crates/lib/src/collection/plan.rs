//! Minimal edit between the current state and a saved collection.

use super::Collection;

/// Ordered edits turning the current state into a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePlan {
  /// Modules to unload, most recent first.
  pub unload: Vec<String>,
  pub unuse: Vec<String>,
  /// Paths to append to the search path, in order.
  pub use_paths: Vec<String>,
  pub load: Vec<String>,
}

impl RestorePlan {
  /// Keep the longest common prefix of each list and redo the rest.
  pub fn compute(current_paths: &[String], current_modules: &[String], target: &Collection) -> Self {
    let paths = common_prefix(current_paths, &target.paths);
    let modules = common_prefix(current_modules, &target.modules);
    Self {
      unload: current_modules[modules..].iter().rev().cloned().collect(),
      unuse: current_paths[paths..].iter().rev().cloned().collect(),
      use_paths: target.paths[paths..].to_vec(),
      load: target.modules[modules..].to_vec(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.unload.is_empty() && self.unuse.is_empty() && self.use_paths.is_empty() && self.load.is_empty()
  }
}

fn common_prefix(a: &[String], b: &[String]) -> usize {
  a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
