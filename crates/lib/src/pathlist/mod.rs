//! Reference-counted path-list algebra.
//!
//! A path-like variable (`PATH`, `MODULEPATH`, ...) is a delimited list. Each
//! entry carries a reference count recording how many contributors added it,
//! stored in a parallel shadow variable (`__MODULES_SHARE_<VAR>`) as
//! alternating `entry<delim>count` tokens joined by the variable's delimiter.
//!
//! Invariant: the keys of the count map are exactly the distinct
//! entries, every count is at least 1.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::consts::SHARE_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathListError {
  #[error("empty delimiter given for path variable '{0}'")]
  EmptyDelimiter(String),

  #[error("invalid path index '{0}'")]
  InvalidIndex(String),
}

/// Reject delimiters that cannot split anything.
pub fn check_delimiter(var: &str, delimiter: &str) -> Result<(), PathListError> {
  if delimiter.is_empty() {
    return Err(PathListError::EmptyDelimiter(var.to_string()));
  }
  Ok(())
}

/// Parse 0-based index arguments.
pub fn parse_indices(values: &[String]) -> Result<Vec<usize>, PathListError> {
  values
    .iter()
    .map(|v| v.trim().parse::<usize>().map_err(|_| PathListError::InvalidIndex(v.clone())))
    .collect()
}

/// Where new entries are spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
  Prepend,
  Append,
}

/// What `remove` matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
  /// Entries equal to one of these values.
  Values(Vec<String>),
  /// Entries at these 0-based positions.
  Indices(Vec<usize>),
}

/// In-memory state of one path-like variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVariable {
  name: String,
  delimiter: String,
  entries: Vec<String>,
  counts: BTreeMap<String, u32>,
}

/// Result of reading a variable and its shadow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
  pub variable: PathVariable,
  /// The shadow existed but disagreed with the variable and was corrected.
  pub repaired: bool,
}

/// Name of the shadow variable tracking `var`.
pub fn shadow_name(var: &str) -> String {
  format!("{SHARE_PREFIX}{var}")
}

impl PathVariable {
  /// An empty variable.
  pub fn new(name: &str, delimiter: &str) -> Self {
    Self {
      name: name.to_string(),
      delimiter: delimiter.to_string(),
      entries: Vec::new(),
      counts: BTreeMap::new(),
    }
  }

  /// Read a variable from its current value and shadow value.
  ///
  /// An empty value is a single empty entry only when the shadow records a
  /// zero-length entry; otherwise it is an empty list.
  pub fn parse(name: &str, delimiter: &str, value: Option<&str>, shadow: Option<&str>) -> Parsed {
    let mut variable = Self::new(name, delimiter);
    let recorded = shadow.map(|s| parse_shadow(s, delimiter)).unwrap_or_default();

    variable.entries = match value {
      None => Vec::new(),
      Some("") if recorded.contains_key("") => vec![String::new()],
      Some("") => Vec::new(),
      Some(v) => v.split(delimiter).map(str::to_string).collect(),
    };

    let mut repaired = false;
    for entry in &variable.entries {
      if variable.counts.contains_key(entry) {
        continue;
      }
      match recorded.get(entry) {
        Some(&count) if count >= 1 => {
          variable.counts.insert(entry.clone(), count);
        }
        _ => {
          repaired = true;
          variable.counts.insert(entry.clone(), 1);
        }
      }
    }
    if recorded.keys().any(|k| !variable.counts.contains_key(k)) {
      repaired = true;
    }

    Parsed {
      variable,
      // A variable nobody tracked yet (e.g. a system PATH) is not a repair.
      repaired: repaired && shadow.is_some(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn delimiter(&self) -> &str {
    &self.delimiter
  }

  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  /// Reference count of `entry`, 0 when absent.
  pub fn count(&self, entry: &str) -> u32 {
    self.counts.get(entry).copied().unwrap_or(0)
  }

  pub fn contains(&self, entry: &str) -> bool {
    self.counts.contains_key(entry)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Value to store, `None` meaning the variable should be unset.
  pub fn value(&self) -> Option<String> {
    if self.entries.is_empty() {
      None
    } else {
      Some(self.entries.join(&self.delimiter))
    }
  }

  /// Shadow value to store, `None` meaning the shadow should be unset.
  pub fn shadow(&self) -> Option<String> {
    if self.entries.is_empty() {
      return None;
    }
    let mut seen = Vec::new();
    let mut tokens = Vec::new();
    for entry in &self.entries {
      if seen.contains(&entry) {
        continue;
      }
      seen.push(entry);
      tokens.push(entry.clone());
      tokens.push(self.count(entry).to_string());
    }
    Some(tokens.join(&self.delimiter))
  }

  /// Add `values` at `position`, counting one reference per value.
  ///
  /// A value already present is only counted again unless `allow_duplicates`
  /// asks for another occurrence.
  pub fn add(&mut self, position: Position, values: &[String], allow_duplicates: bool) {
    let mut block: Vec<String> = Vec::new();
    for value in split_values(values, &self.delimiter) {
      let present = self.entries.contains(&value) || block.contains(&value);
      *self.counts.entry(value.clone()).or_insert(0) += 1;
      if !present || allow_duplicates {
        block.push(value);
      }
    }
    match position {
      Position::Prepend => {
        self.entries.splice(0..0, block);
      }
      Position::Append => self.entries.extend(block),
    }
  }

  /// Drop one reference for each targeted entry.
  ///
  /// Entries whose count reaches zero disappear from every position. When more
  /// occurrences remain than the count allows, the excess is removed starting
  /// from the end of the list. `force` removes entries regardless of counts.
  pub fn remove(&mut self, target: &RemoveTarget, force: bool) {
    let values: Vec<String> = match target {
      RemoveTarget::Values(values) => split_values(values, &self.delimiter),
      RemoveTarget::Indices(indices) => {
        let mut picked = Vec::new();
        for &index in indices {
          if let Some(entry) = self.entries.get(index) {
            if !picked.contains(entry) {
              picked.push(entry.clone());
            }
          }
        }
        picked
      }
    };

    for value in values {
      self.remove_one(&value, force);
    }
  }

  fn remove_one(&mut self, value: &str, force: bool) {
    let occurrences = self.entries.iter().filter(|e| *e == value).count();
    if occurrences == 0 {
      self.counts.remove(value);
      return;
    }

    let current = self.count(value).max(1);
    let remaining = if force { 0 } else { current - 1 };

    if remaining == 0 {
      self.entries.retain(|e| e != value);
      self.counts.remove(value);
      return;
    }

    self.counts.insert(value.to_string(), remaining);
    let mut excess = occurrences.saturating_sub(remaining as usize);
    let mut index = self.entries.len();
    while excess > 0 && index > 0 {
      index -= 1;
      if self.entries[index] == value {
        self.entries.remove(index);
        excess -= 1;
      }
    }
  }
}

/// Split each value on the delimiter; an empty value is one empty entry.
fn split_values(values: &[String], delimiter: &str) -> Vec<String> {
  let mut out = Vec::new();
  for value in values {
    if value.is_empty() {
      out.push(String::new());
    } else {
      out.extend(value.split(delimiter).map(str::to_string));
    }
  }
  out
}

fn parse_shadow(shadow: &str, delimiter: &str) -> BTreeMap<String, u32> {
  let tokens: Vec<&str> = shadow.split(delimiter).collect();
  let mut counts = BTreeMap::new();
  for pair in tokens.chunks(2) {
    if let [entry, count] = pair {
      if let Ok(count) = count.parse::<u32>() {
        counts.insert(entry.to_string(), count);
      }
    }
  }
  counts
}
