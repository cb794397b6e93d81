//! Module identifiers and name helpers.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// `name/version`, the version omitted meaning "use the default".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleIdentifier {
  pub name: String,
  pub version: Option<String>,
}

impl ModuleIdentifier {
  /// Split a module name on its last `/`.
  pub fn parse(spec: &str) -> Self {
    match spec.rsplit_once('/') {
      Some((name, version)) if !name.is_empty() && !version.is_empty() => Self {
        name: name.to_string(),
        version: Some(version.to_string()),
      },
      _ => Self {
        name: spec.trim_end_matches('/').to_string(),
        version: None,
      },
    }
  }

  /// `name/version`, or the bare name when no version is known.
  pub fn canonical(&self) -> String {
    match &self.version {
      Some(version) => format!("{}/{}", self.name, version),
      None => self.name.clone(),
    }
  }

  /// First path component of the name.
  pub fn root(&self) -> &str {
    root_of(&self.name)
  }
}

impl fmt::Display for ModuleIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.canonical())
  }
}

/// First path component of a module name.
pub fn root_of(name: &str) -> &str {
  name.split('/').next().unwrap_or(name)
}

/// Everything before the last `/`, if any.
pub fn parent_of(name: &str) -> Option<&str> {
  name.rsplit_once('/').map(|(parent, _)| parent)
}

/// A name is hidden when any component starts with `.`.
pub fn is_hidden(name: &str) -> bool {
  name.split('/').any(|c| c.starts_with('.') && c != "." && c != "..")
}

/// Names designating a file directly rather than a module.
pub fn is_path_like(name: &str) -> bool {
  name.starts_with('/') || name.starts_with("./") || name.starts_with("../") || name == "." || name == ".."
}

/// `query` designates `candidate` itself or a directory above it.
pub fn designates(query: &str, candidate: &str) -> bool {
  let query = query.trim_end_matches('/');
  candidate == query
    || (candidate.len() > query.len() && candidate.starts_with(query) && candidate[query.len()..].starts_with('/'))
}

/// Dictionary order where runs of digits compare numerically (`1.9 < 1.10`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
  let mut left = chunks(a).into_iter();
  let mut right = chunks(b).into_iter();
  loop {
    match (left.next(), right.next()) {
      (None, None) => return a.cmp(b),
      (None, Some(_)) => return Ordering::Less,
      (Some(_), None) => return Ordering::Greater,
      (Some(l), Some(r)) => {
        let ord = match (l.parse::<u128>(), r.parse::<u128>()) {
          (Ok(ln), Ok(rn)) => ln.cmp(&rn),
          _ => l.cmp(r),
        };
        if ord != Ordering::Equal {
          return ord;
        }
      }
    }
  }
}

fn chunks(s: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut start = 0;
  let bytes = s.as_bytes();
  for i in 1..=bytes.len() {
    let boundary = i == bytes.len() || bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit();
    if boundary {
      out.push(&s[start..i]);
      start = i;
    }
  }
  out
}
