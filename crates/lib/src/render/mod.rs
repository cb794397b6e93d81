//! Shell code generation.
//!
//! The engine never touches the caller's process. Its only effect is the code
//! [`render`] writes for the caller to evaluate: the net environment delta,
//! alias edits, X resources, a directory change and one final statement
//! carrying the command's boolean or text result.

mod dialects;
mod quote;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub use dialects::Dialect;

use crate::session::Report;

/// Output languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
  Sh,
  Bash,
  Ksh,
  Zsh,
  Csh,
  Tcsh,
  Fish,
  Cmd,
  Perl,
  Python,
  Ruby,
  Cmake,
  R,
  Pwsh,
}

impl Shell {
  pub const ALL: [Shell; 14] = [
    Shell::Sh,
    Shell::Bash,
    Shell::Ksh,
    Shell::Zsh,
    Shell::Csh,
    Shell::Tcsh,
    Shell::Fish,
    Shell::Cmd,
    Shell::Perl,
    Shell::Python,
    Shell::Ruby,
    Shell::Cmake,
    Shell::R,
    Shell::Pwsh,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Shell::Sh => "sh",
      Shell::Bash => "bash",
      Shell::Ksh => "ksh",
      Shell::Zsh => "zsh",
      Shell::Csh => "csh",
      Shell::Tcsh => "tcsh",
      Shell::Fish => "fish",
      Shell::Cmd => "cmd",
      Shell::Perl => "perl",
      Shell::Python => "python",
      Shell::Ruby => "ruby",
      Shell::Cmake => "cmake",
      Shell::R => "r",
      Shell::Pwsh => "pwsh",
    }
  }

  /// Dialect family the shell belongs to.
  pub fn kind(self) -> &'static str {
    match self {
      Shell::Sh | Shell::Bash | Shell::Ksh | Shell::Zsh => "sh",
      Shell::Csh | Shell::Tcsh => "csh",
      other => other.name(),
    }
  }

  pub fn dialect(self) -> &'static dyn Dialect {
    match self {
      Shell::Sh | Shell::Bash | Shell::Ksh | Shell::Zsh => &dialects::Posix,
      Shell::Csh | Shell::Tcsh => &dialects::Csh,
      Shell::Fish => &dialects::Fish,
      Shell::Cmd => &dialects::Cmd,
      Shell::Perl => &dialects::Perl,
      Shell::Python => &dialects::Python,
      Shell::Ruby => &dialects::Ruby,
      Shell::Cmake => &dialects::Cmake,
      Shell::R => &dialects::R,
      Shell::Pwsh => &dialects::Pwsh,
    }
  }
}

impl fmt::Display for Shell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported shell type '{0}'")]
pub struct UnknownShell(pub String);

impl FromStr for Shell {
  type Err = UnknownShell;

  /// Accepts a bare name or a path to the shell binary.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let base = s.rsplit(['/', '\\']).next().unwrap_or(s);
    let base = base.strip_suffix(".exe").unwrap_or(base);
    let shell = match base.to_ascii_lowercase().as_str() {
      "sh" | "dash" => Shell::Sh,
      "bash" => Shell::Bash,
      "ksh" | "mksh" => Shell::Ksh,
      "zsh" => Shell::Zsh,
      "csh" => Shell::Csh,
      "tcsh" => Shell::Tcsh,
      "fish" => Shell::Fish,
      "cmd" => Shell::Cmd,
      "perl" => Shell::Perl,
      "python" | "python3" => Shell::Python,
      "ruby" => Shell::Ruby,
      "cmake" => Shell::Cmake,
      "r" => Shell::R,
      "pwsh" | "powershell" => Shell::Pwsh,
      _ => return Err(UnknownShell(s.to_string())),
    };
    Ok(shell)
  }
}

/// Net effect of an invocation, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMutations {
  /// Variables to set (`Some`) or unset (`None`), by name.
  pub env: Vec<(String, Option<String>)>,
  pub aliases: Vec<(String, Option<String>)>,
  pub x_resources: Vec<String>,
  pub chdir: Option<PathBuf>,
  /// Executable the `module` function should call, when one is to be defined.
  pub module_function: Option<PathBuf>,
}

impl PendingMutations {
  pub fn is_empty(&self) -> bool {
    self.env.is_empty()
      && self.aliases.is_empty()
      && self.x_resources.is_empty()
      && self.chdir.is_none()
      && self.module_function.is_none()
  }
}

/// Result statement closing the rendered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
  Boolean(bool),
  Text(String),
}

/// Render `pending` as code for `shell`, ending with `signal`.
///
/// Statements a shell cannot hold are truncated and reported on `report`.
pub fn render(shell: Shell, pending: &PendingMutations, signal: &Signal, report: &mut Report) -> String {
  let dialect = shell.dialect();
  let mut out = Vec::new();

  if let Some(preamble) = dialect.preamble() {
    out.push(preamble.to_string());
  }
  if let Some(exe) = &pending.module_function {
    if let Some(def) = dialect.module_function(&exe.to_string_lossy(), shell.name()) {
      out.push(def);
    }
  }

  for (name, value) in &pending.env {
    if !is_variable_name(name) {
      report.warning(format!("Invalid variable name '{name}' ignored"));
      continue;
    }
    let statement = match value {
      Some(value) => assign(shell, dialect, name, value, report),
      None => dialect.unset(name),
    };
    out.push(statement);
  }

  for (name, value) in &pending.aliases {
    if !is_alias_name(name) {
      report.warning(format!("Invalid alias name '{name}' ignored"));
      continue;
    }
    let statement = match value {
      Some(value) => dialect.alias(name, value),
      None => dialect.unalias(name),
    };
    out.extend(statement);
  }

  if !pending.x_resources.is_empty() {
    out.extend(dialect.x_resources(&pending.x_resources));
  }
  if let Some(dir) = &pending.chdir {
    out.extend(dialect.chdir(&dir.to_string_lossy()));
  }

  out.push(match signal {
    Signal::Boolean(value) => dialect.boolean(*value),
    Signal::Text(text) => dialect.text(text),
  });

  let mut code = out.join("\n");
  code.push('\n');
  code
}

/// Names every dialect can carry without quoting: a letter or `_`, then letters, digits or `_`.
fn is_variable_name(name: &str) -> bool {
  let mut chars = name.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_alias_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with('-')
    && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
}

fn assign(shell: Shell, dialect: &dyn Dialect, name: &str, value: &str, report: &mut Report) -> String {
  let statement = dialect.assign(name, value);
  let Some(limit) = dialect.max_statement_len() else {
    return statement;
  };
  if statement.len() <= limit {
    return statement;
  }

  let mut value = value.to_string();
  let mut statement = statement;
  while statement.len() > limit && !value.is_empty() {
    let excess = statement.len() - limit;
    let mut cut = value.len().saturating_sub(excess);
    while !value.is_char_boundary(cut) {
      cut -= 1;
    }
    value.truncate(cut);
    statement = dialect.assign(name, &value);
  }
  report.warning(format!(
    "Value of '{name}' exceeds the {limit} character statement limit of {shell} and has been truncated"
  ));
  statement
}
