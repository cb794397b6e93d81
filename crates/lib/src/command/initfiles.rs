//! Shell startup files and session initialization.
//!
//! The `init*` commands edit the `module load` lines of the startup files the
//! caller's shell reads. `autoinit` prepares a fresh session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::Outcome;
use super::collections;
use crate::collection::Collection;
use crate::consts::{LIST_DELIM, LOADEDMODULES, MODULEPATH};
use crate::engine::{Ctx, EngineError};
use crate::pathlist::Position;
use crate::platform::paths::home_dir;
use crate::render::Shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitAction {
  Add,
  Prepend,
  Remove,
  Switch,
  List,
  Clear,
}

impl InitAction {
  pub fn verb(self) -> &'static str {
    match self {
      InitAction::Add => "initadd",
      InitAction::Prepend => "initprepend",
      InitAction::Remove => "initrm",
      InitAction::Switch => "initswitch",
      InitAction::List => "initlist",
      InitAction::Clear => "initclear",
    }
  }
}

#[derive(Debug, Error)]
pub enum InitFileError {
  #[error("Cannot find a 'module load' command in any of the '{shell}' startup files")]
  NoLoadLine { shell: Shell },

  #[error("Failed to update startup file '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Startup files read by `shell`, relative to the home directory.
fn startup_files(shell: Shell) -> &'static [&'static str] {
  match shell {
    Shell::Sh => &[".modules", ".profile"],
    Shell::Bash => &[".modules", ".bash_profile", ".bash_login", ".profile", ".bashrc"],
    Shell::Ksh => &[".modules", ".profile", ".kshenv"],
    Shell::Zsh => &[".modules", ".zshrc", ".zshenv", ".zlogin"],
    Shell::Csh => &[".modules", ".cshrc", ".csh_variables", ".login"],
    Shell::Tcsh => &[".modules", ".tcshrc", ".cshrc", ".csh_variables", ".login"],
    Shell::Fish => &[".modules", ".config/fish/config.fish"],
    _ => &[".modules"],
  }
}

/// Modules named on a `module load` line, or `None` for other lines.
fn load_line(line: &str) -> Option<Vec<String>> {
  let mut words = line.split_whitespace();
  if words.next() != Some("module") {
    return None;
  }
  match words.next() {
    Some("load") | Some("add") => Some(words.map(str::to_string).collect()),
    _ => None,
  }
}

/// New module list of one line; `None` when `action` only reads.
fn edited(action: InitAction, current: &[String], args: &[String]) -> Option<Vec<String>> {
  let mut modules = current.to_vec();
  match action {
    InitAction::Add => {
      modules.retain(|m| !args.contains(m));
      modules.extend(args.iter().cloned());
    }
    InitAction::Prepend => {
      modules.retain(|m| !args.contains(m));
      modules.splice(0..0, args.iter().cloned());
    }
    InitAction::Remove => modules.retain(|m| !args.contains(m)),
    InitAction::Switch => {
      if let [old, new] = args {
        for module in modules.iter_mut() {
          if module == old {
            *module = new.clone();
          }
        }
      }
    }
    InitAction::Clear => modules.clear(),
    InitAction::List => return None,
  }
  Some(modules)
}

pub fn edit(ctx: Ctx<'_>, action: InitAction, args: &[String]) -> Result<Outcome, EngineError> {
  let (shell, home) = {
    let session = ctx.session.borrow();
    (session.shell, home_dir(session.env()))
  };

  let mut found = false;
  for relative in startup_files(shell) {
    let path = home.join(relative);
    let Ok(text) = fs::read_to_string(&path) else {
      continue;
    };

    let mut changed = false;
    let mut lines = Vec::new();
    for line in text.lines() {
      let Some(current) = load_line(line) else {
        lines.push(line.to_string());
        continue;
      };
      found = true;
      match edited(action, &current, args) {
        Some(modules) => {
          let verb = if modules.is_empty() { "module load" } else { "module load " };
          let line = format!("{verb}{}", modules.join(" "));
          changed |= modules != current;
          lines.push(line);
        }
        None => {
          ctx.session.borrow_mut().report.info(format!(
            "{} loads modules:\n\t{}",
            path.display(),
            current.join(" ")
          ));
          lines.push(line.to_string());
        }
      }
    }

    if changed {
      let mut content = lines.join("\n");
      content.push('\n');
      write_atomic(&path, &content)?;
      debug!(file = %path.display(), action = action.verb(), "startup file updated");
    }
  }

  if !found {
    return Err(InitFileError::NoLoadLine { shell }.into());
  }
  Ok(Outcome::Status(true))
}

fn write_atomic(path: &Path, content: &str) -> Result<(), InitFileError> {
  let io_err = |source| InitFileError::Io {
    path: path.to_path_buf(),
    source,
  };
  let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
  fs::write(&temp_path, content).map_err(io_err)?;
  fs::rename(&temp_path, path).map_err(io_err)
}

/// Define the `module` command and seed an empty session from the configuration directory.
pub fn autoinit(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  let config_dir = {
    let mut session = ctx.session.borrow_mut();
    session.define_module_function = true;
    session.config.config_dir.clone()
  };

  {
    let mut session = ctx.session.borrow_mut();
    if session.getenv(MODULEPATH).is_none() {
      let dirs = match fs::read_to_string(config_dir.join("modulespath")) {
        Ok(text) => text
          .lines()
          .map(str::trim)
          .filter(|l| !l.is_empty() && !l.starts_with('#'))
          .map(str::to_string)
          .collect(),
        Err(_) => Vec::new(),
      };
      if !dirs.is_empty() {
        if let Err(err) = session.add_path(MODULEPATH, Position::Append, &dirs, LIST_DELIM, false) {
          session.report.error(err.to_string());
        }
      }
    }
    if session.getenv(LOADEDMODULES).is_none() {
      session.setenv(LOADEDMODULES, "");
    }
  }

  let initrc = config_dir.join("initrc");
  let nothing_loaded = ctx.session.borrow().loaded().is_empty();
  if nothing_loaded && initrc.is_file() {
    let text = fs::read_to_string(&initrc).map_err(|source| InitFileError::Io {
      path: initrc.clone(),
      source,
    })?;
    let initial = Collection::parse("initrc", &text)?;
    // initrc paths extend the search path rather than replace it
    let mut paths: Vec<String> = ctx
      .session
      .borrow()
      .modulepaths()
      .iter()
      .map(|p| p.to_string_lossy().into_owned())
      .collect();
    for path in initial.paths {
      if !paths.contains(&path) {
        paths.push(path);
      }
    }
    let target = Collection {
      paths,
      modules: initial.modules,
    };
    return Ok(Outcome::Status(collections::apply(ctx, &target)?));
  }
  Ok(Outcome::Status(true))
}
