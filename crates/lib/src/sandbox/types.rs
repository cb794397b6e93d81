use std::fmt;
use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;

use crate::engine::EngineError;
use crate::locate::LocateError;

/// Interpretation mode of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
  Load,
  Unload,
  Display,
  Help,
  Test,
  Whatis,
  /// Rc files: only declarations and queries act.
  Scan,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Load => "load",
      Mode::Unload => "unload",
      Mode::Display => "display",
      Mode::Help => "help",
      Mode::Test => "test",
      Mode::Whatis => "whatis",
      Mode::Scan => "scan",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One entry of the evaluation call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  /// Canonical module name (or rc file name relative to its modulepath).
  pub name: String,
  /// Name as the user typed it.
  pub specified: String,
  pub file: PathBuf,
  pub mode: Mode,
  pub command: String,
  /// Modulepath directory the script was found in.
  pub modpath: Option<PathBuf>,
  pub whatis: Vec<String>,
}

impl Frame {
  /// Module directory used to expand `/name` shorthand.
  pub fn module_dir(&self) -> &str {
    crate::ident::parent_of(&self.name).unwrap_or("")
  }
}

/// Control flow raised from a primitive through Lua.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptSignal {
  #[error("stop")]
  Stop,

  #[error("exit {0}")]
  Exit(i32),

  #[error("{0}")]
  Rejected(String),
}

impl ScriptSignal {
  pub fn raise<T>(self) -> LuaResult<T> {
    Err(LuaError::external(self))
  }

  /// Find a signal inside a Lua error, looking through callback wrappers.
  pub fn find(error: &LuaError) -> Option<&ScriptSignal> {
    match error {
      LuaError::ExternalError(inner) => inner.downcast_ref::<ScriptSignal>(),
      LuaError::CallbackError { cause, .. } => Self::find(cause),
      LuaError::WithContext { cause, .. } => Self::find(cause),
      _ => None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ScriptError {
  #[error("Module ERROR: {message}\n  in '{}'", file.display())]
  Internal { file: PathBuf, message: String },

  #[error("{reason}")]
  Rejected { name: String, reason: String },

  #[error("Module '{name}' exited with status {code}")]
  Failed { name: String, code: i32 },

  #[error("Magic cookie '#%Module' missing in '{}'", .0.display())]
  InvalidFormat(PathBuf),

  #[error("Cannot read '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A search failure that aborts the whole invocation, raised from inside the script.
  #[error(transparent)]
  Fatal(LocateError),

  #[error(transparent)]
  Lua(#[from] LuaError),
}

/// A fatal locate error inside a Lua error, looking through callback wrappers.
pub fn find_fatal(error: &LuaError) -> Option<&LocateError> {
  match error {
    LuaError::ExternalError(inner) => {
      let err = match inner.downcast_ref::<EngineError>() {
        Some(EngineError::Locate(err)) => Some(err),
        Some(_) => None,
        None => inner.downcast_ref::<LocateError>(),
      };
      err.filter(|err| err.is_fatal())
    }
    LuaError::CallbackError { cause, .. } => find_fatal(cause),
    LuaError::WithContext { cause, .. } => find_fatal(cause),
    _ => None,
  }
}

/// What an evaluation produced besides its side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalOutcome {
  /// `whatis` lines recorded in whatis mode.
  pub whatis: Vec<String>,
  /// `ModulesVersion` set by a `.version` file.
  pub modules_version: Option<String>,
  /// Help/test callback was present.
  pub callback_found: bool,
  /// Truthiness of `ModulesTest()`.
  pub test_passed: Option<bool>,
  /// Evaluation was skipped because interpretation is inhibited.
  pub skipped: bool,
}
