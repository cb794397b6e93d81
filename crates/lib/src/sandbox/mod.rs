//! Sandboxed modulefile evaluation.
//!
//! [`evaluate`] runs one script under one [`Mode`]. Scripts may trigger nested
//! evaluations through primitives (`module`, `is_avail`, ...); each nesting
//! depth runs in its own pooled context (see [`context`]).

mod context;
mod primitives;
mod types;

use std::fs;
use std::path::Path;

use mlua::prelude::*;
use tracing::{debug, warn};

pub use context::install;
pub(crate) use primitives::expand_in;
pub use types::{EvalOutcome, Frame, Mode, ScriptError, ScriptSignal};
use types::find_fatal;

use crate::consts::MAGIC_MARKER;
use crate::engine::Ctx;

/// A script to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct Script<'a> {
  /// Canonical module name, or rc file name relative to its modulepath.
  pub name: &'a str,
  pub specified: &'a str,
  pub file: &'a Path,
  pub mode: Mode,
  pub modpath: Option<&'a Path>,
  /// Accept files lacking the magic marker.
  pub relaxed: bool,
}

impl<'a> Script<'a> {
  pub fn new(name: &'a str, file: &'a Path, mode: Mode) -> Self {
    Self {
      name,
      specified: name,
      file,
      mode,
      modpath: None,
      relaxed: false,
    }
  }

  pub fn specified(mut self, specified: &'a str) -> Self {
    self.specified = specified;
    self
  }

  pub fn modpath(mut self, modpath: Option<&'a Path>) -> Self {
    self.modpath = modpath;
    self
  }

  pub fn relaxed(mut self) -> Self {
    self.relaxed = true;
    self
  }
}

/// Read a script and strip its magic marker line.
///
/// The first line is blanked rather than removed so Lua line numbers match the file.
pub fn read_script(file: &Path, relaxed: bool) -> Result<String, ScriptError> {
  let content = fs::read_to_string(file).map_err(|source| ScriptError::Io {
    path: file.to_path_buf(),
    source,
  })?;
  if !content.starts_with(MAGIC_MARKER) && !relaxed {
    return Err(ScriptError::InvalidFormat(file.to_path_buf()));
  }
  if content.starts_with('#') {
    let rest = content.find('\n').map(|i| &content[i..]).unwrap_or("");
    return Ok(rest.to_string());
  }
  Ok(content)
}

/// Evaluate `script`, mapping control signals to outcomes.
pub fn evaluate(ctx: Ctx<'_>, script: Script<'_>) -> Result<EvalOutcome, ScriptError> {
  if ctx.session.borrow().is_inhibited() {
    debug!(module = script.name, "interpretation inhibited, skipping");
    return Ok(EvalOutcome {
      skipped: true,
      ..EvalOutcome::default()
    });
  }

  let body = read_script(script.file, script.relaxed)?;

  let depth = {
    let mut session = ctx.session.borrow_mut();
    let depth = session.depth();
    let command = session.command.clone();
    session.push_frame(Frame {
      name: script.name.to_string(),
      specified: script.specified.to_string(),
      file: script.file.to_path_buf(),
      mode: script.mode,
      command,
      modpath: script.modpath.map(Path::to_path_buf),
      whatis: Vec::new(),
    });
    depth
  };
  debug!(module = script.name, mode = %script.mode, depth, "evaluating");

  let result = run(ctx.lua, depth, &body, &script);
  let whatis = ctx.session.borrow_mut().pop_frame().map(|f| f.whatis).unwrap_or_default();
  debug!(module = script.name, ok = result.is_ok(), "evaluated");

  match result {
    Ok(mut outcome) => {
      outcome.whatis = whatis;
      Ok(outcome)
    }
    Err(error) => settle(ctx, &script, error, whatis),
  }
}

fn run(lua: &Lua, depth: usize, body: &str, script: &Script<'_>) -> LuaResult<EvalOutcome> {
  let env = context::acquire(lua, depth)?;
  lua
    .load(body)
    .set_name(format!("@{}", script.file.display()))
    .set_environment(env.clone())
    .exec()?;

  let mut outcome = EvalOutcome::default();
  match script.mode {
    Mode::Scan => {
      outcome.modules_version = env.raw_get::<Option<String>>("ModulesVersion")?;
    }
    Mode::Help => {
      if let Some(callback) = env.raw_get::<Option<LuaFunction>>("ModulesHelp")? {
        outcome.callback_found = true;
        callback.call::<()>(())?;
      }
    }
    Mode::Test => {
      if let Some(callback) = env.raw_get::<Option<LuaFunction>>("ModulesTest")? {
        outcome.callback_found = true;
        let result: LuaValue = callback.call(())?;
        outcome.test_passed = Some(!matches!(result, LuaValue::Nil | LuaValue::Boolean(false)));
      }
    }
    _ => {}
  }
  Ok(outcome)
}

fn settle(ctx: Ctx<'_>, script: &Script<'_>, error: LuaError, whatis: Vec<String>) -> Result<EvalOutcome, ScriptError> {
  match ScriptSignal::find(&error) {
    Some(ScriptSignal::Stop) => Ok(EvalOutcome {
      whatis,
      ..EvalOutcome::default()
    }),
    Some(ScriptSignal::Exit(code)) => {
      ctx.session.borrow_mut().inhibit();
      if *code == 0 {
        Ok(EvalOutcome {
          whatis,
          ..EvalOutcome::default()
        })
      } else {
        Err(ScriptError::Failed {
          name: script.name.to_string(),
          code: *code,
        })
      }
    }
    Some(ScriptSignal::Rejected(reason)) => Err(ScriptError::Rejected {
      name: script.name.to_string(),
      reason: reason.clone(),
    }),
    None => {
      if let Some(fatal) = find_fatal(&error) {
        return Err(ScriptError::Fatal(fatal.clone()));
      }
      warn!(file = %script.file.display(), "modulefile raised an error");
      Err(ScriptError::Internal {
        file: script.file.to_path_buf(),
        message: error.to_string(),
      })
    }
  }
}
