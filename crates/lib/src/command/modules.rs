//! Commands changing what is loaded or searched.
//!
//! Every module evaluation runs between `push` and `pop` on the settings
//! stack. A failing module is rolled back with `restore` and the batch goes on
//! with the next one; the batch status records whether anything failed.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Outcome, PathCommand, PathEdit};
use crate::consts::{LIST_DELIM, MODULEPATH};
use crate::engine::{Ctx, EngineError};
use crate::ident::{is_path_like, root_of};
use crate::loaded::LoadedModule;
use crate::locate::{self, LocateError};
use crate::pathlist::{Position, RemoveTarget, parse_indices};
use crate::resolve::Resolution;
use crate::sandbox::{self, Mode, Script, ScriptError};

pub fn load(ctx: Ctx<'_>, specs: &[String]) -> Result<Outcome, EngineError> {
  let mut ok = true;
  for spec in specs {
    ok &= load_module(ctx, spec)?;
  }
  Ok(Outcome::Status(ok))
}

pub fn unload(ctx: Ctx<'_>, specs: &[String]) -> Result<Outcome, EngineError> {
  let mut ok = true;
  for spec in specs {
    ok &= unload_module(ctx, spec)?;
  }
  Ok(Outcome::Status(ok))
}

/// Resolve and load one module, registering it on success.
pub(super) fn load_module(ctx: Ctx<'_>, spec: &str) -> Result<bool, EngineError> {
  let resolution = match located(ctx, spec)? {
    Some(resolution) => resolution,
    None => return Ok(false),
  };

  if ctx.session.borrow().loaded().get(&resolution.name).is_some() {
    debug!(module = %resolution.name, "already loaded");
    return Ok(true);
  }

  let modpath = modpath_of(ctx, &resolution.file);
  ctx.session.borrow_mut().push();
  let script = Script::new(&resolution.name, &resolution.file, Mode::Load)
    .specified(spec)
    .modpath(modpath.as_deref());
  let result = sandbox::evaluate(ctx, script);

  let mut session = ctx.session.borrow_mut();
  match result {
    Ok(outcome) if outcome.skipped => {
      session.pop();
      Ok(true)
    }
    Ok(_) => {
      let mut loaded = session.loaded();
      loaded.push(LoadedModule {
        name: resolution.name.clone(),
        file: resolution.file.clone(),
        alt_names: resolution.chain.iter().filter(|n| **n != resolution.name).cloned().collect(),
      });
      session.store_loaded(&loaded);
      session.pop();
      info!(module = %resolution.name, "loaded");
      Ok(true)
    }
    Err(err) => {
      session.restore();
      session.pop();
      drop(session);
      script_failed(ctx, err)?;
      Ok(false)
    }
  }
}

/// The most recent loaded module answering to `spec`, or backed by the script file it names.
fn loaded_for(ctx: Ctx<'_>, spec: &str) -> Option<LoadedModule> {
  let session = ctx.session.borrow();
  let loaded = session.loaded();
  if let Some(module) = loaded.find(spec) {
    return Some(module.clone());
  }
  if !is_path_like(spec) {
    return None;
  }
  let file = session.absolute(spec);
  loaded.by_file(&file).last().map(|module| (*module).clone())
}

/// Unload the most recent module answering to `spec`.
pub(super) fn unload_module(ctx: Ctx<'_>, spec: &str) -> Result<bool, EngineError> {
  let Some(module) = loaded_for(ctx, spec) else {
    debug!(module = spec, "not loaded, nothing to unload");
    return Ok(true);
  };

  let modpath = modpath_of(ctx, &module.file);
  ctx.session.borrow_mut().push();
  let script = Script::new(&module.name, &module.file, Mode::Unload)
    .specified(spec)
    .modpath(modpath.as_deref());
  let result = sandbox::evaluate(ctx, script);

  let mut session = ctx.session.borrow_mut();
  match result {
    Ok(_) => {
      let mut loaded = session.loaded();
      loaded.remove(&module.name);
      session.store_loaded(&loaded);
      session.pop();
      info!(module = %module.name, "unloaded");
      Ok(true)
    }
    Err(err) => {
      session.restore();
      session.pop();
      drop(session);
      script_failed(ctx, err)?;
      Ok(false)
    }
  }
}

/// Locate `spec`, reporting recoverable failures. Fatal ones propagate.
fn located(ctx: Ctx<'_>, spec: &str) -> Result<Option<Resolution>, EngineError> {
  match locate::resolve(ctx, spec) {
    Ok(resolution) => Ok(Some(resolution)),
    Err(err) if err.is_fatal() => Err(err.into()),
    Err(err) => {
      report_locate_error(ctx, &err);
      Ok(None)
    }
  }
}

pub(super) fn report_locate_error(ctx: Ctx<'_>, err: &LocateError) {
  ctx.session.borrow_mut().report.error(err.to_string());
}

/// Report a failed evaluation. A fatal search failure raised inside the script aborts instead.
pub(super) fn script_failed(ctx: Ctx<'_>, err: ScriptError) -> Result<(), EngineError> {
  let mut session = ctx.session.borrow_mut();
  match err {
    ScriptError::Fatal(err) => return Err(err.into()),
    ScriptError::Rejected { .. } => session.report.warning(err.to_string()),
    _ => session.report.error(err.to_string()),
  }
  Ok(())
}

/// The active modulepath holding `file`.
fn modpath_of(ctx: Ctx<'_>, file: &Path) -> Option<PathBuf> {
  ctx.session.borrow().modulepaths().into_iter().find(|mp| file.starts_with(mp))
}

/// Unload and load again every module, keeping the names each one answered to.
pub fn reload(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  let modules: Vec<LoadedModule> = ctx.session.borrow().loaded().iter().cloned().collect();
  let mut ok = true;
  for module in modules.iter().rev() {
    ok &= unload_module(ctx, &module.name)?;
  }
  if !ok {
    return Ok(Outcome::Status(false));
  }
  for module in &modules {
    if !load_module(ctx, &module.name)? {
      ok = false;
      continue;
    }
    let mut session = ctx.session.borrow_mut();
    let mut loaded = session.loaded();
    if loaded.add_alt_names(&module.name, &module.alt_names) {
      session.store_loaded(&loaded);
    }
  }
  Ok(Outcome::Status(ok))
}

pub fn purge(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  let names = ctx.session.borrow().loaded().names();
  let mut ok = true;
  for name in names.iter().rev() {
    ok &= unload_module(ctx, name)?;
  }
  Ok(Outcome::Status(ok))
}

/// Unload `old` (by default the module sharing the root of `new`), then load `new`.
pub fn switch(ctx: Ctx<'_>, old: Option<&str>, new: &str) -> Result<Outcome, EngineError> {
  let old = old.unwrap_or_else(|| root_of(new));
  if !unload_module(ctx, old)? {
    ctx
      .session
      .borrow_mut()
      .report
      .error(format!("Switching from '{old}' to '{new}' failed: '{old}' could not be unloaded"));
    return Ok(Outcome::Status(false));
  }
  Ok(Outcome::Status(load_module(ctx, new)?))
}

pub fn use_paths(ctx: Ctx<'_>, paths: &[String], position: Position) -> Result<Outcome, EngineError> {
  let mut session = ctx.session.borrow_mut();
  let mut ok = true;
  let mut dirs = Vec::new();
  for path in paths {
    let dir = session.directory(path);
    if dir.is_dir() {
      dirs.push(dir.to_string_lossy().into_owned());
    } else {
      session.report.error(format!("Directory '{}' not found", dir.display()));
      ok = false;
    }
  }
  if !dirs.is_empty() {
    if let Err(err) = session.add_path(MODULEPATH, position, &dirs, LIST_DELIM, false) {
      session.report.error(err.to_string());
      ok = false;
    }
  }
  Ok(Outcome::Status(ok))
}

pub fn unuse_paths(ctx: Ctx<'_>, paths: &[String], force: bool) -> Result<Outcome, EngineError> {
  let mut session = ctx.session.borrow_mut();
  let dirs: Vec<String> = paths
    .iter()
    .map(|p| session.directory(p).to_string_lossy().into_owned())
    .collect();
  if let Err(err) = session.remove_path(MODULEPATH, &RemoveTarget::Values(dirs), LIST_DELIM, force) {
    session.report.error(err.to_string());
    return Ok(Outcome::Status(false));
  }
  Ok(Outcome::Status(true))
}

/// Evaluate scripts in load mode without registering them. The marker is optional.
pub fn source(ctx: Ctx<'_>, files: &[String]) -> Result<Outcome, EngineError> {
  let mut ok = true;
  for file in files {
    let path = ctx.session.borrow().absolute(file);
    if !path.is_file() {
      ctx
        .session
        .borrow_mut()
        .report
        .error(format!("File '{}' does not exist", path.display()));
      ok = false;
      continue;
    }

    let name = path.to_string_lossy().into_owned();
    ctx.session.borrow_mut().push();
    let result = sandbox::evaluate(ctx, Script::new(&name, &path, Mode::Load).relaxed());
    let mut session = ctx.session.borrow_mut();
    match result {
      Ok(_) => session.pop(),
      Err(err) => {
        session.restore();
        session.pop();
        drop(session);
        script_failed(ctx, err)?;
        ok = false;
      }
    }
  }
  Ok(Outcome::Status(ok))
}

pub fn edit_path(ctx: Ctx<'_>, command: &PathCommand) -> Result<Outcome, EngineError> {
  let mut session = ctx.session.borrow_mut();
  let result = match command.edit {
    PathEdit::Prepend | PathEdit::Append => {
      let position = if command.edit == PathEdit::Prepend {
        Position::Prepend
      } else {
        Position::Append
      };
      session.add_path(
        &command.variable,
        position,
        &command.values,
        &command.delimiter,
        command.duplicates,
      )
    }
    PathEdit::Remove => {
      let target = if command.index {
        parse_indices(&command.values).map(RemoveTarget::Indices)
      } else {
        Ok(RemoveTarget::Values(command.values.clone()))
      };
      target.and_then(|target| session.remove_path(&command.variable, &target, &command.delimiter, command.force))
    }
  };
  match result {
    Ok(()) => Ok(Outcome::Status(true)),
    Err(err) => {
      session.report.error(err.to_string());
      Ok(Outcome::Status(false))
    }
  }
}
