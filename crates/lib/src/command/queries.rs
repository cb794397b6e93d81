//! State queries answering with a status or a text value.

use super::Outcome;
use super::modules::report_locate_error;
use crate::collection::CollectionStore;
use crate::engine::{Ctx, EngineError};
use crate::locate;

pub fn is_loaded(ctx: Ctx<'_>, names: &[String]) -> Result<Outcome, EngineError> {
  let loaded = ctx.session.borrow().loaded();
  if names.is_empty() {
    return Ok(Outcome::Status(!loaded.is_empty()));
  }
  Ok(Outcome::Status(names.iter().all(|name| loaded.is_loaded(name))))
}

pub fn is_saved(ctx: Ctx<'_>, names: &[String]) -> Result<Outcome, EngineError> {
  let store = CollectionStore::from_config(&ctx.session.borrow().config);
  if names.is_empty() {
    return Ok(Outcome::Status(!store.list()?.is_empty()));
  }
  Ok(Outcome::Status(names.iter().all(|name| store.exists(name))))
}

pub fn is_used(ctx: Ctx<'_>, dirs: &[String]) -> Result<Outcome, EngineError> {
  let session = ctx.session.borrow();
  let used = session.modulepaths();
  if dirs.is_empty() {
    return Ok(Outcome::Status(!used.is_empty()));
  }
  Ok(Outcome::Status(dirs.iter().all(|dir| used.contains(&session.directory(dir)))))
}

pub fn is_avail(ctx: Ctx<'_>, names: &[String]) -> Result<Outcome, EngineError> {
  let mut all = true;
  for name in names {
    match locate::resolve(ctx, name) {
      Ok(_) => {}
      Err(err) if err.is_fatal() => return Err(err.into()),
      Err(_) => all = false,
    }
  }
  Ok(Outcome::Status(all))
}

/// Canonical names of the loaded modules answering to `name`.
pub fn info_loaded(ctx: Ctx<'_>, name: &str) -> Result<Outcome, EngineError> {
  let loaded = ctx.session.borrow().loaded();
  let names: Vec<&str> = loaded.matching(name).into_iter().map(|m| m.name.as_str()).collect();
  Ok(Outcome::Text(names.join(" ")))
}

/// Script file `name` resolves to.
pub fn path(ctx: Ctx<'_>, name: &str) -> Result<Outcome, EngineError> {
  match locate::resolve(ctx, name) {
    Ok(resolution) => Ok(Outcome::Text(resolution.file.to_string_lossy().into_owned())),
    Err(err) if err.is_fatal() => Err(err.into()),
    Err(err) => {
      report_locate_error(ctx, &err);
      Ok(Outcome::Status(false))
    }
  }
}

/// Script files of every available module matching `patterns`.
pub fn paths(ctx: Ctx<'_>, patterns: &[String]) -> Result<Outcome, EngineError> {
  let modules = locate::all_modules(ctx, patterns)?;
  let files: Vec<String> = modules
    .into_iter()
    .map(|(_, file)| file.to_string_lossy().into_owned())
    .collect();
  Ok(Outcome::Text(files.join("\n")))
}
