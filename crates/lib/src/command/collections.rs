use tracing::debug;

use super::Outcome;
use super::modules::{load_module, unload_module};
use crate::collection::{Collection, CollectionStore, DEFAULT_COLLECTION, RestorePlan};
use crate::consts::{LIST_DELIM, MODULEPATH};
use crate::engine::{Ctx, EngineError};
use crate::pathlist::{Position, RemoveTarget};

fn store(ctx: Ctx<'_>) -> CollectionStore {
  CollectionStore::from_config(&ctx.session.borrow().config)
}

/// Current search paths and loaded modules.
fn current(ctx: Ctx<'_>) -> (Vec<String>, Vec<String>) {
  let session = ctx.session.borrow();
  let paths = session
    .modulepaths()
    .iter()
    .map(|p| p.to_string_lossy().into_owned())
    .collect();
  (paths, session.loaded().names())
}

pub fn save(ctx: Ctx<'_>, name: Option<&str>) -> Result<Outcome, EngineError> {
  let name = name.unwrap_or(DEFAULT_COLLECTION);
  let (paths, modules) = current(ctx);
  if paths.is_empty() && modules.is_empty() {
    ctx.session.borrow_mut().report.error("Nothing to save in a collection");
    return Ok(Outcome::Status(false));
  }
  store(ctx).save(name, &Collection { paths, modules })?;
  Ok(Outcome::Status(true))
}

/// Apply the minimal edit towards a saved collection.
///
/// The state is sampled again after the unload phase, which may itself have
/// changed the search path or pulled out dependent modules.
pub fn restore(ctx: Ctx<'_>, name: Option<&str>) -> Result<Outcome, EngineError> {
  let name = name.unwrap_or(DEFAULT_COLLECTION);
  let target = store(ctx).load(name)?;
  Ok(Outcome::Status(apply(ctx, &target)?))
}

/// Bring the session to `target`; shared with `autoinit`.
pub(super) fn apply(ctx: Ctx<'_>, target: &Collection) -> Result<bool, EngineError> {
  let (paths, modules) = current(ctx);
  let plan = RestorePlan::compute(&paths, &modules, target);
  if plan.is_empty() {
    debug!("collection already in effect");
    return Ok(true);
  }

  let mut ok = true;
  for module in &plan.unload {
    ok &= unload_module(ctx, module)?;
  }
  if !plan.unuse.is_empty() {
    let mut session = ctx.session.borrow_mut();
    if let Err(err) = session.remove_path(MODULEPATH, &RemoveTarget::Values(plan.unuse.clone()), LIST_DELIM, true) {
      session.report.error(err.to_string());
      ok = false;
    }
  }

  let (paths, modules) = current(ctx);
  let plan = RestorePlan::compute(&paths, &modules, target);
  if !plan.use_paths.is_empty() {
    let mut session = ctx.session.borrow_mut();
    if let Err(err) = session.add_path(MODULEPATH, Position::Append, &plan.use_paths, LIST_DELIM, false) {
      session.report.error(err.to_string());
      ok = false;
    }
  }
  for module in &plan.load {
    ok &= load_module(ctx, module)?;
  }
  Ok(ok)
}

pub fn saverm(ctx: Ctx<'_>, name: Option<&str>) -> Result<Outcome, EngineError> {
  store(ctx).remove(name.unwrap_or(DEFAULT_COLLECTION))?;
  Ok(Outcome::Status(true))
}

pub fn saveshow(ctx: Ctx<'_>, name: Option<&str>) -> Result<Outcome, EngineError> {
  let name = name.unwrap_or(DEFAULT_COLLECTION);
  let store = store(ctx);
  let text = store.show(name)?;
  let mut session = ctx.session.borrow_mut();
  session.report.info("-------------------------------------------------------------------");
  session.report.info(format!("{}:", store.path_for(name).display()));
  session.report.info("");
  session.report.info(text.trim_end().to_string());
  session.report.info("-------------------------------------------------------------------");
  Ok(Outcome::Status(true))
}

pub fn savelist(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  let store = store(ctx);
  let names = store.list()?;
  let display = ctx.session.borrow().display;
  let mut session = ctx.session.borrow_mut();

  if display.json {
    session.report.info(serde_json::to_string_pretty(&names)?);
    return Ok(Outcome::Status(true));
  }
  if display.terse {
    for name in names {
      session.report.info(name);
    }
    return Ok(Outcome::Status(true));
  }
  if names.is_empty() {
    session.report.info("No named collection.");
    return Ok(Outcome::Status(true));
  }

  let title = match store.target() {
    Some(target) => format!("Named collection list (target: {target}):"),
    None => "Named collection list:".to_string(),
  };
  session.report.info(title);
  for (index, name) in names.iter().enumerate() {
    session.report.info(format!("{:>3}) {name}", index + 1));
  }
  Ok(Outcome::Status(true))
}
