//! Commands reporting on modules: display, avail, list, whatis, help, test.
//!
//! Everything here writes to the diagnostics report; none of it changes the
//! environment.

use std::time::SystemTime;

use serde::Serialize;

use super::Outcome;
use super::modules::{report_locate_error, script_failed};
use crate::config::DisplayOptions;
use crate::engine::{Ctx, EngineError};
use crate::locate::{self, Filter, Listing, LocateError, ModuleEntry};
use crate::resolve::{EntryKind, Resolution};
use crate::sandbox::{self, Mode, Script};

const SEPARATOR: &str = "-------------------------------------------------------------------";

/// Width listings are laid out in.
const COLUMNS: usize = 80;

fn info(ctx: Ctx<'_>, text: impl Into<String>) {
  ctx.session.borrow_mut().report.info(text);
}

fn display_options(ctx: Ctx<'_>) -> DisplayOptions {
  ctx.session.borrow().display
}

fn json(value: &impl Serialize) -> Result<String, EngineError> {
  Ok(serde_json::to_string_pretty(value)?)
}

/// Resolve `spec` for a report command; failures are reported, fatal ones raised.
fn resolve(ctx: Ctx<'_>, spec: &str) -> Result<Option<Resolution>, EngineError> {
  match locate::resolve(ctx, spec) {
    Ok(resolution) => Ok(Some(resolution)),
    Err(err) if err.is_fatal() => Err(err.into()),
    Err(err) => {
      report_locate_error(ctx, &err);
      Ok(None)
    }
  }
}

/// Lay `items` out in columns, row by row.
fn columns(items: &[String], indent: usize) -> Vec<String> {
  if items.is_empty() {
    return Vec::new();
  }
  let width = items.iter().map(|i| i.chars().count()).max().unwrap_or(0) + 2;
  let per_row = ((COLUMNS.saturating_sub(indent)) / width).max(1);
  items
    .chunks(per_row)
    .map(|row| {
      let cells: Vec<String> = row.iter().map(|cell| format!("{cell:<width$}")).collect();
      format!("{}{}", " ".repeat(indent), cells.concat().trim_end())
    })
    .collect()
}

fn header(title: &str) -> String {
  let pad = COLUMNS.saturating_sub(title.len() + 2);
  let left = pad / 2;
  format!("{} {} {}", "-".repeat(left), title, "-".repeat(pad - left))
}

pub fn display(ctx: Ctx<'_>, specs: &[String]) -> Result<Outcome, EngineError> {
  let mut ok = true;
  for spec in specs {
    let Some(resolution) = resolve(ctx, spec)? else {
      ok = false;
      continue;
    };
    info(ctx, SEPARATOR);
    info(ctx, format!("{}:", resolution.file.display()));
    info(ctx, "");
    let script = Script::new(&resolution.name, &resolution.file, Mode::Display).specified(spec);
    let result = sandbox::evaluate(ctx, script);
    info(ctx, SEPARATOR);
    if let Err(err) = result {
      script_failed(ctx, err)?;
      ok = false;
    }
  }
  Ok(Outcome::Status(ok))
}

/// Display name of an entry with its symbolic versions, `None` for entries not shown.
fn entry_label(ctx: Ctx<'_>, entry: &ModuleEntry, terse: bool) -> Option<String> {
  match entry {
    ModuleEntry::Directory { name } => terse.then(|| format!("{name}/")),
    ModuleEntry::Alias { name, target } => Some(if terse {
      name.clone()
    } else {
      format!("{name} -> {target}")
    }),
    ModuleEntry::Version { .. } => None,
    ModuleEntry::Modulefile { name, .. } | ModuleEntry::Virtual { name, .. } => {
      let symbols = ctx.session.borrow().graph.symbols_for(name);
      if terse || symbols.is_empty() {
        Some(name.clone())
      } else {
        Some(format!("{name}({})", symbols.join(":")))
      }
    }
    ModuleEntry::Invalid { .. } | ModuleEntry::AccessError { .. } => None,
  }
}

fn modified(time: Option<SystemTime>) -> String {
  time
    .map(|t| humantime::format_rfc3339_seconds(t).to_string())
    .unwrap_or_default()
}

pub fn avail(ctx: Ctx<'_>, patterns: &[String]) -> Result<Outcome, EngineError> {
  let display = display_options(ctx);
  let listings = locate::available(
    ctx,
    Filter {
      patterns,
      default_only: display.default_only,
      latest_only: display.latest_only,
    },
  )?;
  let found = listings.iter().any(|l| l.entries.iter().any(ModuleEntry::is_module));

  if display.json {
    info(ctx, json(&listings)?);
    return Ok(Outcome::Status(found || patterns.is_empty()));
  }

  for Listing { modpath, entries } in &listings {
    if entries.is_empty() {
      continue;
    }
    let title = format!("{}", modpath.display());
    if display.terse {
      info(ctx, format!("{title}:"));
      for entry in entries {
        if let Some(label) = entry_label(ctx, entry, true) {
          info(ctx, label);
        }
      }
    } else if display.long {
      info(ctx, header(&title));
      info(ctx, format!("{:<39} {:<19} {}", "Package/Alias", "Versions", "Last mod."));
      for entry in entries {
        let Some(label) = entry_label(ctx, entry, true) else {
          continue;
        };
        let (symbols, time) = match entry {
          ModuleEntry::Modulefile { name, modified: time, .. } => {
            (ctx.session.borrow().graph.symbols_for(name).join(":"), modified(*time))
          }
          _ => (String::new(), String::new()),
        };
        info(ctx, format!("{label:<39} {symbols:<19} {time}").trim_end().to_string());
      }
    } else {
      info(ctx, header(&title));
      let labels: Vec<String> = entries.iter().filter_map(|e| entry_label(ctx, e, false)).collect();
      for line in columns(&labels, 0) {
        info(ctx, line);
      }
    }
    info(ctx, "");
  }
  Ok(Outcome::Status(found || patterns.is_empty()))
}

pub fn aliases(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  locate::available(ctx, Filter::default())?;
  let (aliases, versions) = {
    let session = ctx.session.borrow();
    let mut aliases = Vec::new();
    let mut versions = Vec::new();
    for (name, entry) in session.graph.entries() {
      let line = format!("{name} -> {}", entry.target.canonical());
      match entry.kind {
        EntryKind::Alias => aliases.push(line),
        EntryKind::Version | EntryKind::Default => versions.push(line),
      }
    }
    (aliases, versions)
  };

  if !aliases.is_empty() {
    info(ctx, header("Aliases"));
    for line in columns(&aliases, 0) {
      info(ctx, line);
    }
    info(ctx, "");
  }
  if !versions.is_empty() {
    info(ctx, header("Versions"));
    for line in columns(&versions, 0) {
      info(ctx, line);
    }
    info(ctx, "");
  }
  Ok(Outcome::Status(true))
}

pub fn list(ctx: Ctx<'_>) -> Result<Outcome, EngineError> {
  let display = display_options(ctx);
  let loaded = ctx.session.borrow().loaded();

  if display.json {
    info(ctx, json(&loaded)?);
    return Ok(Outcome::Status(true));
  }
  if loaded.is_empty() {
    info(ctx, "No Modulefiles Currently Loaded.");
    return Ok(Outcome::Status(true));
  }

  info(ctx, "Currently Loaded Modulefiles:");
  if display.terse {
    for module in loaded.iter() {
      info(ctx, module.name.clone());
    }
  } else if display.long {
    for module in loaded.iter() {
      info(ctx, format!("{:<39} {}", module.name, module.file.display()));
    }
  } else {
    let numbered: Vec<String> = loaded
      .iter()
      .enumerate()
      .map(|(i, m)| format!("{:>2}) {}", i + 1, m.name))
      .collect();
    for line in columns(&numbered, 1) {
      info(ctx, line);
    }
  }
  Ok(Outcome::Status(true))
}

/// `(name, whatis lines)` of every module matching `patterns`.
fn collect_whatis(ctx: Ctx<'_>, patterns: &[String]) -> Result<Vec<(String, Vec<String>)>, EngineError> {
  let modules = match locate::all_modules(ctx, patterns) {
    Ok(modules) => modules,
    Err(err) if err.is_fatal() => return Err(err.into()),
    Err(err) => {
      report_locate_error(ctx, &err);
      return Ok(Vec::new());
    }
  };
  let mut out = Vec::new();
  for (name, file) in modules {
    match sandbox::evaluate(ctx, Script::new(&name, &file, Mode::Whatis)) {
      Ok(outcome) => out.push((name, outcome.whatis)),
      Err(err) => script_failed(ctx, err)?,
    }
  }
  Ok(out)
}

fn whatis_line(name: &str, text: &str) -> String {
  format!("{name:>20}: {text}")
}

pub fn whatis(ctx: Ctx<'_>, patterns: &[String]) -> Result<Outcome, EngineError> {
  let entries = collect_whatis(ctx, patterns)?;
  if entries.is_empty() && !patterns.is_empty() {
    report_locate_error(ctx, &LocateError::NotFound(patterns.join(" ")));
    return Ok(Outcome::Status(false));
  }
  for (name, lines) in entries {
    for line in lines {
      info(ctx, whatis_line(&name, &line));
    }
  }
  Ok(Outcome::Status(true))
}

pub fn search(ctx: Ctx<'_>, keyword: &str) -> Result<Outcome, EngineError> {
  let needle = keyword.to_lowercase();
  let mut found = false;
  for (name, lines) in collect_whatis(ctx, &[])? {
    for line in lines {
      if line.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle) {
        info(ctx, whatis_line(&name, &line));
        found = true;
      }
    }
  }
  Ok(Outcome::Status(found))
}

const USAGE: &str = "Usage: module [options] [command] [args ...]

Loading / Unloading commands:
  add | load      modulefile [...]  Load modulefile(s)
  rm | unload     modulefile [...]  Remove modulefile(s)
  purge                             Unload all loaded modulefiles
  reload | refresh                  Unload then load all loaded modulefiles
  switch | swap   [mod1] mod2       Unload mod1 and load mod2

Listing / Searching commands:
  list            [-t|-l|-j]        List loaded modules
  avail   [-d|-L] [-t|-l|-j] [mod ...] List all or matching available modules
  aliases                           List all module aliases
  whatis          [modulefile ...]  Print whatis information of modulefile(s)
  apropos | keyword | search  str   Search all name and whatis containing str
  is-loaded       [modulefile ...]  Test if all modulefile(s) are loaded
  is-avail        modulefile [...]  Test if all modulefile(s) are available
  is-saved        [collection ...]  Test if all collection(s) exist
  is-used         [directory ...]   Test if all directory(ies) are in MODULEPATH
  info-loaded     modulefile        Get full name of matching loaded module(s)

Collection of modules handling commands:
  save            [collection|file] Save current module list to collection
  restore         [collection|file] Restore module list from collection or file
  saverm          [collection]      Remove saved collection
  saveshow        [collection|file] Display information about collection
  savelist        [-t|-l|-j]        List all saved collections

Shell's initialization files handling commands:
  initlist                          List all modules loaded from init file
  initadd         modulefile [...]  Add modulefile to shell init file
  initrm          modulefile [...]  Remove modulefile from shell init file
  initprepend     modulefile [...]  Add to beginning of list in init file
  initswitch      mod1 mod2         Switch mod1 with mod2 from init file
  initclear                         Clear all modulefiles from init file

Environment direct handling commands:
  prepend-path [-d c] [--duplicates] var val [...] Prepend value to environment variable
  append-path  [-d c] [--duplicates] var val [...] Append value to environment variable
  remove-path  [-d c] [--index] [--force] var val [...] Remove value from environment variable

Other commands:
  help            [modulefile ...]  Print this or modulefile(s) help info
  display | show  modulefile [...]  Display information about modulefile(s)
  test            [modulefile ...]  Test modulefile(s)
  use     [-a|-p] dir [...]         Add dir(s) to MODULEPATH variable
  unuse           dir [...]         Remove dir(s) from MODULEPATH variable
  source          scriptfile [...]  Execute scriptfile(s)
  path            modulefile        Print modulefile path
  paths           modulefile        Print path of matching available modules
  autoinit                          Define the module command and initial state";

pub fn help(ctx: Ctx<'_>, specs: &[String]) -> Result<Outcome, EngineError> {
  if specs.is_empty() {
    info(ctx, USAGE);
    return Ok(Outcome::Status(true));
  }
  let mut ok = true;
  for spec in specs {
    let Some(resolution) = resolve(ctx, spec)? else {
      ok = false;
      continue;
    };
    info(ctx, SEPARATOR);
    info(ctx, format!("Module Specific Help for {}:", resolution.file.display()));
    info(ctx, "");
    match sandbox::evaluate(ctx, Script::new(&resolution.name, &resolution.file, Mode::Help).specified(spec)) {
      Ok(outcome) if !outcome.callback_found => {
        ctx
          .session
          .borrow_mut()
          .report
          .warning(format!("Unable to find ModulesHelp in {}.", resolution.file.display()));
      }
      Ok(_) => {}
      Err(err) => {
        script_failed(ctx, err)?;
        ok = false;
      }
    }
    info(ctx, SEPARATOR);
  }
  Ok(Outcome::Status(ok))
}

pub fn test(ctx: Ctx<'_>, specs: &[String]) -> Result<Outcome, EngineError> {
  let mut ok = true;
  for spec in specs {
    let Some(resolution) = resolve(ctx, spec)? else {
      ok = false;
      continue;
    };
    info(ctx, SEPARATOR);
    info(ctx, format!("Module Specific Test for {}:", resolution.file.display()));
    info(ctx, "");
    match sandbox::evaluate(ctx, Script::new(&resolution.name, &resolution.file, Mode::Test).specified(spec)) {
      Ok(outcome) => match outcome.test_passed {
        Some(passed) => {
          info(ctx, format!("Test result: {}", if passed { "PASS" } else { "FAIL" }));
          ok &= passed;
        }
        None => {
          ctx
            .session
            .borrow_mut()
            .report
            .warning(format!("Unable to find ModulesTest in {}.", resolution.file.display()));
        }
      },
      Err(err) => {
        script_failed(ctx, err)?;
        ok = false;
      }
    }
    info(ctx, SEPARATOR);
  }
  Ok(Outcome::Status(ok))
}
