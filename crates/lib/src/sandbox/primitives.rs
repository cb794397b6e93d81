//! The primitive vocabulary bound into every evaluation context.
//!
//! Every primitive looks at the mode of the innermost frame: load and unload
//! mutate the session (unload reversing the edit), display prints a canonical
//! rendering of the call, the remaining modes ignore mutations.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use mlua::prelude::*;
use mlua::Variadic;
use tracing::debug;

use super::types::{Mode, ScriptSignal};
use crate::collection::CollectionStore;
use crate::command::{self, Command};
use crate::engine::{Ctx, SharedSession};
use crate::ident::parent_of;
use crate::locate;
use crate::pathlist::{Position, RemoveTarget, parse_indices};
use crate::session::EnvMap;

/// Build the table of primitives capturing `session`.
pub fn create(lua: &Lua, session: &SharedSession) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;

  register(lua, &table, session, "setenv", setenv)?;
  register(lua, &table, session, "unsetenv", unsetenv)?;
  register(lua, &table, session, "getenv", getenv)?;
  register(lua, &table, session, "prepend_path", |ctx, args| {
    add_path(ctx, "prepend_path", Position::Prepend, args)
  })?;
  register(lua, &table, session, "append_path", |ctx, args| {
    add_path(ctx, "append_path", Position::Append, args)
  })?;
  register(lua, &table, session, "remove_path", remove_path)?;
  register(lua, &table, session, "set_alias", set_alias)?;
  register(lua, &table, session, "unset_alias", unset_alias)?;
  register(lua, &table, session, "x_resource", x_resource)?;
  register(lua, &table, session, "chdir", chdir)?;
  register(lua, &table, session, "conflict", conflict)?;
  register(lua, &table, session, "prereq", prereq)?;
  register(lua, &table, session, "module", module)?;
  register(lua, &table, session, "system", system)?;
  register(lua, &table, session, "capture", capture)?;
  register(lua, &table, session, "is_loaded", is_loaded)?;
  register(lua, &table, session, "is_used", is_used)?;
  register(lua, &table, session, "is_saved", is_saved)?;
  register(lua, &table, session, "is_avail", is_avail)?;
  register(lua, &table, session, "module_info", module_info)?;
  register(lua, &table, session, "module_alias", module_alias)?;
  register(lua, &table, session, "module_version", module_version)?;
  register(lua, &table, session, "module_virtual", module_virtual)?;
  register(lua, &table, session, "whatis", whatis)?;
  register(lua, &table, session, "puts", puts)?;
  register(lua, &table, session, "stop", |_, ()| ScriptSignal::Stop.raise::<()>())?;
  register(lua, &table, session, "exit", |_, code: Option<i32>| {
    ScriptSignal::Exit(code.unwrap_or(0)).raise::<()>()
  })?;

  Ok(table)
}

fn register<A, R, F>(lua: &Lua, table: &LuaTable, session: &SharedSession, name: &str, f: F) -> LuaResult<()>
where
  A: FromLuaMulti,
  R: IntoLuaMulti,
  F: Fn(Ctx<'_>, A) -> LuaResult<R> + 'static,
{
  let session = session.clone();
  let function = lua.create_function(move |lua, args: A| f(Ctx { lua, session: &session }, args))?;
  table.set(name, function)
}

fn mode(ctx: Ctx<'_>) -> Mode {
  ctx.session.borrow().mode()
}

/// Print the canonical rendering of a call (display mode).
fn show(ctx: Ctx<'_>, name: &str, args: &[String]) {
  ctx.session.borrow_mut().report.info(format!("{:<16}{}", name, args.join(" ")));
}

fn setenv(ctx: Ctx<'_>, (var, value): (String, String)) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => ctx.session.borrow_mut().setenv(&var, &value),
    Mode::Unload => ctx.session.borrow_mut().unsetenv(&var),
    Mode::Display => show(ctx, "setenv", &[var, value]),
    _ => {}
  }
  Ok(())
}

fn unsetenv(ctx: Ctx<'_>, (var, value): (String, Option<String>)) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => ctx.session.borrow_mut().unsetenv(&var),
    Mode::Unload => {
      if let Some(value) = value {
        ctx.session.borrow_mut().setenv(&var, &value);
      }
    }
    Mode::Display => {
      let mut args = vec![var];
      args.extend(value);
      show(ctx, "unsetenv", &args);
    }
    _ => {}
  }
  Ok(())
}

fn getenv(ctx: Ctx<'_>, (var, default): (String, LuaValue)) -> LuaResult<LuaValue> {
  let value = ctx.session.borrow().getenv(&var).map(str::to_string);
  match value {
    Some(value) => ctx.lua.create_string(value).map(LuaValue::String),
    None => Ok(default),
  }
}

/// Trailing options table of the path primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathOptions {
  delim: String,
  duplicates: bool,
  index: bool,
  force: bool,
}

impl Default for PathOptions {
  fn default() -> Self {
    Self {
      delim: crate::consts::LIST_DELIM.to_string(),
      duplicates: false,
      index: false,
      force: false,
    }
  }
}

impl PathOptions {
  fn from_table(table: &LuaTable) -> LuaResult<Self> {
    let defaults = Self::default();
    Ok(Self {
      delim: table.get::<Option<String>>("delim")?.unwrap_or(defaults.delim),
      duplicates: table.get::<Option<bool>>("duplicates")?.unwrap_or(false),
      index: table.get::<Option<bool>>("index")?.unwrap_or(false),
      force: table.get::<Option<bool>>("force")?.unwrap_or(false),
    })
  }
}

struct PathArgs {
  var: String,
  values: Vec<String>,
  options: PathOptions,
}

impl PathArgs {
  fn parse(ctx: Ctx<'_>, primitive: &str, args: LuaMultiValue) -> LuaResult<Self> {
    let mut args: Vec<LuaValue> = args.into_iter().collect();
    let mut options = PathOptions::default();
    if let Some(LuaValue::Table(table)) = args.last() {
      options = PathOptions::from_table(table)?;
      args.pop();
    }

    let mut strings = args.into_iter().map(|v| ctx.lua.unpack::<String>(v));
    let var = strings
      .next()
      .transpose()?
      .ok_or_else(|| LuaError::external(format!("{primitive}: missing variable name")))?;
    let values = strings.collect::<LuaResult<Vec<_>>>()?;
    if values.is_empty() {
      return Err(LuaError::external(format!("{primitive}: no value given for '{var}'")));
    }
    Ok(Self { var, values, options })
  }

  fn display_args(&self) -> Vec<String> {
    let mut out = Vec::new();
    if self.options.delim != crate::consts::LIST_DELIM {
      out.push(format!("--delim={}", self.options.delim));
    }
    if self.options.duplicates {
      out.push("--duplicates".to_string());
    }
    if self.options.index {
      out.push("--index".to_string());
    }
    if self.options.force {
      out.push("--force".to_string());
    }
    out.push(self.var.clone());
    out.extend(self.values.iter().cloned());
    out
  }
}

fn add_path(ctx: Ctx<'_>, primitive: &str, position: Position, args: LuaMultiValue) -> LuaResult<()> {
  let args = PathArgs::parse(ctx, primitive, args)?;
  let PathOptions { delim, duplicates, .. } = &args.options;
  match mode(ctx) {
    Mode::Load => ctx
      .session
      .borrow_mut()
      .add_path(&args.var, position, &args.values, delim, *duplicates)
      .map_err(LuaError::external)?,
    Mode::Unload => ctx
      .session
      .borrow_mut()
      .remove_path(&args.var, &RemoveTarget::Values(args.values.clone()), delim, false)
      .map_err(LuaError::external)?,
    Mode::Display => show(ctx, primitive, &args.display_args()),
    _ => {}
  }
  Ok(())
}

fn remove_path(ctx: Ctx<'_>, args: LuaMultiValue) -> LuaResult<()> {
  let args = PathArgs::parse(ctx, "remove_path", args)?;
  match mode(ctx) {
    Mode::Load => {
      let target = if args.options.index {
        RemoveTarget::Indices(parse_indices(&args.values).map_err(LuaError::external)?)
      } else {
        RemoveTarget::Values(args.values.clone())
      };
      ctx
        .session
        .borrow_mut()
        .remove_path(&args.var, &target, &args.options.delim, args.options.force)
        .map_err(LuaError::external)?;
    }
    Mode::Display => show(ctx, "remove_path", &args.display_args()),
    _ => {}
  }
  Ok(())
}

fn set_alias(ctx: Ctx<'_>, (name, value): (String, String)) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => ctx.session.borrow_mut().set_alias(&name, &value),
    Mode::Unload => ctx.session.borrow_mut().unset_alias(&name),
    Mode::Display => show(ctx, "set_alias", &[name, value]),
    _ => {}
  }
  Ok(())
}

fn unset_alias(ctx: Ctx<'_>, name: String) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => ctx.session.borrow_mut().unset_alias(&name),
    Mode::Display => show(ctx, "unset_alias", &[name]),
    _ => {}
  }
  Ok(())
}

fn x_resource(ctx: Ctx<'_>, lines: Variadic<String>) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => {
      let mut session = ctx.session.borrow_mut();
      for line in lines.iter() {
        session.add_x_resource(line);
      }
    }
    Mode::Display => show(ctx, "x_resource", &lines),
    _ => {}
  }
  Ok(())
}

fn chdir(ctx: Ctx<'_>, dir: String) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Load => {
      let mut session = ctx.session.borrow_mut();
      let dir = session.absolute(&dir);
      session.set_chdir(dir);
    }
    Mode::Display => show(ctx, "chdir", &[dir]),
    _ => {}
  }
  Ok(())
}

/// Name of the module being loaded, when constraints must be enforced.
///
/// A module that is already loaded never trips over its own constraints.
fn enforcing(ctx: Ctx<'_>) -> Option<String> {
  let session = ctx.session.borrow();
  let frame = session.frame()?;
  if frame.mode != Mode::Load || session.loaded().get(&frame.name).is_some() {
    return None;
  }
  Some(frame.name.clone())
}

fn conflict(ctx: Ctx<'_>, names: Variadic<String>) -> LuaResult<()> {
  if mode(ctx) == Mode::Display {
    show(ctx, "conflict", &names);
    return Ok(());
  }
  let Some(current) = enforcing(ctx) else {
    return Ok(());
  };
  let loaded = ctx.session.borrow().loaded();
  for name in names.iter() {
    let name = expand(ctx, name);
    if let Some(other) = loaded.find(&name) {
      if other.name != current {
        return ScriptSignal::Rejected(format!(
          "Module '{current}' conflicts with the currently loaded module '{}'\n  HINT: Might try \"module unload {}\" first.",
          other.name, other.name
        ))
        .raise();
      }
    }
  }
  Ok(())
}

fn prereq(ctx: Ctx<'_>, names: Variadic<String>) -> LuaResult<()> {
  if mode(ctx) == Mode::Display {
    show(ctx, "prereq", &names);
    return Ok(());
  }
  let Some(current) = enforcing(ctx) else {
    return Ok(());
  };
  if names.is_empty() {
    return Ok(());
  }
  let loaded = ctx.session.borrow().loaded();
  let names: Vec<String> = names.iter().map(|n| expand(ctx, n)).collect();
  if names.iter().any(|name| loaded.is_loaded(name)) {
    return Ok(());
  }
  ScriptSignal::Rejected(format!(
    "Module '{current}' requires one of the module(s) '{}' to be loaded\n  HINT: Might try \"module load {}\" first.",
    names.join(" "),
    names[0]
  ))
  .raise()
}

fn module(ctx: Ctx<'_>, (verb, args): (String, Variadic<String>)) -> LuaResult<()> {
  let args: Vec<String> = args.to_vec();
  let command = match mode(ctx) {
    Mode::Load => Command::from_words(&verb, &args).map_err(LuaError::external)?,
    Mode::Unload => match verb.as_str() {
      "load" | "add" => Command::Unload(args.clone()),
      "use" => Command::Unuse {
        paths: args.iter().filter(|a| !a.starts_with('-')).cloned().collect(),
        force: false,
      },
      _ => return Ok(()),
    },
    Mode::Display => {
      let mut shown = vec![verb];
      shown.extend(args);
      show(ctx, "module", &shown);
      return Ok(());
    }
    _ => return Ok(()),
  };

  debug!(command = command.name(), "nested module command");
  let outcome = command::execute(ctx, &command).map_err(LuaError::external)?;
  if !outcome.is_success() {
    return ScriptSignal::Rejected(format!("module {} {} failed", verb, args.join(" "))).raise();
  }
  Ok(())
}

fn shell_command(script: &str, env: &EnvMap, cwd: &Path) -> std::process::Command {
  #[cfg(windows)]
  let mut command = {
    let mut c = std::process::Command::new("cmd");
    c.arg("/C").arg(script);
    c
  };
  #[cfg(not(windows))]
  let mut command = {
    let mut c = std::process::Command::new("sh");
    c.arg("-c").arg(script);
    c
  };
  command.env_clear().envs(env);
  if cwd.is_dir() {
    command.current_dir(cwd);
  }
  command
}

fn runs_commands(ctx: Ctx<'_>, primitive: &str, script: &str) -> Option<(EnvMap, PathBuf)> {
  match mode(ctx) {
    Mode::Load | Mode::Unload => {
      let session = ctx.session.borrow();
      Some((session.subprocess_env(), session.cwd.clone()))
    }
    Mode::Display => {
      show(ctx, primitive, &[script.to_string()]);
      None
    }
    _ => None,
  }
}

fn system(ctx: Ctx<'_>, script: String) -> LuaResult<i32> {
  let Some((env, cwd)) = runs_commands(ctx, "system", &script) else {
    return Ok(0);
  };
  debug!(command = %script, "running subprocess");
  let status = shell_command(&script, &env, &cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::from(io::stderr()))
    .status()
    .map_err(LuaError::external)?;
  Ok(status.code().unwrap_or(-1))
}

fn capture(ctx: Ctx<'_>, script: String) -> LuaResult<String> {
  let Some((env, cwd)) = runs_commands(ctx, "capture", &script) else {
    return Ok(String::new());
  };
  debug!(command = %script, "capturing subprocess output");
  let output = shell_command(&script, &env, &cwd)
    .stdin(Stdio::null())
    .stderr(Stdio::inherit())
    .output()
    .map_err(LuaError::external)?;
  let text = String::from_utf8_lossy(&output.stdout);
  Ok(text.trim_end_matches(['\n', '\r']).to_string())
}

fn is_loaded(ctx: Ctx<'_>, names: Variadic<String>) -> LuaResult<bool> {
  let loaded = ctx.session.borrow().loaded();
  if names.is_empty() {
    return Ok(!loaded.is_empty());
  }
  Ok(names.iter().all(|name| loaded.is_loaded(&expand(ctx, name))))
}

fn is_used(ctx: Ctx<'_>, dirs: Variadic<String>) -> LuaResult<bool> {
  let session = ctx.session.borrow();
  let used = session.modulepaths();
  if dirs.is_empty() {
    return Ok(!used.is_empty());
  }
  Ok(dirs.iter().all(|dir| used.contains(&session.directory(dir))))
}

fn is_saved(ctx: Ctx<'_>, names: Variadic<String>) -> LuaResult<bool> {
  let store = CollectionStore::from_config(&ctx.session.borrow().config);
  if names.is_empty() {
    return Ok(store.list().map(|l| !l.is_empty()).unwrap_or(false));
  }
  Ok(names.iter().all(|name| store.exists(name)))
}

fn is_avail(ctx: Ctx<'_>, names: Variadic<String>) -> LuaResult<bool> {
  let mut all = true;
  for name in names.iter() {
    match locate::resolve(ctx, name) {
      Ok(_) => {}
      Err(err) if err.is_fatal() => return Err(LuaError::external(err)),
      Err(_) => all = false,
    }
  }
  Ok(all)
}

fn module_info(ctx: Ctx<'_>, (key, name): (String, Option<String>)) -> LuaResult<Option<String>> {
  let (frame, shell) = {
    let session = ctx.session.borrow();
    (session.frame().cloned(), session.shell)
  };
  let current = frame.as_ref().map(|f| f.name.clone()).unwrap_or_default();
  let subject = name.unwrap_or(current);

  let value = match key.as_str() {
    "name" => frame.map(|f| f.name),
    "specified" => frame.map(|f| f.specified),
    "file" => frame.map(|f| f.file.to_string_lossy().into_owned()),
    "mode" => frame.map(|f| f.mode.as_str().to_string()),
    "command" => frame.map(|f| f.command),
    "shell" => Some(shell.name().to_string()),
    "shelltype" => Some(shell.kind().to_string()),
    "loaded" => {
      let loaded = ctx.session.borrow().loaded();
      let names: Vec<&str> = loaded.matching(&subject).into_iter().map(|m| m.name.as_str()).collect();
      Some(names.join(" "))
    }
    "symbols" => Some(ctx.session.borrow().graph.symbols_for(&subject).join(":")),
    "version" => Some(
      locate::resolve(ctx, &subject)
        .map(|r| r.name)
        .unwrap_or(subject),
    ),
    other => return Err(LuaError::external(format!("module_info: unknown key '{other}'"))),
  };
  Ok(value)
}

/// Expand `/name` shorthand against the current module directory.
fn expand(ctx: Ctx<'_>, name: &str) -> String {
  let session = ctx.session.borrow();
  let dir = session.frame().map(|f| f.module_dir()).unwrap_or("");
  expand_in(dir, name)
}

pub(crate) fn expand_in(dir: &str, name: &str) -> String {
  match name.strip_prefix('/') {
    Some(rest) if dir.is_empty() => rest.to_string(),
    Some(rest) => format!("{dir}/{rest}"),
    None => name.to_string(),
  }
}

fn declaration_origin(ctx: Ctx<'_>) -> (Option<PathBuf>, Option<PathBuf>) {
  let session = ctx.session.borrow();
  let frame = session.frame();
  (
    frame.and_then(|f| f.modpath.clone()),
    frame.and_then(|f| f.file.parent().map(Path::to_path_buf)),
  )
}

fn module_alias(ctx: Ctx<'_>, (name, target): (String, String)) -> LuaResult<()> {
  let (name, target) = (expand(ctx, &name), expand(ctx, &target));
  let (origin, _) = declaration_origin(ctx);
  ctx.session.borrow_mut().graph.add_alias(&name, &target, origin.as_deref());
  Ok(())
}

fn module_version(ctx: Ctx<'_>, (target, symbols): (String, Variadic<String>)) -> LuaResult<()> {
  let target = expand(ctx, &target);
  let (origin, _) = declaration_origin(ctx);
  for symbol in symbols.iter() {
    let full = if symbol.starts_with('/') {
      expand(ctx, symbol)
    } else if symbol.contains('/') {
      symbol.clone()
    } else {
      match parent_of(&target) {
        Some(dir) => format!("{dir}/{symbol}"),
        None => symbol.clone(),
      }
    };
    ctx.session.borrow_mut().graph.add_version(&full, &target, origin.as_deref());
  }
  Ok(())
}

fn module_virtual(ctx: Ctx<'_>, (name, file): (String, String)) -> LuaResult<()> {
  let name = expand(ctx, &name);
  let (origin, script_dir) = declaration_origin(ctx);
  let file = PathBuf::from(file);
  let file = match script_dir {
    Some(dir) if file.is_relative() => dir.join(file),
    _ => file,
  };
  ctx.session.borrow_mut().graph.add_virtual(&name, &file, origin.as_deref());
  Ok(())
}

fn whatis(ctx: Ctx<'_>, text: Variadic<String>) -> LuaResult<()> {
  match mode(ctx) {
    Mode::Whatis => {
      if let Some(frame) = ctx.session.borrow_mut().frame_mut() {
        frame.whatis.push(text.join(" "));
      }
    }
    Mode::Display => show(ctx, "whatis", &text),
    _ => {}
  }
  Ok(())
}

fn puts(ctx: Ctx<'_>, values: Variadic<LuaValue>) -> LuaResult<()> {
  let parts = values.iter().map(LuaValue::to_string).collect::<LuaResult<Vec<_>>>()?;
  ctx.session.borrow_mut().report.info(parts.join(" "));
  Ok(())
}
