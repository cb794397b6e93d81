//! Evaluation contexts, one per nesting depth.
//!
//! A context is the `_ENV` table a chunk runs in. Contexts live in the Lua
//! registry and are reused: before every evaluation at a depth, every name left
//! behind by the previous script is removed and the primitive set is bound again.
//! Reads that miss fall through to a restricted base library rebuilt for every
//! evaluation, so a script editing `string` or `math` only edits its own copy.

use mlua::prelude::*;
use tracing::debug;

use super::primitives;
use crate::engine::SharedSession;

const PRIMITIVES_KEY: &str = "envmod.sandbox.primitives";

/// Standard library functions visible to scripts.
const SAFE_FUNCTIONS: &[&str] = &[
  "assert",
  "error",
  "ipairs",
  "next",
  "pairs",
  "pcall",
  "select",
  "tonumber",
  "tostring",
  "type",
  "xpcall",
  "rawequal",
  "rawget",
  "rawlen",
  "rawset",
  "setmetatable",
  "getmetatable",
  "_VERSION",
];

/// Library tables handed out as fresh copies.
const SAFE_LIBRARIES: &[&str] = &["string", "table", "math", "utf8"];

const SAFE_OS: &[&str] = &["time", "clock", "date"];

/// Build the primitive set for `session` and lock the shared string metatable.
pub fn install(lua: &Lua, session: &SharedSession) -> LuaResult<()> {
  let primitives = primitives::create(lua, session)?;
  lua.set_named_registry_value(PRIMITIVES_KEY, primitives)?;
  // `("").x` reaches the real string library through this metatable
  lua.load("getmetatable('').__metatable = false").set_name("=envmod").exec()?;
  Ok(())
}

fn copy_table(lua: &Lua, source: &LuaTable, names: Option<&[&str]>) -> LuaResult<LuaTable> {
  let copy = lua.create_table()?;
  match names {
    Some(names) => {
      for name in names {
        copy.raw_set(*name, source.raw_get::<LuaValue>(*name)?)?;
      }
    }
    None => {
      for pair in source.pairs::<LuaValue, LuaValue>() {
        let (key, value) = pair?;
        copy.raw_set(key, value)?;
      }
    }
  }
  Ok(copy)
}

fn create_base(lua: &Lua, primitives: &LuaTable) -> LuaResult<LuaTable> {
  let globals = lua.globals();
  let base = copy_table(lua, &globals, Some(SAFE_FUNCTIONS))?;
  for name in SAFE_LIBRARIES {
    let library: LuaTable = globals.raw_get(*name)?;
    base.raw_set(*name, copy_table(lua, &library, None)?)?;
  }
  let os: LuaTable = globals.raw_get("os")?;
  base.raw_set("os", copy_table(lua, &os, Some(SAFE_OS))?)?;

  // print goes to the diagnostics stream, never to stdout
  base.raw_set("print", primitives.raw_get::<LuaFunction>("puts")?)?;
  Ok(base)
}

fn context_key(depth: usize) -> String {
  format!("envmod.sandbox.context.{depth}")
}

/// The context for `depth`, reset to its baseline.
pub fn acquire(lua: &Lua, depth: usize) -> LuaResult<LuaTable> {
  let primitives: LuaTable = lua.named_registry_value(PRIMITIVES_KEY)?;
  let key = context_key(depth);

  let env = match lua.named_registry_value::<Option<LuaTable>>(&key)? {
    Some(env) => env,
    None => {
      let env = lua.create_table()?;
      lua.set_named_registry_value(&key, &env)?;
      debug!(depth, "sandbox context created");
      env
    }
  };

  reset(lua, &env, &primitives)?;
  Ok(env)
}

fn reset(lua: &Lua, env: &LuaTable, primitives: &LuaTable) -> LuaResult<()> {
  let leftovers = env
    .pairs::<LuaValue, LuaValue>()
    .map(|pair| pair.map(|(key, _)| key))
    .collect::<LuaResult<Vec<_>>>()?;
  for key in leftovers {
    env.raw_set(key, LuaValue::Nil)?;
  }

  let meta = lua.create_table()?;
  meta.raw_set("__index", create_base(lua, primitives)?)?;
  meta.raw_set("__metatable", false)?;
  env.set_metatable(Some(meta))?;

  for pair in primitives.pairs::<LuaValue, LuaValue>() {
    let (name, function) = pair?;
    env.raw_set(name, function)?;
  }
  env.raw_set("_G", env)?;
  Ok(())
}
