//! The engine: one Lua state bound to one session.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::collection::CollectionError;
use crate::command::{self, Command, CommandError, InitFileError, Outcome};
use crate::locate::LocateError;
use crate::render::{self, Signal};
use crate::sandbox;
use crate::session::{Message, Session};

/// Session shared between the engine and the primitives it installs.
pub type SharedSession = Rc<RefCell<Session>>;

/// What every component receives: the Lua state and the session.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
  pub lua: &'a Lua,
  pub session: &'a SharedSession,
}

#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Usage(#[from] CommandError),

  #[error(transparent)]
  Locate(#[from] LocateError),

  #[error(transparent)]
  Collection(#[from] CollectionError),

  #[error(transparent)]
  InitFile(#[from] InitFileError),

  #[error("Failed to serialize output: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Lua runtime error: {0}")]
  Lua(#[from] LuaError),
}

/// Result of a finished invocation.
#[derive(Debug, Clone)]
pub struct Finished {
  /// Shell code for stdout.
  pub code: String,
  /// Diagnostics for stderr.
  pub diagnostics: Vec<Message>,
  pub success: bool,
}

pub struct Engine {
  lua: Lua,
  session: SharedSession,
}

impl Engine {
  pub fn new(session: Session) -> Result<Self, EngineError> {
    let lua = Lua::new();
    let session = Rc::new(RefCell::new(session));
    sandbox::install(&lua, &session)?;
    Ok(Self { lua, session })
  }

  pub fn session(&self) -> &SharedSession {
    &self.session
  }

  pub fn ctx(&self) -> Ctx<'_> {
    Ctx {
      lua: &self.lua,
      session: &self.session,
    }
  }

  /// Run one top-level command.
  pub fn execute(&self, command: &Command) -> Result<Outcome, EngineError> {
    self.session.borrow_mut().command = command.name().to_string();
    debug!(command = command.name(), "executing");
    command::execute(self.ctx(), command)
  }

  /// Render the net effect of the invocation.
  ///
  /// A fatal error discards every pending mutation and only signals failure.
  pub fn finish(self, result: Result<Outcome, EngineError>) -> Finished {
    let mut session = self.session.borrow_mut();
    let (pending, signal) = match result {
      Ok(Outcome::Status(ok)) => (session.pending(), Signal::Boolean(ok)),
      Ok(Outcome::Text(text)) => (session.pending(), Signal::Text(text)),
      Err(err) => {
        session.report.error(err.to_string());
        (Default::default(), Signal::Boolean(false))
      }
    };
    let success = !matches!(signal, Signal::Boolean(false));
    let shell = session.shell;
    let code = render::render(shell, &pending, &signal, &mut session.report);
    Finished {
      code,
      diagnostics: session.report.take(),
      success,
    }
  }
}
