//! Shared helpers for library integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use envmod_lib::{Command, Engine, EngineError, EnvMap, Finished, Outcome, Session, Shell};
use tempfile::TempDir;

/// A modulepath and a home directory, isolated per test.
pub struct ModuleTree {
  pub temp: TempDir,
}

impl ModuleTree {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("modulefiles")).unwrap();
    fs::create_dir_all(temp.path().join("home")).unwrap();
    Self { temp }
  }

  pub fn modpath(&self) -> PathBuf {
    let p = self.temp.path().join("modulefiles");
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn home(&self) -> PathBuf {
    let p = self.temp.path().join("home");
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a modulefile carrying the magic marker.
  pub fn module(&self, name: &str, body: &str) -> PathBuf {
    self.write(&self.modpath(), name, &format!("#%Module\n{body}\n"))
  }

  pub fn write(&self, dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  pub fn env(&self) -> EnvMap {
    [
      ("HOME", self.home().to_string_lossy().into_owned()),
      ("PWD", self.home().to_string_lossy().into_owned()),
      ("MODULEPATH", self.modpath().to_string_lossy().into_owned()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
  }

  pub fn engine(&self, shell: Shell) -> Engine {
    Engine::new(Session::new(shell, self.env())).unwrap()
  }

  /// Engine over an environment a previous invocation left behind.
  pub fn engine_after(&self, shell: Shell, env: &EnvMap) -> Engine {
    Engine::new(Session::new(shell, env.clone())).unwrap()
  }
}

pub fn words(values: &[&str]) -> Vec<String> {
  values.iter().map(|v| v.to_string()).collect()
}

pub fn command(verb: &str, args: &[&str]) -> Command {
  Command::from_words(verb, &words(args)).unwrap()
}

pub fn run(engine: &Engine, verb: &str, args: &[&str]) -> Result<Outcome, EngineError> {
  engine.execute(&command(verb, args))
}

/// Run one command and finish the invocation.
pub fn invoke(engine: Engine, verb: &str, args: &[&str]) -> Finished {
  let result = run(&engine, verb, args);
  engine.finish(result)
}

pub fn getenv(engine: &Engine, name: &str) -> Option<String> {
  engine.session().borrow().getenv(name).map(str::to_string)
}

pub fn diagnostics(finished: &Finished) -> String {
  finished
    .diagnostics
    .iter()
    .map(|m| m.text.as_str())
    .collect::<Vec<_>>()
    .join("\n")
}
