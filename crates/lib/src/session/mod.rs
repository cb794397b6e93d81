//! Per-invocation session context.
//!
//! One [`Session`] is created at process start from the caller's environment
//! and passed by reference to every component. It owns the working copy of
//! the environment, the pending alias and resource edits, the settings stack,
//! the evaluation call stack, the resolution graph and the diagnostics report.

mod report;
mod stack;

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use report::{Message, Report, Severity};
pub use stack::{Settings, SettingsStack};

use crate::config::{Config, DisplayOptions};
use crate::consts::{APP_NAME, LIST_DELIM, MODULEPATH};
use crate::loaded::LoadedModules;
use crate::locate::LocatorState;
use crate::pathlist::{PathListError, PathVariable, Position, RemoveTarget, check_delimiter, shadow_name};
use crate::render::{PendingMutations, Shell};
use crate::resolve::ResolutionGraph;
use crate::sandbox::{Frame, Mode};

/// Environment variables by name.
pub type EnvMap = BTreeMap<String, String>;

#[derive(Debug)]
pub struct Session {
  pub shell: Shell,
  pub config: Config,
  pub display: DisplayOptions,
  /// Verb of the top-level command being run.
  pub command: String,
  /// Program the generated `module` function calls back into.
  pub executable: PathBuf,
  pub cwd: PathBuf,
  pub graph: ResolutionGraph,
  pub locator: LocatorState,
  pub report: Report,
  /// Emit the `module` function definition with the rendered code.
  pub define_module_function: bool,
  initial_env: EnvMap,
  settings: Settings,
  stack: SettingsStack,
  frames: Vec<Frame>,
  inhibited: bool,
}

impl Session {
  pub fn new(shell: Shell, env: EnvMap) -> Self {
    let cwd = env
      .get("PWD")
      .map(PathBuf::from)
      .or_else(|| std::env::current_dir().ok())
      .unwrap_or_else(|| PathBuf::from("."));
    Self {
      shell,
      config: Config::from_env(&env),
      display: DisplayOptions::default(),
      command: String::new(),
      executable: PathBuf::from(APP_NAME),
      cwd,
      graph: ResolutionGraph::new(),
      locator: LocatorState::default(),
      report: Report::default(),
      define_module_function: false,
      initial_env: env.clone(),
      settings: Settings {
        env,
        ..Settings::default()
      },
      stack: SettingsStack::default(),
      frames: Vec::new(),
      inhibited: false,
    }
  }

  /// Session over the environment of the running process.
  ///
  /// Variables whose name or value is not UTF-8 are left out.
  pub fn from_process(shell: Shell) -> Self {
    Self::new(shell, utf8_vars(std::env::vars_os()))
  }

  pub fn with_display(mut self, display: DisplayOptions) -> Self {
    self.display = display;
    self
  }

  pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
    self.executable = executable.into();
    self
  }

  pub fn env(&self) -> &EnvMap {
    &self.settings.env
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn getenv(&self, name: &str) -> Option<&str> {
    self.settings.env.get(name).map(String::as_str)
  }

  pub fn setenv(&mut self, name: &str, value: &str) {
    debug!(name, value, "setenv");
    self.settings.env.insert(name.to_string(), value.to_string());
  }

  pub fn unsetenv(&mut self, name: &str) {
    debug!(name, "unsetenv");
    self.settings.env.remove(name);
  }

  fn put(&mut self, name: &str, value: Option<String>) {
    match value {
      Some(value) => self.setenv(name, &value),
      None => self.unsetenv(name),
    }
  }

  /// Read a path variable with its shadow, repairing the shadow if needed.
  pub fn path_variable(&mut self, name: &str, delimiter: &str, force: bool) -> PathVariable {
    let shadow = shadow_name(name);
    let parsed = PathVariable::parse(name, delimiter, self.getenv(name), self.getenv(&shadow));
    if parsed.repaired && !force {
      warn!(variable = name, "reference counter out of step, repaired");
      self
        .report
        .warning(format!("Reference counter variable '{shadow}' was inconsistent with '{name}' and has been repaired"));
    }
    parsed.variable
  }

  /// Write a path variable and its shadow back to the environment.
  pub fn store_path(&mut self, var: &PathVariable) {
    let shadow = shadow_name(var.name());
    self.put(var.name(), var.value());
    self.put(&shadow, var.shadow());
  }

  pub fn add_path(
    &mut self,
    name: &str,
    position: Position,
    values: &[String],
    delimiter: &str,
    allow_duplicates: bool,
  ) -> Result<(), PathListError> {
    check_delimiter(name, delimiter)?;
    let mut var = self.path_variable(name, delimiter, false);
    var.add(position, values, allow_duplicates);
    self.store_path(&var);
    Ok(())
  }

  pub fn remove_path(
    &mut self,
    name: &str,
    target: &RemoveTarget,
    delimiter: &str,
    force: bool,
  ) -> Result<(), PathListError> {
    check_delimiter(name, delimiter)?;
    let mut var = self.path_variable(name, delimiter, force);
    var.remove(target, force);
    self.store_path(&var);
    Ok(())
  }

  pub fn set_alias(&mut self, name: &str, value: &str) {
    self.settings.aliases.insert(name.to_string(), Some(value.to_string()));
  }

  pub fn unset_alias(&mut self, name: &str) {
    self.settings.aliases.insert(name.to_string(), None);
  }

  pub fn add_x_resource(&mut self, line: &str) {
    self.settings.x_resources.push(line.to_string());
  }

  pub fn set_chdir(&mut self, dir: PathBuf) {
    self.settings.chdir = Some(dir);
  }

  /// Registry of loaded modules as the environment currently describes it.
  pub fn loaded(&self) -> LoadedModules {
    LoadedModules::from_env(&self.settings.env)
  }

  pub fn store_loaded(&mut self, loaded: &LoadedModules) {
    for (name, value) in loaded.to_env() {
      self.put(name, value);
    }
  }

  /// Directories of `MODULEPATH`, in search order.
  pub fn modulepaths(&self) -> Vec<PathBuf> {
    self
      .getenv(MODULEPATH)
      .map(|value| {
        value
          .split(LIST_DELIM)
          .filter(|entry| !entry.is_empty())
          .map(PathBuf::from)
          .collect()
      })
      .unwrap_or_default()
  }

  /// Make `path` absolute against the session's working directory.
  pub fn absolute(&self, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.cwd.join(path)
    }
  }

  /// Absolute form of a search directory, symlinks resolved when it exists.
  pub fn directory(&self, path: &str) -> PathBuf {
    let path = self.absolute(path);
    dunce::canonicalize(&path).unwrap_or(path)
  }

  pub fn push(&mut self) {
    self.stack.push(&self.settings);
  }

  pub fn pop(&mut self) {
    self.stack.pop();
  }

  pub fn restore(&mut self) {
    self.stack.restore(&mut self.settings);
  }

  pub fn push_frame(&mut self, frame: Frame) {
    self.frames.push(frame);
  }

  pub fn pop_frame(&mut self) -> Option<Frame> {
    self.frames.pop()
  }

  pub fn frame(&self) -> Option<&Frame> {
    self.frames.last()
  }

  pub fn frame_mut(&mut self) -> Option<&mut Frame> {
    self.frames.last_mut()
  }

  /// Mode of the innermost evaluation.
  pub fn mode(&self) -> Mode {
    self.frame().map(|f| f.mode).unwrap_or(Mode::Scan)
  }

  /// Evaluation nesting depth.
  pub fn depth(&self) -> usize {
    self.frames.len()
  }

  /// Suppress every further script evaluation in this process.
  pub fn inhibit(&mut self) {
    debug!("script interpretation inhibited");
    self.inhibited = true;
  }

  pub fn is_inhibited(&self) -> bool {
    self.inhibited
  }

  /// Environment given to subprocesses: the current one minus quarantined names.
  pub fn subprocess_env(&self) -> EnvMap {
    let quarantined: BTreeSet<&str> = self.config.quarantine.iter().map(String::as_str).collect();
    self
      .settings
      .env
      .iter()
      .filter(|(name, _)| !quarantined.contains(name.as_str()))
      .map(|(name, value)| (name.clone(), value.clone()))
      .collect()
  }

  /// Net change since the session started.
  pub fn pending(&self) -> PendingMutations {
    let names: BTreeSet<&String> = self.initial_env.keys().chain(self.settings.env.keys()).collect();
    let env = names
      .into_iter()
      .filter(|name| self.initial_env.get(*name) != self.settings.env.get(*name))
      .map(|name| (name.clone(), self.settings.env.get(name).cloned()))
      .collect();

    PendingMutations {
      env,
      aliases: self.settings.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
      x_resources: self.settings.x_resources.clone(),
      chdir: self.settings.chdir.clone(),
      module_function: self.define_module_function.then(|| self.executable.clone()),
    }
  }
}

/// Environment pairs that are valid UTF-8; the others are skipped with a warning.
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> EnvMap {
  vars
    .into_iter()
    .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
      (Ok(name), Ok(value)) => Some((name, value)),
      (Ok(name), Err(_)) => {
        warn!(name, "skipping environment variable with a non-UTF-8 value");
        None
      }
      (Err(name), _) => {
        warn!(name = %name.to_string_lossy(), "skipping environment variable with a non-UTF-8 name");
        None
      }
    })
    .collect()
}
