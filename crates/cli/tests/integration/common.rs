//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own home, modulepath and collection directory.
pub struct TestEnv {
  pub temp: TempDir,
  /// Variables carried from one invocation to the next.
  pub state: Vec<(String, String)>,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    Self {
      temp,
      state: Vec::new(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Write a modulefile under the modulepath.
  pub fn module(&self, name: &str, body: &str) {
    self.write_file(&format!("modulefiles/{name}"), &format!("#%Module\n{body}\n"));
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn home(&self) -> PathBuf {
    self.dir("home")
  }

  pub fn modpath(&self) -> PathBuf {
    self.dir("modulefiles")
  }

  pub fn collections(&self) -> PathBuf {
    self.dir("collections")
  }

  /// Get a pre-configured Command for the envmod binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `HOME`, `XDG_CONFIG_HOME`: isolated home and configuration
  /// - `MODULEPATH`: the test modulepath
  /// - `MODULES_COLLECTION_DIR`: isolated collection directory
  /// - `MODULES_PAGER`: empty, so nothing is paged
  pub fn envmod_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("envmod");
    cmd.env("HOME", self.home());
    cmd.env("PWD", self.home());
    cmd.current_dir(self.home());
    cmd.env("XDG_CONFIG_HOME", self.home().join(".config"));
    cmd.env("MODULEPATH", self.modpath());
    cmd.env("MODULES_COLLECTION_DIR", self.collections());
    cmd.env("MODULES_PAGER", "");
    for name in ["LOADEDMODULES", "_LMFILES_", "__MODULES_LMALTNAME", "MODULES_COLLECTION_TARGET"] {
      cmd.env_remove(name);
    }
    for (name, value) in &self.state {
      cmd.env(name, value);
    }
    cmd
  }

  /// Run `args` with the bash dialect and keep the exported state for the next call.
  pub fn eval(&mut self, args: &[&str]) -> String {
    let output = self.envmod_cmd().arg("bash").args(args).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    for line in stdout.lines() {
      if let Some(name) = line.strip_prefix("unset ").and_then(|rest| rest.strip_suffix(';')) {
        self.state.retain(|(n, _)| n != name);
      }
    }
    for (name, value) in exports(&stdout) {
      self.state.retain(|(n, _)| *n != name);
      self.state.push((name, value));
    }
    stdout
  }
}

/// `NAME='value'; export NAME;` statements of bash output, without quoting subtleties.
pub fn exports(code: &str) -> Vec<(String, String)> {
  code
    .lines()
    .filter_map(|line| {
      let (name, rest) = line.split_once('=')?;
      let value = rest.split_once("'; export ")?.0.strip_prefix('\'')?;
      Some((name.to_string(), value.to_string()))
    })
    .collect()
}
