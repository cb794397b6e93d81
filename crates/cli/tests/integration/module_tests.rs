//! Module commands through the binary.

use predicates::prelude::*;

use super::common::{TestEnv, exports};

#[test]
fn load_prints_exports_on_stdout_only() {
  let env = TestEnv::new();
  env.module("foo/1.0", r#"setenv("FOO", "bar") puts("loading foo")"#);

  env
    .envmod_cmd()
    .args(["bash", "load", "foo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("FOO='bar'; export FOO;"))
    .stdout(predicate::str::contains("loading foo").not())
    .stderr(predicate::str::contains("loading foo"));
}

#[test]
fn state_round_trips_through_the_environment() {
  let mut env = TestEnv::new();
  env.module("gcc/12", r#"prepend_path("PATH", "/opt/gcc/12/bin")"#);
  env.module("mpi/4", r#"prereq("gcc")"#);

  env.eval(&["load", "gcc/12"]);
  let out = env.eval(&["load", "mpi/4"]);
  let vars = exports(&out);
  assert!(vars.contains(&("LOADEDMODULES".to_string(), "gcc/12:mpi/4".to_string())));

  env
    .envmod_cmd()
    .args(["bash", "list", "-t"])
    .assert()
    .success()
    .stderr(predicate::str::contains("gcc/12").and(predicate::str::contains("mpi/4")));

  env
    .envmod_cmd()
    .args(["bash", "is-loaded", "mpi"])
    .assert()
    .success();
}

#[test]
fn unload_reverses_a_load() {
  let mut env = TestEnv::new();
  env.module("foo/1.0", r#"setenv("FOO", "bar")"#);

  env.eval(&["load", "foo/1.0"]);
  let out = env.eval(&["unload", "foo"]);
  assert!(out.contains("unset FOO;"));
  assert!(out.contains("unset LOADEDMODULES;"));
}

#[test]
fn display_shows_without_changing_anything() {
  let env = TestEnv::new();
  env.module("foo/1.0", r#"setenv("FOO", "bar")"#);

  env
    .envmod_cmd()
    .args(["bash", "display", "foo/1.0"])
    .assert()
    .success()
    .stdout("test 0 = 0;\n")
    .stderr(predicate::str::contains("setenv          FOO bar"));
}

#[test]
fn avail_json_lists_modules() {
  let env = TestEnv::new();
  env.module("foo/1.0", "");
  env.module("foo/2.0", "");

  let output = env.envmod_cmd().args(["bash", "avail", "--json"]).output().unwrap();
  assert!(output.status.success());
  let stderr = String::from_utf8(output.stderr).unwrap();
  assert!(stderr.contains("\"foo/1.0\""));
  assert!(stderr.contains("\"foo/2.0\""));
}

#[test]
fn append_path_keeps_its_delimiter_option() {
  let env = TestEnv::new();

  env
    .envmod_cmd()
    .args(["bash", "append-path", "-d", ";", "TEXINPUTS", "a", "b"])
    .assert()
    .success()
    .stdout(predicate::str::contains("TEXINPUTS='a;b'; export TEXINPUTS;"));
}

#[test]
fn fish_output_differs_from_bash() {
  let env = TestEnv::new();
  env.module("foo/1.0", r#"setenv("FOO", "bar")"#);

  env
    .envmod_cmd()
    .args(["fish", "load", "foo/1.0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("set -xg FOO 'bar';"))
    .stdout(predicate::str::contains("export").not());
}

#[test]
fn autoinit_defines_module_function() {
  let env = TestEnv::new();

  env
    .envmod_cmd()
    .args(["bash", "autoinit"])
    .assert()
    .success()
    .stdout(predicate::str::starts_with("module() { eval \"$("));
}

#[test]
fn initadd_edits_startup_file() {
  let env = TestEnv::new();
  env.write_file("home/.bashrc", "export EDITOR=vi\nmodule load gcc\n");

  env
    .envmod_cmd()
    .args(["bash", "initadd", "mpi"])
    .assert()
    .success();

  let bashrc = std::fs::read_to_string(env.home().join(".bashrc")).unwrap();
  assert_eq!(bashrc, "export EDITOR=vi\nmodule load gcc mpi\n");

  env
    .envmod_cmd()
    .args(["bash", "initlist"])
    .assert()
    .success()
    .stderr(predicate::str::contains("gcc mpi"));
}
