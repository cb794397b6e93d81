//! Collections through the binary.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn save_writes_collection_file() {
  let mut env = TestEnv::new();
  env.module("a/1", "");
  env.module("b/1", "");
  env.eval(&["load", "a/1", "b/1"]);

  env.envmod_cmd().args(["bash", "save", "dev"]).assert().success();

  let saved = std::fs::read_to_string(env.collections().join("dev")).unwrap();
  assert!(saved.starts_with("#%Module\n"));
  assert!(saved.contains("module load a/1\nmodule load b/1\n"));
}

#[test]
fn restore_in_a_fresh_shell() {
  let mut env = TestEnv::new();
  env.module("a/1", r#"setenv("A", "1")"#);
  env.eval(&["load", "a/1"]);
  env.eval(&["save"]);
  env.state.clear();

  env
    .envmod_cmd()
    .args(["bash", "restore"])
    .assert()
    .success()
    .stdout(predicate::str::contains("A='1'; export A;"));
}

#[test]
fn restore_of_current_state_emits_nothing() {
  let mut env = TestEnv::new();
  env.module("a/1", "");
  env.eval(&["load", "a/1"]);
  env.eval(&["save"]);

  env
    .envmod_cmd()
    .args(["bash", "restore"])
    .assert()
    .success()
    .stdout("test 0 = 0;\n");
}

#[test]
fn savelist_names_collections() {
  let mut env = TestEnv::new();
  env.module("a/1", "");
  env.eval(&["load", "a/1"]);
  env.eval(&["save", "one"]);

  env
    .envmod_cmd()
    .args(["bash", "savelist"])
    .assert()
    .success()
    .stderr(predicate::str::contains("1) one"));

  env
    .envmod_cmd()
    .args(["bash", "restore", "missing"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing"));
}
