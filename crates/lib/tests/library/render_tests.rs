//! Shell code produced for whole invocations.

use envmod_lib::{Engine, Session, Shell};

use super::common::*;

fn load_foo(tree: &ModuleTree, shell: Shell) -> String {
  let finished = invoke(tree.engine(shell), "load", &["foo/1.0"]);
  assert!(finished.success, "{}", diagnostics(&finished));
  finished.code
}

#[test]
fn same_load_renders_per_shell_syntax() {
  let tree = ModuleTree::new();
  tree.module("foo/1.0", r#"setenv("FOO", "bar")"#);

  let bash = load_foo(&tree, Shell::Bash);
  let csh = load_foo(&tree, Shell::Tcsh);
  let fish = load_foo(&tree, Shell::Fish);
  let python = load_foo(&tree, Shell::Python);

  assert!(bash.contains("FOO='bar'; export FOO;"));
  assert!(csh.contains("setenv FOO 'bar';"));
  assert!(fish.contains("set -xg FOO 'bar';"));
  assert!(python.starts_with("import os\n"));
  assert!(python.contains("os.environ['FOO'] = 'bar'"));
  assert_ne!(bash, fish);
  assert_ne!(bash, csh);
}

#[test]
fn aliases_and_directory_change_follow_variables() {
  let tree = ModuleTree::new();
  tree.module("work/1", "setenv(\"W\", \"1\")\nset_alias(\"ll\", \"ls -l\")\nchdir(\"/tmp\")");

  let finished = invoke(tree.engine(Shell::Bash), "load", &["work/1"]);
  let lines: Vec<&str> = finished.code.lines().collect();
  let var = lines.iter().position(|l| *l == "W='1'; export W;").unwrap();
  let alias = lines.iter().position(|l| *l == "alias ll='ls -l';").unwrap();
  let cd = lines.iter().position(|l| *l == "cd '/tmp';").unwrap();
  assert!(var < alias && alias < cd);
  assert_eq!(lines.last(), Some(&"test 0 = 0;"));
}

#[test]
fn text_result_is_handed_to_the_caller() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  let engine = tree.engine(Shell::Bash);
  run(&engine, "load", &["a/1"]).unwrap();

  let finished = invoke(engine, "info-loaded", &["a"]);
  assert!(finished.success);
  assert!(finished.code.ends_with("printf '%s\\n' 'a/1';\n"));
}

#[test]
fn autoinit_defines_the_module_function_first() {
  let tree = ModuleTree::new();
  let session = Session::new(Shell::Bash, tree.env()).with_executable("/usr/bin/envmod");
  let engine = Engine::new(session).unwrap();

  let finished = invoke(engine, "autoinit", &[]);
  assert!(finished.success, "{}", diagnostics(&finished));
  let first = finished.code.lines().next().unwrap();
  assert_eq!(first, r#"module() { eval "$('/usr/bin/envmod' bash "$@")"; };"#);
  assert!(finished.code.contains("LOADEDMODULES=''; export LOADEDMODULES;"));
}

#[test]
fn autoinit_applies_initial_collection() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"setenv("A", "1")"#);
  tree.write(&tree.home().join(".config/envmod"), "initrc", "#%Module\nmodule load a/1\n");

  let finished = invoke(tree.engine(Shell::Zsh), "autoinit", &[]);
  assert!(finished.success, "{}", diagnostics(&finished));
  assert!(finished.code.contains("A='1'; export A;"));
  assert!(finished.code.contains("LOADEDMODULES='a/1'; export LOADEDMODULES;"));
}

#[test]
fn failure_signal_differs_per_shell() {
  let tree = ModuleTree::new();

  let bash = invoke(tree.engine(Shell::Bash), "load", &["missing"]);
  let python = invoke(tree.engine(Shell::Python), "load", &["missing"]);
  assert!(!bash.success && !python.success);
  assert!(bash.code.ends_with("test 0 = 1;\n"));
  assert!(python.code.contains("_mlstatus = False"));
}
