//! Saving and restoring collections across invocations.

use envmod_lib::collection::{CollectionStore, RestorePlan};
use envmod_lib::{EnvMap, Shell};

use super::common::*;

/// Load `modules` in one engine and hand back the environment it leaves.
fn loaded_env(tree: &ModuleTree, modules: &[&str]) -> EnvMap {
  let engine = tree.engine(Shell::Bash);
  assert!(run(&engine, "load", modules).unwrap().is_success());
  let env = engine.session().borrow().env().clone();
  env
}

fn store(tree: &ModuleTree) -> CollectionStore {
  CollectionStore::new(tree.home().join(".module"), None)
}

#[test]
fn save_then_restore_is_a_no_op() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"setenv("A", "1")"#);
  tree.module("b/1", r#"setenv("B", "1")"#);
  let env = loaded_env(&tree, &["a/1", "b/1"]);

  let engine = tree.engine_after(Shell::Bash, &env);
  assert!(run(&engine, "save", &[]).unwrap().is_success());
  let saved = store(&tree).load("default").unwrap();
  assert_eq!(saved.modules, words(&["a/1", "b/1"]));

  let session = engine.session().borrow();
  let paths: Vec<String> = session
    .modulepaths()
    .iter()
    .map(|p| p.to_string_lossy().into_owned())
    .collect();
  assert!(RestorePlan::compute(&paths, &session.loaded().names(), &saved).is_empty());
  drop(session);

  let finished = invoke(engine, "restore", &[]);
  assert!(finished.success);
  assert_eq!(finished.code, "test 0 = 0;\n");
}

#[test]
fn restore_into_empty_session_loads_in_saved_order() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"append_path("ORDER", "a")"#);
  tree.module("b/1", r#"append_path("ORDER", "b")"#);
  let env = loaded_env(&tree, &["a/1", "b/1"]);
  invoke(tree.engine_after(Shell::Bash, &env), "save", &["dev"]);
  assert!(tree.home().join(".module/dev").is_file());

  let engine = tree.engine(Shell::Bash);
  assert!(run(&engine, "restore", &["dev"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("a/1:b/1"));
  assert_eq!(getenv(&engine, "ORDER").as_deref(), Some("a:b"));
}

#[test]
fn restore_redoes_only_the_divergent_suffix() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"append_path("ORDER", "a")"#);
  tree.module("b/1", r#"append_path("ORDER", "b")"#);
  tree.module("c/1", r#"append_path("ORDER", "c")"#);
  let saved_env = loaded_env(&tree, &["a/1", "b/1"]);
  invoke(tree.engine_after(Shell::Bash, &saved_env), "save", &[]);

  let current = loaded_env(&tree, &["a/1", "c/1"]);
  let engine = tree.engine_after(Shell::Bash, &current);
  assert!(run(&engine, "restore", &[]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("a/1:b/1"));
  assert_eq!(getenv(&engine, "ORDER").as_deref(), Some("a:b"));
}

#[test]
fn saving_an_empty_session_fails() {
  let tree = ModuleTree::new();
  let mut env = tree.env();
  env.remove("MODULEPATH");

  let finished = invoke(tree.engine_after(Shell::Bash, &env), "save", &[]);
  assert!(!finished.success);
  assert!(diagnostics(&finished).contains("Nothing to save"));
}

#[test]
fn savelist_saveshow_and_saverm() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  let env = loaded_env(&tree, &["a/1"]);
  invoke(tree.engine_after(Shell::Bash, &env), "save", &["one"]);
  invoke(tree.engine_after(Shell::Bash, &env), "save", &["two"]);

  let engine = tree.engine(Shell::Bash);
  run(&engine, "savelist", &[]).unwrap();
  let lines = engine.session().borrow().report.lines();
  assert_eq!(lines, vec!["Named collection list:", "  1) one", "  2) two"]);

  let engine = tree.engine(Shell::Bash);
  run(&engine, "saveshow", &["one"]).unwrap();
  let text = engine.session().borrow().report.lines().join("\n");
  assert!(text.contains("module load a/1"));

  assert!(run(&engine, "is-saved", &["one", "two"]).unwrap().is_success());
  assert!(run(&engine, "saverm", &["one"]).unwrap().is_success());
  assert!(!run(&engine, "is-saved", &["one"]).unwrap().is_success());
}

#[test]
fn restoring_unknown_collection_is_an_error() {
  let tree = ModuleTree::new();

  let finished = invoke(tree.engine(Shell::Bash), "restore", &["ghost"]);
  assert!(!finished.success);
  assert!(diagnostics(&finished).contains("ghost"));
}

#[test]
fn collection_target_separates_saved_sets() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  let mut env = loaded_env(&tree, &["a/1"]);
  env.insert("MODULES_COLLECTION_TARGET".to_string(), "x86".to_string());

  invoke(tree.engine_after(Shell::Bash, &env), "save", &[]);
  assert!(tree.home().join(".module/default.x86").is_file());
  assert!(!tree.home().join(".module/default").exists());

  let untargeted = tree.engine(Shell::Bash);
  assert!(!run(&untargeted, "is-saved", &["default"]).unwrap().is_success());
}
