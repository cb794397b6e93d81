//! Aliases, symbolic versions, virtual modules and lookup failures.

use envmod_lib::{DisplayOptions, Engine, Outcome, Session, Shell};

use super::common::*;

#[test]
fn alias_cycle_is_fatal_and_discards_pending_changes() {
  let tree = ModuleTree::new();
  tree.module(".modulerc", "module_alias(\"a\", \"b\")\nmodule_alias(\"b\", \"a\")");
  tree.module("x/1", r#"setenv("X", "1")"#);

  let finished = invoke(tree.engine(Shell::Bash), "load", &["x/1", "a"]);
  assert!(!finished.success);
  assert_eq!(finished.code, "test 0 = 1;\n");
  assert!(diagnostics(&finished).contains("cycle: a -> b -> a"));
}

#[test]
fn alias_resolves_into_another_root() {
  let tree = ModuleTree::new();
  tree.module(".modulerc", r#"module_alias("cc", "gcc/12")"#);
  let file = tree.module("gcc/12", r#"setenv("CC", "gcc")"#);
  let engine = tree.engine(Shell::Bash);

  assert_eq!(
    run(&engine, "path", &["cc"]).unwrap(),
    Outcome::Text(file.to_string_lossy().into_owned())
  );
  assert!(run(&engine, "load", &["cc"]).unwrap().is_success());
  let loaded = engine.session().borrow().loaded();
  assert_eq!(loaded.get("gcc/12").map(|m| m.alt_names.clone()), Some(words(&["cc"])));
  assert!(run(&engine, "is-loaded", &["cc"]).unwrap().is_success());
}

#[test]
fn virtual_module_loads_its_declared_file() {
  let tree = ModuleTree::new();
  let shared = tree.write(&tree.home(), "shared/tool.lua", "#%Module\nsetenv(\"TOOL\", module_info(\"name\"))\n");
  tree.module(
    ".modulerc",
    &format!(r#"module_virtual("tool/2", "{}")"#, shared.display()),
  );
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "load", &["tool/2"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "TOOL").as_deref(), Some("tool/2"));
  let loaded = engine.session().borrow().loaded();
  assert_eq!(loaded.get("tool/2").map(|m| m.file.clone()), Some(shared));
}

#[test]
fn missing_module_is_reported_and_not_fatal() {
  let tree = ModuleTree::new();
  tree.module("real/1", r#"setenv("REAL", "1")"#);

  let finished = invoke(tree.engine(Shell::Bash), "load", &["nope", "real/1"]);
  assert!(!finished.success);
  assert!(diagnostics(&finished).contains("Unable to locate a modulefile for 'nope'"));
  assert!(finished.code.contains("REAL='1'; export REAL;"));
}

#[test]
fn file_without_marker_is_rejected() {
  let tree = ModuleTree::new();
  tree.write(&tree.modpath(), "plain/1", "setenv(\"PLAIN\", \"1\")\n");

  let finished = invoke(tree.engine(Shell::Bash), "load", &["plain/1"]);
  assert!(!finished.success);
  assert!(diagnostics(&finished).contains("Magic cookie '#%Module' missing"));
}

#[test]
fn earlier_modulepath_shadows_later_one() {
  let tree = ModuleTree::new();
  tree.module("dup/1", r#"setenv("FROM", "first")"#);
  let second = tree.temp.path().join("second");
  tree.write(&second, "dup/1", "#%Module\nsetenv(\"FROM\", \"second\")\n");
  tree.write(&second, "only/1", "#%Module\nsetenv(\"ONLY\", \"1\")\n");

  let mut env = tree.env();
  env.insert(
    "MODULEPATH".to_string(),
    format!("{}:{}", tree.modpath().display(), second.display()),
  );
  let engine = tree.engine_after(Shell::Bash, &env);

  assert!(run(&engine, "load", &["dup/1", "only/1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "FROM").as_deref(), Some("first"));
  assert_eq!(getenv(&engine, "ONLY").as_deref(), Some("1"));
}

#[test]
fn is_avail_checks_every_name() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  tree.module("b/1", "");
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "is-avail", &["a", "b/1"]).unwrap().is_success());
  assert!(!run(&engine, "is-avail", &["a", "zz"]).unwrap().is_success());
}

#[test]
fn terse_avail_lists_modules_under_their_modulepath() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  tree.module("a/2", "");
  tree.module("b/1", "");
  let display = DisplayOptions {
    terse: true,
    ..DisplayOptions::default()
  };
  let engine = Engine::new(Session::new(Shell::Bash, tree.env()).with_display(display)).unwrap();

  assert!(run(&engine, "avail", &[]).unwrap().is_success());
  let lines = engine.session().borrow().report.lines();
  assert_eq!(lines[0], format!("{}:", tree.modpath().display()));
  assert!(lines.iter().any(|l| l.starts_with("a/1")));
  assert!(lines.iter().any(|l| l.starts_with("a/2")));
  assert!(lines.iter().any(|l| l.starts_with("b/1")));
}

#[test]
fn avail_pattern_without_match_fails() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  let engine = tree.engine(Shell::Bash);

  assert_eq!(run(&engine, "avail", &["zzz"]).unwrap(), Outcome::Status(false));
}

#[test]
fn whatis_collects_module_descriptions() {
  let tree = ModuleTree::new();
  tree.module("gcc/12", r#"whatis("GNU compiler collection")"#);
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "whatis", &["gcc"]).unwrap().is_success());
  let lines = engine.session().borrow().report.lines();
  assert!(lines.iter().any(|l| l.contains("gcc/12: GNU compiler collection")));
  assert_eq!(getenv(&engine, "LOADEDMODULES"), None);
}
