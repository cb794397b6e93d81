//! Loading, unloading and switching modules.

use envmod_lib::Outcome;
use envmod_lib::Shell;
use envmod_lib::session::Severity;

use super::common::*;

#[test]
fn load_exports_variables_and_registers_module() {
  let tree = ModuleTree::new();
  let file = tree.module("foo/1.0", r#"setenv("FOO", "bar")"#);

  let finished = invoke(tree.engine(Shell::Bash), "load", &["foo/1.0"]);
  assert!(finished.success, "{}", diagnostics(&finished));
  assert!(finished.code.contains("FOO='bar'; export FOO;"));
  assert!(finished.code.contains("LOADEDMODULES='foo/1.0'; export LOADEDMODULES;"));
  assert!(finished.code.contains(&format!("_LMFILES_='{}'; export _LMFILES_;", file.display())));
  assert!(finished.code.ends_with("test 0 = 0;\n"));
}

#[test]
fn bare_name_loads_declared_default_with_alt_names() {
  let tree = ModuleTree::new();
  tree.module("foo/1.0", "");
  tree.module("foo/2.0", "");
  tree.module("foo/.modulerc", r#"module_version("foo/1.0", "default")"#);
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "load", &["foo"]).unwrap().is_success());
  let session = engine.session().borrow();
  let loaded = session.loaded();
  let module = loaded.get("foo/1.0").expect("foo/1.0 loaded");
  assert_eq!(module.alt_names, words(&["foo", "foo/default"]));
  assert_eq!(session.getenv("__MODULES_LMALTNAME"), Some("foo/1.0&foo&foo/default"));
  assert!(loaded.is_loaded("foo/default"));
}

#[test]
fn bare_name_without_default_picks_highest_version() {
  let tree = ModuleTree::new();
  tree.module("tool/1.9", "");
  tree.module("tool/1.10", "");
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "load", &["tool"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("tool/1.10"));
}

#[test]
fn loading_twice_registers_once() {
  let tree = ModuleTree::new();
  tree.module("foo/1.0", r#"append_path("FOOPATH", "/opt/foo")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["foo/1.0"]).unwrap();
  run(&engine, "load", &["foo/1.0"]).unwrap();
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("foo/1.0"));
  assert_eq!(getenv(&engine, "FOOPATH").as_deref(), Some("/opt/foo"));
}

#[test]
fn failing_module_is_rolled_back_and_batch_continues() {
  let tree = ModuleTree::new();
  tree.module("bad/1", "setenv(\"HALF\", \"done\")\nerror(\"broken modulefile\")");
  tree.module("good/1", r#"setenv("GOOD", "1")"#);
  let engine = tree.engine(Shell::Bash);

  let outcome = run(&engine, "load", &["bad/1", "good/1"]).unwrap();
  assert_eq!(outcome, Outcome::Status(false));
  assert_eq!(getenv(&engine, "HALF"), None);
  assert_eq!(getenv(&engine, "GOOD").as_deref(), Some("1"));
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("good/1"));

  let finished = engine.finish(Ok(outcome));
  assert!(!finished.success);
  assert!(diagnostics(&finished).contains("broken modulefile"));
  assert!(finished.code.ends_with("test 0 = 1;\n"));
}

#[test]
fn conflict_is_a_warning_and_blocks_the_load() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  tree.module("b/1", r#"conflict("a")"#);
  let engine = tree.engine(Shell::Bash);

  let outcome = run(&engine, "load", &["a/1", "b/1"]).unwrap();
  assert_eq!(outcome, Outcome::Status(false));
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("a/1"));

  let finished = engine.finish(Ok(outcome));
  let warning = finished
    .diagnostics
    .iter()
    .find(|m| m.severity == Severity::Warning)
    .expect("conflict warning");
  assert!(warning.text.contains("conflicts with"));
}

#[test]
fn prereq_is_satisfied_by_earlier_load() {
  let tree = ModuleTree::new();
  tree.module("gcc/12", "");
  tree.module("mpi/4", r#"prereq("gcc")"#);

  let engine = tree.engine(Shell::Bash);
  assert_eq!(run(&engine, "load", &["mpi/4"]).unwrap(), Outcome::Status(false));

  let engine = tree.engine(Shell::Bash);
  assert!(run(&engine, "load", &["gcc/12", "mpi/4"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("gcc/12:mpi/4"));
}

#[test]
fn nested_load_is_undone_by_unload() {
  let tree = ModuleTree::new();
  tree.module("stack/1", r#"module("load", "lib/2") setenv("STACK", "1")"#);
  tree.module("lib/2", r#"setenv("LIB", "2")"#);
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "load", &["stack/1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("lib/2:stack/1"));

  assert!(run(&engine, "unload", &["stack"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LIB"), None);
  assert_eq!(getenv(&engine, "STACK"), None);
  assert_eq!(getenv(&engine, "LOADEDMODULES"), None);
}

#[test]
fn switch_replaces_module_of_same_root() {
  let tree = ModuleTree::new();
  tree.module("gcc/11", r#"setenv("GCC", "11")"#);
  tree.module("gcc/12", r#"setenv("GCC", "12")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["gcc/11"]).unwrap();
  assert!(run(&engine, "switch", &["gcc/12"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "GCC").as_deref(), Some("12"));
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("gcc/12"));
}

#[test]
fn failed_switch_never_loads_the_new_module() {
  let tree = ModuleTree::new();
  tree.module("old/1", r#"if module_info("mode") == "unload" then error("cannot leave") end"#);
  tree.module("new/1", r#"setenv("NEW", "1")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["old/1"]).unwrap();
  let outcome = run(&engine, "switch", &["old/1", "new/1"]).unwrap();
  assert_eq!(outcome, Outcome::Status(false));
  assert_eq!(getenv(&engine, "NEW"), None);
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("old/1"));

  let finished = engine.finish(Ok(outcome));
  assert!(diagnostics(&finished).contains("could not be unloaded"));
}

#[test]
fn purge_unloads_everything_in_reverse() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"append_path("ORDER", "a")"#);
  tree.module("b/1", r#"append_path("ORDER", "b")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1", "b/1"]).unwrap();
  assert_eq!(getenv(&engine, "ORDER").as_deref(), Some("a:b"));
  assert!(run(&engine, "purge", &[]).unwrap().is_success());
  assert_eq!(getenv(&engine, "ORDER"), None);
  assert_eq!(getenv(&engine, "LOADEDMODULES"), None);
}

#[test]
fn reload_keeps_the_same_modules() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"setenv("A", "1")"#);
  tree.module("b/1", r#"setenv("B", "1")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1", "b/1"]).unwrap();
  assert!(run(&engine, "reload", &[]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES").as_deref(), Some("a/1:b/1"));
  assert_eq!(getenv(&engine, "B").as_deref(), Some("1"));
}

#[test]
fn sourced_script_is_not_registered() {
  let tree = ModuleTree::new();
  let script = tree.write(&tree.home(), "setup.lua", r#"setenv("SOURCED", "yes")"#);
  let engine = tree.engine(Shell::Bash);

  let outcome = run(&engine, "source", &[&script.to_string_lossy()]).unwrap();
  assert!(outcome.is_success());
  assert_eq!(getenv(&engine, "SOURCED").as_deref(), Some("yes"));
  assert_eq!(getenv(&engine, "LOADEDMODULES"), None);
}

#[test]
fn missing_modulepath_discards_all_pending_changes() {
  let tree = ModuleTree::new();
  let mut env = tree.env();
  env.remove("MODULEPATH");
  env.insert("KEEP".to_string(), "1".to_string());
  let engine = tree.engine_after(Shell::Bash, &env);

  run(&engine, "append-path", &["EXTRA", "/x"]).unwrap();
  let finished = invoke(engine, "load", &["foo"]);
  assert!(!finished.success);
  assert_eq!(finished.code, "test 0 = 1;\n");
  assert!(diagnostics(&finished).contains("No module path defined"));
}

#[test]
fn is_loaded_requires_every_name() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  tree.module("b/1", "");
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1"]).unwrap();
  assert!(run(&engine, "is-loaded", &["a"]).unwrap().is_success());
  assert!(!run(&engine, "is-loaded", &["a", "b"]).unwrap().is_success());
  assert_eq!(
    run(&engine, "info-loaded", &["a"]).unwrap(),
    Outcome::Text("a/1".to_string())
  );
}

#[test]
fn modules_do_not_share_library_edits_or_globals() {
  let tree = ModuleTree::new();
  tree.module("a/1", "string.helper = function() return 1 end\nhelper = 1");
  tree.module("b/1", r#"if string.helper or helper then setenv("LEAKED", "1") end"#);
  tree.module("c/1", r#"rawset(getmetatable(_ENV).__index, "helper2", 1)"#);
  tree.module("d/1", r#"if helper2 then setenv("LEAKED2", "1") end"#);
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "load", &["a/1", "b/1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LEAKED"), None);

  assert!(!run(&engine, "load", &["c/1"]).unwrap().is_success());
  assert!(run(&engine, "load", &["d/1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LEAKED2"), None);
}

#[test]
fn reload_keeps_alternative_names() {
  let tree = ModuleTree::new();
  tree.module("foo/1.0", "");
  tree.module("foo/2.0", "");
  tree.module("foo/.modulerc", r#"module_version("foo/1.0", "default")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["foo"]).unwrap();
  let before = getenv(&engine, "__MODULES_LMALTNAME");
  assert_eq!(before.as_deref(), Some("foo/1.0&foo&foo/default"));

  assert!(run(&engine, "reload", &[]).unwrap().is_success());
  assert_eq!(getenv(&engine, "__MODULES_LMALTNAME"), before);
  assert!(run(&engine, "is-loaded", &["foo/default"]).unwrap().is_success());
}

#[test]
fn unload_accepts_the_script_path() {
  let tree = ModuleTree::new();
  let file = tree.module("foo/1.0", r#"setenv("FOO", "1")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["foo/1.0"]).unwrap();
  assert!(run(&engine, "unload", &[&file.to_string_lossy()]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LOADEDMODULES"), None);
  assert_eq!(getenv(&engine, "FOO"), None);
}

#[test]
fn cycle_met_inside_a_modulefile_is_fatal() {
  let tree = ModuleTree::new();
  tree.module(".modulerc", "module_alias(\"a\", \"b\")\nmodule_alias(\"b\", \"a\")");
  tree.module("x/1", "setenv(\"X\", \"1\")\nif is_avail(\"a\") then setenv(\"Y\", \"1\") end");

  let finished = invoke(tree.engine(Shell::Bash), "load", &["x/1"]);
  assert!(!finished.success);
  assert_eq!(finished.code, "test 0 = 1;\n");
  assert!(diagnostics(&finished).contains("cycle: a -> b -> a"));
}

#[test]
fn query_primitives_require_every_name() {
  let tree = ModuleTree::new();
  tree.module("a/1", "");
  tree.module(
    "q/1",
    "if is_loaded(\"a\", \"b\") then setenv(\"BOTH\", \"1\") end\nif is_loaded(\"a\") then setenv(\"ONE\", \"1\") end",
  );
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1", "q/1"]).unwrap();
  assert_eq!(getenv(&engine, "ONE").as_deref(), Some("1"));
  assert_eq!(getenv(&engine, "BOTH"), None);
}
