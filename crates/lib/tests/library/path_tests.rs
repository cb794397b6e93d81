//! Reference-counted path variables driven by modules and path commands.

use envmod_lib::{Outcome, Shell};

use super::common::*;

fn count(engine: &envmod_lib::Engine, var: &str, entry: &str) -> u32 {
  engine.session().borrow_mut().path_variable(var, ":", false).count(entry)
}

#[test]
fn prepend_then_append_counts_two_references() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"prepend_path("MYPATH", "/opt/a")"#);
  tree.module("b/1", r#"append_path("MYPATH", "/opt/a")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1", "b/1"]).unwrap();
  assert_eq!(getenv(&engine, "MYPATH").as_deref(), Some("/opt/a"));
  assert_eq!(count(&engine, "MYPATH", "/opt/a"), 2);
  assert_eq!(getenv(&engine, "__MODULES_SHARE_MYPATH").as_deref(), Some("/opt/a:2"));
}

#[test]
fn shared_entry_survives_until_last_contributor_unloads() {
  let tree = ModuleTree::new();
  tree.module("a/1", r#"prepend_path("MYPATH", "/opt/a")"#);
  tree.module("b/1", r#"prepend_path("MYPATH", "/opt/a", "/opt/b")"#);
  let engine = tree.engine(Shell::Bash);

  run(&engine, "load", &["a/1", "b/1"]).unwrap();
  assert_eq!(getenv(&engine, "MYPATH").as_deref(), Some("/opt/b:/opt/a"));

  run(&engine, "unload", &["a/1"]).unwrap();
  assert_eq!(getenv(&engine, "MYPATH").as_deref(), Some("/opt/b:/opt/a"));
  assert_eq!(count(&engine, "MYPATH", "/opt/a"), 1);

  run(&engine, "unload", &["b/1"]).unwrap();
  assert_eq!(getenv(&engine, "MYPATH"), None);
  assert_eq!(getenv(&engine, "__MODULES_SHARE_MYPATH"), None);
}

#[test]
fn path_commands_edit_arbitrary_variables() {
  let tree = ModuleTree::new();
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "append-path", &["LIST", "x", "y"]).unwrap().is_success());
  assert!(run(&engine, "prepend-path", &["LIST", "w"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LIST").as_deref(), Some("w:x:y"));

  assert!(run(&engine, "remove-path", &["--index", "LIST", "1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "LIST").as_deref(), Some("w:y"));

  assert!(run(&engine, "append-path", &["-d", ";", "TEXINPUTS", "a", "b"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "TEXINPUTS").as_deref(), Some("a;b"));
}

#[test]
fn duplicates_option_adds_another_occurrence() {
  let tree = ModuleTree::new();
  let engine = tree.engine(Shell::Bash);

  run(&engine, "append-path", &["DUP", "/a"]).unwrap();
  run(&engine, "append-path", &["--duplicates", "DUP", "/a"]).unwrap();
  assert_eq!(getenv(&engine, "DUP").as_deref(), Some("/a:/a"));
}

#[test]
fn force_removes_regardless_of_count() {
  let tree = ModuleTree::new();
  let engine = tree.engine(Shell::Bash);

  run(&engine, "append-path", &["P", "/a"]).unwrap();
  run(&engine, "append-path", &["P", "/a"]).unwrap();
  run(&engine, "remove-path", &["--force", "P", "/a"]).unwrap();
  assert_eq!(getenv(&engine, "P"), None);
}

#[test]
fn use_prepends_and_rejects_missing_directories() {
  let tree = ModuleTree::new();
  let extra = tree.home().join("extra");
  std::fs::create_dir_all(&extra).unwrap();
  let engine = tree.engine(Shell::Bash);

  assert!(run(&engine, "use", &[&extra.to_string_lossy()]).unwrap().is_success());
  let expected = format!("{}:{}", extra.display(), tree.modpath().display());
  assert_eq!(getenv(&engine, "MODULEPATH"), Some(expected));

  let missing = tree.home().join("missing");
  assert_eq!(
    run(&engine, "use", &[&missing.to_string_lossy()]).unwrap(),
    Outcome::Status(false)
  );
  assert!(engine.session().borrow().report.has_errors());
}

#[test]
fn unuse_drops_a_search_directory() {
  let tree = ModuleTree::new();
  let extra = tree.home().join("extra");
  std::fs::create_dir_all(&extra).unwrap();
  let engine = tree.engine(Shell::Bash);

  run(&engine, "use", &["--append", &extra.to_string_lossy()]).unwrap();
  assert!(run(&engine, "is-used", &[&extra.to_string_lossy()]).unwrap().is_success());
  run(&engine, "unuse", &[&extra.to_string_lossy()]).unwrap();
  assert!(!run(&engine, "is-used", &[&extra.to_string_lossy()]).unwrap().is_success());
  assert_eq!(getenv(&engine, "MODULEPATH"), Some(tree.modpath().to_string_lossy().into_owned()));
}

#[cfg(unix)]
#[test]
fn symlinked_search_directory_is_used_from_scripts_and_commands() {
  let tree = ModuleTree::new();
  let real = tree.home().join("real");
  std::fs::create_dir_all(&real).unwrap();
  let link = tree.home().join("link");
  std::os::unix::fs::symlink(&real, &link).unwrap();
  let link = link.to_string_lossy().into_owned();
  tree.module("watch/1", &format!("if is_used({link:?}) then setenv(\"SEEN\", \"1\") end"));
  let engine = tree.engine(Shell::Bash);

  run(&engine, "use", &[&link]).unwrap();
  assert!(run(&engine, "is-used", &[&link]).unwrap().is_success());
  assert!(run(&engine, "load", &["watch/1"]).unwrap().is_success());
  assert_eq!(getenv(&engine, "SEEN").as_deref(), Some("1"));
}

#[test]
fn display_shows_forced_removal() {
  let tree = ModuleTree::new();
  tree.module("r/1", r#"remove_path("PATH", "/opt/x", { force = true })"#);

  let finished = invoke(tree.engine(Shell::Bash), "display", &["r/1"]);
  assert!(finished.success, "{}", diagnostics(&finished));
  assert!(diagnostics(&finished).contains("--force PATH /opt/x"));
}
