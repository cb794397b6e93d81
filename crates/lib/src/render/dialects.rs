//! Statement syntax of each output language.

use super::quote;

/// Syntax for every statement kind the renderer emits.
pub trait Dialect: Sync {
  fn assign(&self, name: &str, value: &str) -> String;
  fn unset(&self, name: &str) -> String;

  fn alias(&self, _name: &str, _value: &str) -> Option<String> {
    None
  }

  fn unalias(&self, _name: &str) -> Option<String> {
    None
  }

  fn chdir(&self, dir: &str) -> Option<String>;

  /// Final statement signalling success or failure to the caller.
  fn boolean(&self, value: bool) -> String;

  /// Final statement handing a text result to the caller.
  fn text(&self, text: &str) -> String;

  fn x_resources(&self, _lines: &[String]) -> Option<String> {
    None
  }

  fn preamble(&self) -> Option<&'static str> {
    None
  }

  /// Longest statement the shell accepts.
  fn max_statement_len(&self) -> Option<usize> {
    None
  }

  /// Definition of the `module` command calling back into `exe`.
  fn module_function(&self, _exe: &str, _shell: &str) -> Option<String> {
    None
  }
}

fn xrdb(lines: &[String], quote: fn(&str) -> String) -> String {
  let quoted: Vec<String> = lines.iter().map(|l| quote(l)).collect();
  format!("printf '%s\\n' {} | xrdb -merge;", quoted.join(" "))
}

/// sh, bash, ksh, zsh.
pub struct Posix;

impl Dialect for Posix {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("{name}={}; export {name};", quote::posix(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("unset {name};")
  }

  fn alias(&self, name: &str, value: &str) -> Option<String> {
    Some(format!("alias {name}={};", quote::posix(value)))
  }

  fn unalias(&self, name: &str) -> Option<String> {
    Some(format!("unalias {name} 2>/dev/null || true;"))
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("cd {};", quote::posix(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    if value { "test 0 = 0;" } else { "test 0 = 1;" }.to_string()
  }

  fn text(&self, text: &str) -> String {
    format!("printf '%s\\n' {};", quote::posix(text))
  }

  fn x_resources(&self, lines: &[String]) -> Option<String> {
    Some(xrdb(lines, quote::posix))
  }

  fn module_function(&self, exe: &str, shell: &str) -> Option<String> {
    Some(format!("module() {{ eval \"$({} {shell} \"$@\")\"; }};", quote::posix(exe)))
  }
}

/// csh, tcsh.
pub struct Csh;

impl Dialect for Csh {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("setenv {name} {};", quote::csh(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("unsetenv {name};")
  }

  fn alias(&self, name: &str, value: &str) -> Option<String> {
    Some(format!("alias {name} {};", quote::csh(value)))
  }

  fn unalias(&self, name: &str) -> Option<String> {
    Some(format!("unalias {name};"))
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("cd {};", quote::csh(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    Posix.boolean(value)
  }

  fn text(&self, text: &str) -> String {
    format!("echo {};", quote::csh(text))
  }

  fn x_resources(&self, lines: &[String]) -> Option<String> {
    Some(xrdb(lines, quote::csh))
  }

  fn max_statement_len(&self) -> Option<usize> {
    Some(crate::consts::CSH_LIMIT)
  }

  fn module_function(&self, exe: &str, shell: &str) -> Option<String> {
    Some(format!("alias module 'eval `{exe} {shell} \\!*`';"))
  }
}

/// Variables fish keeps as lists.
const FISH_LIST_VARS: &[&str] = &["PATH", "CDPATH", "MANPATH"];

pub struct Fish;

impl Dialect for Fish {
  fn assign(&self, name: &str, value: &str) -> String {
    if FISH_LIST_VARS.contains(&name) {
      let items: Vec<String> = value.split(':').map(quote::backslashed).collect();
      return format!("set -xg {name} {};", items.join(" "));
    }
    format!("set -xg {name} {};", quote::backslashed(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("set -e {name};")
  }

  fn alias(&self, name: &str, value: &str) -> Option<String> {
    Some(format!("alias {name} {};", quote::backslashed(value)))
  }

  fn unalias(&self, name: &str) -> Option<String> {
    Some(format!("functions -e {name};"))
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("cd {};", quote::backslashed(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    Posix.boolean(value)
  }

  fn text(&self, text: &str) -> String {
    format!("echo {};", quote::backslashed(text))
  }

  fn x_resources(&self, lines: &[String]) -> Option<String> {
    Some(xrdb(lines, quote::backslashed))
  }

  fn module_function(&self, exe: &str, shell: &str) -> Option<String> {
    Some(format!(
      "function module; {} {shell} $argv | source; end;",
      quote::backslashed(exe)
    ))
  }
}

/// Windows cmd.exe.
pub struct Cmd;

impl Dialect for Cmd {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("set {name}={}", quote::cmd(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("set {name}=")
  }

  fn alias(&self, name: &str, value: &str) -> Option<String> {
    Some(format!("doskey {name}={}", quote::cmd(value)))
  }

  fn unalias(&self, name: &str) -> Option<String> {
    Some(format!("doskey {name}="))
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("cd /d \"{dir}\""))
  }

  fn boolean(&self, value: bool) -> String {
    format!("exit /b {}", if value { 0 } else { 1 })
  }

  fn text(&self, text: &str) -> String {
    format!("echo {}", quote::cmd(text))
  }
}

pub struct Perl;

impl Dialect for Perl {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("$ENV{{'{name}'}} = {};", quote::backslashed(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("delete $ENV{{'{name}'}};")
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("chdir({});", quote::backslashed(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    format!("$_mlstatus = {};", if value { 1 } else { 0 })
  }

  fn text(&self, text: &str) -> String {
    format!("$_mlstatus = {};", quote::backslashed(text))
  }
}

pub struct Python;

impl Dialect for Python {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("os.environ['{name}'] = {}", quote::python(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("os.environ.pop('{name}', None)")
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("os.chdir({})", quote::python(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    format!("_mlstatus = {}", if value { "True" } else { "False" })
  }

  fn text(&self, text: &str) -> String {
    format!("_mlstatus = {}", quote::python(text))
  }

  fn preamble(&self) -> Option<&'static str> {
    Some("import os")
  }
}

pub struct Ruby;

impl Dialect for Ruby {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("ENV['{name}'] = {}", quote::backslashed(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("ENV.delete('{name}')")
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("Dir.chdir({})", quote::backslashed(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    format!("_mlstatus = {value}")
  }

  fn text(&self, text: &str) -> String {
    format!("_mlstatus = {}", quote::backslashed(text))
  }
}

pub struct Cmake;

impl Dialect for Cmake {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("set(ENV{{{name}}} {})", quote::cmake(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("unset(ENV{{{name}}})")
  }

  fn chdir(&self, _dir: &str) -> Option<String> {
    None
  }

  fn boolean(&self, value: bool) -> String {
    format!("set(_mlstatus {})", if value { "TRUE" } else { "FALSE" })
  }

  fn text(&self, text: &str) -> String {
    format!("set(_mlstatus {})", quote::cmake(text))
  }
}

pub struct R;

impl Dialect for R {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("Sys.setenv('{name}'={})", quote::backslashed(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("Sys.unsetenv('{name}')")
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("setwd({})", quote::backslashed(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    format!("mlstatus <- {}", if value { "TRUE" } else { "FALSE" })
  }

  fn text(&self, text: &str) -> String {
    format!("mlstatus <- {}", quote::backslashed(text))
  }
}

/// PowerShell.
pub struct Pwsh;

impl Dialect for Pwsh {
  fn assign(&self, name: &str, value: &str) -> String {
    format!("$env:{name} = {}", quote::pwsh(value))
  }

  fn unset(&self, name: &str) -> String {
    format!("Remove-Item -Path Env:{name} -ErrorAction SilentlyContinue")
  }

  fn alias(&self, name: &str, value: &str) -> Option<String> {
    Some(format!("function {name} {{ {value} $args }}"))
  }

  fn unalias(&self, name: &str) -> Option<String> {
    Some(format!("Remove-Item -Path Function:{name} -ErrorAction SilentlyContinue"))
  }

  fn chdir(&self, dir: &str) -> Option<String> {
    Some(format!("Set-Location {}", quote::pwsh(dir)))
  }

  fn boolean(&self, value: bool) -> String {
    format!("$_mlstatus = {}", if value { "$true" } else { "$false" })
  }

  fn text(&self, text: &str) -> String {
    format!("$_mlstatus = {}", quote::pwsh(text))
  }

  fn module_function(&self, exe: &str, shell: &str) -> Option<String> {
    Some(format!(
      "function module {{ $_mlCode = & {} {shell} $args | Out-String; if ($_mlCode) {{ Invoke-Expression $_mlCode }} }}",
      quote::pwsh(exe)
    ))
  }
}
