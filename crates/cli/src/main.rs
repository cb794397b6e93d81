mod output;

use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use envmod_lib::command::display_flags;
use envmod_lib::render::Dialect;
use envmod_lib::{Command, DisplayOptions, Engine, Session, Shell};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::output::{Paging, print_code, print_diagnostics, print_error};

/// envmod - environment modules for any shell
///
/// Prints shell code on stdout; evaluate it in the calling shell, usually
/// through the `module` function that `autoinit` defines.
#[derive(Parser)]
#[command(name = "envmod")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(long)]
  debug: bool,

  /// Page diagnostics even when the pager would be skipped
  #[arg(long, conflicts_with = "no_pager")]
  pager: bool,

  /// Never page diagnostics
  #[arg(long)]
  no_pager: bool,

  /// Terse listings
  #[arg(short, long)]
  terse: bool,

  /// Long listings
  #[arg(short, long)]
  long: bool,

  /// Only list default versions
  #[arg(short = 'd', long = "default")]
  default_only: bool,

  /// Only list the latest versions
  #[arg(short = 'L', long = "latest")]
  latest_only: bool,

  /// JSON listings
  #[arg(short, long)]
  json: bool,

  /// Shell the generated code is for
  shell: Shell,

  /// Command followed by its arguments
  #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
  words: Vec<String>,
}

impl Cli {
  fn display(&self, verb: &str, args: &[String]) -> DisplayOptions {
    let inline = display_flags(verb, args);
    DisplayOptions {
      terse: self.terse || inline.terse,
      long: self.long || inline.long,
      default_only: self.default_only || inline.default_only,
      latest_only: self.latest_only || inline.latest_only,
      json: self.json || inline.json,
    }
  }

  fn paging(&self) -> Paging {
    if self.no_pager {
      Paging::Never
    } else if self.pager {
      Paging::Always
    } else {
      Paging::Auto
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = if cli.debug {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_env("ENVMOD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(&cli) {
    Ok(code) => code,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &Cli) -> Result<ExitCode> {
  let (verb, args) = match cli.words.split_first() {
    Some((verb, args)) => (verb.as_str(), args),
    None => return usage_error(cli, "No command specified"),
  };

  let command = match Command::from_words(verb, args) {
    Ok(command) => command,
    Err(err) => return usage_error(cli, &err.to_string()),
  };
  debug!(shell = %cli.shell, command = command.name(), "invocation");

  let executable = std::env::current_exe().context("Failed to locate the envmod executable")?;
  let session = Session::from_process(cli.shell)
    .with_display(cli.display(verb, args))
    .with_executable(executable);
  let pager = session.config.pager.clone();

  let engine = Engine::new(session).map_err(|err| anyhow!("Failed to start the modulefile interpreter: {err}"))?;
  let result = engine.execute(&command);
  let finished = engine.finish(result);

  print_diagnostics(&finished.diagnostics, pager.as_deref(), cli.paging())?;
  print_code(&finished.code)?;

  Ok(if finished.success {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

/// Report a malformed command; the caller's shell still gets a failing final statement.
fn usage_error(cli: &Cli, message: &str) -> Result<ExitCode> {
  print_error(message);
  print_code(&format!("{}\n", cli.shell.dialect().boolean(false)))?;
  Ok(ExitCode::from(2))
}
