//! Terminal output for the CLI.
//!
//! Shell code is the only thing written to stdout. Diagnostics go to stderr,
//! colored by severity and optionally through the pager.

use std::io::{self, IsTerminal, Write};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use envmod_lib::session::{Message, Severity};
use owo_colors::{OwoColorize, Stream};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
  Auto,
  Always,
  Never,
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    "ERROR:".if_supports_color(Stream::Stderr, |s| s.red()),
    message
  );
}

/// One diagnostic line, the severity prefix colored when stderr supports it.
pub fn format_message(message: &Message) -> String {
  match message.severity {
    Severity::Info => message.text.clone(),
    Severity::Warning => format!(
      "{} {}",
      "WARNING:".if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.text
    ),
    Severity::Error => format!(
      "{} {}",
      "ERROR:".if_supports_color(Stream::Stderr, |s| s.red()),
      message.text
    ),
  }
}

pub fn print_code(code: &str) -> Result<()> {
  let mut stdout = io::stdout().lock();
  stdout.write_all(code.as_bytes()).context("Failed to write shell code")?;
  stdout.flush().context("Failed to write shell code")
}

pub fn print_diagnostics(messages: &[Message], pager: Option<&str>, paging: Paging) -> Result<()> {
  if messages.is_empty() {
    return Ok(());
  }
  let mut text = messages.iter().map(format_message).collect::<Vec<_>>().join("\n");
  text.push('\n');

  let pager = match paging {
    Paging::Never => None,
    Paging::Always => pager,
    Paging::Auto => pager.filter(|_| io::stderr().is_terminal()),
  };
  if let Some(pager) = pager {
    if page(pager, &text)? {
      return Ok(());
    }
  }

  io::stderr().write_all(text.as_bytes()).context("Failed to write diagnostics")
}

/// Feed `text` to the pager, its output going to stderr. `false` when it could not start.
#[cfg(unix)]
fn page(pager: &str, text: &str) -> Result<bool> {
  use std::os::fd::AsFd;

  let stderr = io::stderr().as_fd().try_clone_to_owned().context("Failed to duplicate stderr")?;
  let child = Command::new("sh")
    .arg("-c")
    .arg(pager)
    .stdin(Stdio::piped())
    .stdout(Stdio::from(stderr))
    .spawn();
  let mut child = match child {
    Ok(child) => child,
    Err(err) => {
      debug!(pager, error = %err, "pager did not start");
      return Ok(false);
    }
  };

  if let Some(mut stdin) = child.stdin.take() {
    // the pager quitting early closes the pipe
    if let Err(err) = stdin.write_all(text.as_bytes()) {
      debug!(error = %err, "pager input closed");
    }
  }
  child.wait().context("Failed to wait for the pager")?;
  Ok(true)
}

#[cfg(not(unix))]
fn page(_pager: &str, _text: &str) -> Result<bool> {
  Ok(false)
}
