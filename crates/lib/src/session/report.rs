//! Diagnostics collected during one invocation.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  /// Plain output (listings, `puts`, display mode).
  Info,
  Warning,
  Error,
}

impl Severity {
  pub fn prefix(self) -> Option<&'static str> {
    match self {
      Severity::Info => None,
      Severity::Warning => Some("WARNING"),
      Severity::Error => Some("ERROR"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
  pub severity: Severity,
  pub text: String,
}

impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.severity.prefix() {
      Some(prefix) => write!(f, "{}: {}", prefix, self.text),
      None => write!(f, "{}", self.text),
    }
  }
}

/// Ordered diagnostics, written to stderr once the invocation ends.
#[derive(Debug, Clone, Default)]
pub struct Report {
  messages: Vec<Message>,
}

impl Report {
  pub fn info(&mut self, text: impl Into<String>) {
    self.push(Severity::Info, text.into());
  }

  pub fn warning(&mut self, text: impl Into<String>) {
    self.push(Severity::Warning, text.into());
  }

  pub fn error(&mut self, text: impl Into<String>) {
    self.push(Severity::Error, text.into());
  }

  fn push(&mut self, severity: Severity, text: String) {
    self.messages.push(Message { severity, text });
  }

  pub fn messages(&self) -> &[Message] {
    &self.messages
  }

  pub fn has_errors(&self) -> bool {
    self.messages.iter().any(|m| m.severity == Severity::Error)
  }

  pub fn take(&mut self) -> Vec<Message> {
    std::mem::take(&mut self.messages)
  }

  /// Every message as one line of text, prefixed by severity.
  pub fn lines(&self) -> Vec<String> {
    self.messages.iter().map(Message::to_string).collect()
  }
}
