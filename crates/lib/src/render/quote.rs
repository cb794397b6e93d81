//! Quoting rules per target language.

/// POSIX single quotes; an embedded quote closes, escapes and reopens.
pub fn posix(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// csh single quotes also need history expansion and newlines escaped.
pub fn csh(value: &str) -> String {
  let escaped = value
    .replace('\'', r"'\''")
    .replace('!', r"\!")
    .replace('\n', "\\\n");
  format!("'{escaped}'")
}

/// Backslash-escaped single quotes (fish, perl, ruby, R).
pub fn backslashed(value: &str) -> String {
  format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
}

/// Python string literal.
pub fn python(value: &str) -> String {
  format!(
    "'{}'",
    value
      .replace('\\', r"\\")
      .replace('\'', r"\'")
      .replace('\n', r"\n")
  )
}

/// CMake double-quoted argument.
pub fn cmake(value: &str) -> String {
  format!(
    "\"{}\"",
    value.replace('\\', r"\\").replace('"', "\\\"").replace('$', r"\$")
  )
}

/// PowerShell verbatim string.
pub fn pwsh(value: &str) -> String {
  format!("'{}'", value.replace('\'', "''"))
}

/// cmd.exe has no quoting; metacharacters are caret-escaped.
pub fn cmd(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '^' | '&' | '|' | '<' | '>' => {
        out.push('^');
        out.push(c);
      }
      '%' => out.push_str("%%"),
      _ => out.push(c),
    }
  }
  out
}
