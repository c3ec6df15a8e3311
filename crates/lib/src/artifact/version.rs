//! Version token extraction from the main program source.

use std::path::Path;

use crate::error::ConfigError;

/// Find the first `version = '...'` style assignment in `source`.
///
/// Matching is case-insensitive on the keyword, accepts either quote style and
/// tolerates declarations such as `character(len=*), parameter :: version = "1.0"`.
/// The token is returned verbatim.
pub fn scan(source: &str) -> Option<String> {
  source.lines().find_map(scan_line)
}

fn scan_line(line: &str) -> Option<String> {
  let code = strip_comment(line);
  let lower = code.to_ascii_lowercase();

  lower
    .match_indices("version")
    .filter(|(at, _)| !code[..*at].ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_'))
    .find_map(|(at, keyword)| assignment_value(&code[at + keyword.len()..]))
}

/// The quoted literal of `= '...'` at the start of `rest`, if non-empty.
fn assignment_value(rest: &str) -> Option<String> {
  let rest = rest.trim_start().strip_prefix('=')?.trim_start();

  let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
  let body = &rest[1..];
  let end = body.find(quote)?;
  let token = &body[..end];

  if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Drop a trailing `!` comment; a `!` inside a character literal is kept.
fn strip_comment(line: &str) -> &str {
  let mut quote = None;
  for (at, c) in line.char_indices() {
    match (quote, c) {
      (None, '!') => return &line[..at],
      (None, '\'' | '"') => quote = Some(c),
      (Some(open), _) if c == open => quote = None,
      _ => {}
    }
  }
  line
}

/// Read `path` and extract its version token.
pub fn extract(path: &Path) -> Result<String, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSource {
    path: path.to_path_buf(),
    source,
  })?;

  scan(&content).ok_or_else(|| ConfigError::MissingVersion {
    path: path.to_path_buf(),
  })
}
