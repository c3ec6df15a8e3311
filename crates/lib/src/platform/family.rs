use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system families the build can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
  Linux,
  Windows,
}

impl Family {
  /// Classify from the value of the `OS` indicator variable.
  ///
  /// Only `Windows_NT` selects Windows. An absent indicator is meaningful and
  /// selects Linux.
  pub fn from_indicator(value: Option<&str>) -> Self {
    match value {
      Some(v) if v.trim().eq_ignore_ascii_case("windows_nt") => Self::Windows,
      _ => Self::Linux,
    }
  }

  /// Returns the lowercase string identifier for this family
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Windows => "windows",
    }
  }

  /// File extension appended to linked executables.
  pub fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Linux => "",
      Self::Windows => ".exe",
    }
  }
}

impl fmt::Display for Family {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
