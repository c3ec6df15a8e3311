use std::fmt;

use serde::{Deserialize, Serialize};

/// Word width the objects and executable are compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
  #[serde(rename = "32")]
  W32,
  #[serde(rename = "64")]
  W64,
}

impl BitWidth {
  /// Classify from the MSYS2 session variable (`MSYSTEM`).
  ///
  /// Only the 32-bit environments select `W32`; a missing session defaults to 64-bit.
  pub fn from_session(value: Option<&str>) -> Self {
    match value.map(|v| v.trim().to_ascii_uppercase()) {
      Some(v) if v == "MINGW32" || v == "CLANG32" => Self::W32,
      _ => Self::W64,
    }
  }

  pub fn bits(&self) -> u32 {
    match self {
      Self::W32 => 32,
      Self::W64 => 64,
    }
  }
}

impl fmt::Display for BitWidth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.bits())
  }
}
