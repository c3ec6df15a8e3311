use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Compiler families with distinct flag spellings and runtime libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
  Gnu,
  Intel,
}

impl Toolchain {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gnu => "gnu",
      Self::Intel => "intel",
    }
  }
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A compiler invocation prefix, e.g. `gfortran` or `mpif90 -fc=ifort`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl CompilerCommand {
  /// Split a command string on whitespace. Returns `None` for a blank string.
  pub fn parse(command: &str) -> Option<Self> {
    let mut tokens = command.split_whitespace().map(str::to_string);
    let program = tokens.next()?;
    Some(Self {
      program,
      args: tokens.collect(),
    })
  }

  /// Identify the toolchain family from the command tokens.
  ///
  /// Any token whose file stem starts with `ifort` or `ifx` marks an Intel
  /// toolchain, so wrappers such as `mpif90 -fc=ifort` are classified too.
  pub fn toolchain(&self) -> Toolchain {
    let is_intel = std::iter::once(&self.program).chain(self.args.iter()).any(|token| {
      let value = token.rsplit('=').next().unwrap_or(token);
      let stem = Path::new(value)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
      stem.starts_with("ifort") || stem.starts_with("ifx")
    });

    if is_intel { Toolchain::Intel } else { Toolchain::Gnu }
  }
}

impl fmt::Display for CompilerCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}
