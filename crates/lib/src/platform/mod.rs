pub mod family;
pub mod toolchain;
pub mod width;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_COMPILER, ENV_COMPILER, ENV_MSYSTEM, ENV_OS};
use crate::error::ConfigError;

pub use family::Family;
pub use toolchain::{CompilerCommand, Toolchain};
pub use width::BitWidth;

/// The host platform and toolchain, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
  pub family: Family,
  pub bit_width: BitWidth,
  pub toolchain: Toolchain,
  pub compiler: CompilerCommand,
}

impl Platform {
  /// Create a platform for the default GNU compiler.
  pub fn new(family: Family, bit_width: BitWidth) -> Self {
    let compiler = CompilerCommand {
      program: DEFAULT_COMPILER.to_string(),
      args: Vec::new(),
    };
    Self {
      family,
      bit_width,
      toolchain: compiler.toolchain(),
      compiler,
    }
  }

  /// Detect the platform from the process environment.
  ///
  /// `fallback_compiler` is used when `FC` is unset.
  pub fn detect(fallback_compiler: &str) -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok(), fallback_compiler)
  }

  /// Detect the platform from an arbitrary variable lookup.
  ///
  /// Linux is always 64-bit; the MSYS2 session only decides the width on Windows.
  pub fn from_lookup<F>(lookup: F, fallback_compiler: &str) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let family = Family::from_indicator(lookup(ENV_OS).as_deref());

    let bit_width = match family {
      Family::Windows => BitWidth::from_session(lookup(ENV_MSYSTEM).as_deref()),
      Family::Linux => BitWidth::W64,
    };

    let compiler = match lookup(ENV_COMPILER) {
      Some(value) => CompilerCommand::parse(&value).ok_or(ConfigError::MissingSignal(ENV_COMPILER))?,
      None => CompilerCommand::parse(fallback_compiler).ok_or(ConfigError::MissingSignal(ENV_COMPILER))?,
    };

    let platform = Self {
      family,
      bit_width,
      toolchain: compiler.toolchain(),
      compiler,
    };

    debug!(platform = %platform, compiler = %platform.compiler, "detected platform");

    Ok(platform)
  }

  /// Short tag used in artifact names (e.g. "linux64").
  pub fn tag(&self) -> String {
    format!("{}{}", self.family, self.bit_width)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.tag(), self.toolchain)
  }
}
