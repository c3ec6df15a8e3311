//! Variant registry.
//!
//! A variant is a named, mutually exclusive compiler configuration. Exactly one
//! variant's flag set is bound per compile-and-link sequence; `release` is not a
//! flag set but a composite recipe that runs `check` and then `optimized`.

pub mod flags;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::{Platform, Toolchain};

pub use flags::FlagSet;

/// Identifier accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantId {
  Check,
  Optimized,
  Release,
}

impl VariantId {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Check => "check",
      Self::Optimized => "optimized",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for VariantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for VariantId {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "check" => Ok(Self::Check),
      "optimized" | "o3" => Ok(Self::Optimized),
      "release" => Ok(Self::Release),
      _ => Err(ConfigError::UnknownVariant(s.to_string())),
    }
  }
}

/// A compile variant: the flags for each toolchain plus the artifact suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
  pub id: VariantId,
  pub suffix: &'static str,
  gnu_flags: &'static [&'static str],
  intel_flags: &'static [&'static str],
}

impl Variant {
  /// Base flags for the given toolchain, before platform adjustments.
  pub fn flags_for(&self, toolchain: Toolchain) -> &'static [&'static str] {
    match toolchain {
      Toolchain::Gnu => self.gnu_flags,
      Toolchain::Intel => self.intel_flags,
    }
  }

  /// Assemble the complete flag set for a platform.
  pub fn flag_set(&self, platform: &Platform) -> FlagSet {
    FlagSet::assemble(self, platform)
  }
}

/// Maximal runtime checking: bounds, floating point traps and tracebacks.
pub const CHECK: Variant = Variant {
  id: VariantId::Check,
  suffix: "-check",
  gnu_flags: &[
    "-O0",
    "-g",
    "-fbacktrace",
    "-fcheck=all",
    "-ffpe-trap=invalid,zero,overflow,underflow",
    "-finit-real=snan",
    "-Wall",
  ],
  intel_flags: &["-O0", "-g", "-traceback", "-check", "all", "-fpe0", "-warn", "all"],
};

/// High optimization with array bounds checking retained.
pub const OPTIMIZED: Variant = Variant {
  id: VariantId::Optimized,
  suffix: "-o3",
  gnu_flags: &["-O3", "-fcheck=bounds"],
  intel_flags: &["-O3", "-check", "bounds"],
};

/// Result of resolving a variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
  Single(Variant),
  /// Clean, build `check`, clean, build `optimized`, promote.
  Composite,
}

impl VariantId {
  pub fn resolve(self) -> Resolved {
    match self {
      Self::Check => Resolved::Single(CHECK),
      Self::Optimized => Resolved::Single(OPTIMIZED),
      Self::Release => Resolved::Composite,
    }
  }
}

/// Resolve a variant by name.
pub fn resolve(name: &str) -> Result<Resolved, ConfigError> {
  Ok(name.parse::<VariantId>()?.resolve())
}
