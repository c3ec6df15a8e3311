//! Types for the project manifest (`varbuild.toml`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_OBJECT_DIR;
use crate::platform::{Family, Toolchain};

/// One `[[unit]]` entry.
///
/// A unit with a `role` and a selector is one of several interchangeable
/// implementations of the same logical capability; exactly one implementation
/// per role is chosen for a given platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitEntry {
  pub name: String,
  pub source: PathBuf,

  /// Shared declaration files (modules, includes) this unit reads.
  #[serde(default)]
  pub depends_on: Vec<PathBuf>,

  #[serde(default)]
  pub role: Option<String>,

  /// Selected only when the compiler belongs to this toolchain.
  #[serde(default)]
  pub toolchain: Option<Toolchain>,

  /// Selected only when building for this OS family.
  #[serde(default)]
  pub family: Option<Family>,
}

impl UnitEntry {
  /// Whether this entry takes part in a build for the given family and toolchain.
  pub fn selected_for(&self, family: Family, toolchain: Toolchain) -> bool {
    self.toolchain.is_none_or(|t| t == toolchain) && self.family.is_none_or(|f| f == family)
  }
}

/// The parsed project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
  /// Base name of the produced executables.
  pub name: String,

  /// Main program source, scanned for the version token.
  pub main: PathBuf,

  #[serde(default = "default_object_dir")]
  pub object_dir: PathBuf,

  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,

  /// Compiler command used when `FC` is unset.
  #[serde(default)]
  pub compiler: Option<String>,

  /// Worker pool size for compilation.
  #[serde(default)]
  pub jobs: Option<usize>,

  /// Treat architecture mismatches as fatal on every platform family.
  #[serde(default)]
  pub strict_architecture: bool,

  /// Units in link order.
  #[serde(rename = "unit", default)]
  pub units: Vec<UnitEntry>,

  /// Directory the manifest was loaded from; relative paths resolve against it.
  #[serde(skip)]
  pub root: PathBuf,
}

fn default_object_dir() -> PathBuf {
  PathBuf::from(DEFAULT_OBJECT_DIR)
}

fn default_output_dir() -> PathBuf {
  PathBuf::from(".")
}
