//! Unit dependency graph.
//!
//! The graph is a declarative table: each unit lists the shared declaration
//! files it reads, and the link order is the manifest order. Platform- and
//! toolchain-specific implementations of the same role are substituted once,
//! when the link set is built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::debug;

use crate::consts::OBJECT_EXT;
use crate::manifest::{ProjectManifest, UnitEntry};
use crate::platform::Platform;

/// One compilable source file and the shared files it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationUnit {
  pub name: String,
  pub source: PathBuf,
  pub depends_on: Vec<PathBuf>,
  pub role: Option<String>,
}

/// Why a unit must be recompiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "path", rename_all = "snake_case")]
pub enum Staleness {
  /// No object file exists yet.
  Missing,
  /// Existing objects were compiled with a different flag set.
  FlagsChanged,
  SourceNewer,
  DependencyNewer(PathBuf),
  /// An input could not be inspected; recompiling surfaces the real error.
  Unreadable(PathBuf),
}

impl fmt::Display for Staleness {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Missing => write!(f, "no object file"),
      Self::FlagsChanged => write!(f, "flags changed"),
      Self::SourceNewer => write!(f, "source changed"),
      Self::DependencyNewer(path) => write!(f, "{} changed", path.display()),
      Self::Unreadable(path) => write!(f, "cannot read {}", path.display()),
    }
  }
}

impl CompilationUnit {
  /// Path of this unit's object file inside `object_dir`.
  pub fn object_path(&self, object_dir: &Path) -> PathBuf {
    object_dir.join(format!("{}.{}", self.name, OBJECT_EXT))
  }

  /// Returns why the unit is out of date relative to an object built at `last_build`.
  ///
  /// `None` means the existing object is current. An input is newer only when its
  /// modification time is strictly later than the object's.
  pub fn staleness(&self, last_build: Option<SystemTime>) -> Option<Staleness> {
    let Some(built) = last_build else {
      return Some(Staleness::Missing);
    };

    match modified(&self.source) {
      Some(mtime) if mtime > built => return Some(Staleness::SourceNewer),
      Some(_) => {}
      None => return Some(Staleness::Unreadable(self.source.clone())),
    }

    for dep in &self.depends_on {
      match modified(dep) {
        Some(mtime) if mtime > built => return Some(Staleness::DependencyNewer(dep.clone())),
        Some(_) => {}
        None => return Some(Staleness::Unreadable(dep.clone())),
      }
    }

    None
  }

  /// True if the unit must be recompiled.
  pub fn invalidated(&self, last_build: Option<SystemTime>) -> bool {
    self.staleness(last_build).is_some()
  }

  pub fn depends_on_file(&self, shared: &Path) -> bool {
    self.depends_on.iter().any(|d| d == shared)
  }
}

fn modified(path: &Path) -> Option<SystemTime> {
  std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Modification time of an existing object file, if any.
pub fn object_mtime(path: &Path) -> Option<SystemTime> {
  modified(path)
}

/// The platform-resolved, ordered list of units composing the executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSet {
  pub units: Vec<CompilationUnit>,
}

impl LinkSet {
  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  pub fn names(&self) -> Vec<&str> {
    self.units.iter().map(|u| u.name.as_str()).collect()
  }

  pub fn get(&self, name: &str) -> Option<&CompilationUnit> {
    self.units.iter().find(|u| u.name == name)
  }

  /// Object paths in link order.
  pub fn object_paths(&self, object_dir: &Path) -> Vec<PathBuf> {
    self.units.iter().map(|u| u.object_path(object_dir)).collect()
  }

  /// Units whose dependency set lists the given shared file.
  pub fn dependents_of(&self, shared: &Path) -> Vec<&str> {
    self
      .units
      .iter()
      .filter(|u| u.depends_on_file(shared))
      .map(|u| u.name.as_str())
      .collect()
  }
}

/// Static unit table loaded from the manifest, with paths resolved.
#[derive(Debug, Clone)]
pub struct UnitGraph {
  entries: Vec<UnitEntry>,
}

impl UnitGraph {
  pub fn from_manifest(manifest: &ProjectManifest) -> Self {
    let entries = manifest
      .units
      .iter()
      .map(|entry| UnitEntry {
        source: manifest.resolve(&entry.source),
        depends_on: entry.depends_on.iter().map(|d| manifest.resolve(d)).collect(),
        ..entry.clone()
      })
      .collect();

    Self { entries }
  }

  /// Substitute the platform- and toolchain-specific units and return the full link order.
  pub fn link_set(&self, platform: &Platform) -> LinkSet {
    let units: Vec<CompilationUnit> = self
      .entries
      .iter()
      .filter(|entry| entry.selected_for(platform.family, platform.toolchain))
      .map(|entry| CompilationUnit {
        name: entry.name.clone(),
        source: entry.source.clone(),
        depends_on: entry.depends_on.clone(),
        role: entry.role.clone(),
      })
      .collect();

    debug!(platform = %platform, units = units.len(), "resolved link set");

    LinkSet { units }
  }
}
