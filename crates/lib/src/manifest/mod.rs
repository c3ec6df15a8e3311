//! Project manifest loading and validation.

mod types;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::platform::{Family, Toolchain};

pub use types::{ProjectManifest, UnitEntry};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("manifest field '{0}' must not be empty")]
  EmptyField(&'static str),

  #[error("manifest declares no units")]
  NoUnits,

  #[error("unit '{0}' is declared more than once")]
  DuplicateUnit(String),

  #[error("unit '{0}' has a toolchain or family selector but no role")]
  SelectorWithoutRole(String),

  #[error("unit '{0}' has both a toolchain and a family selector")]
  ConflictingSelectors(String),

  #[error("role '{role}' resolves to {count} units for {family}/{toolchain} (expected exactly one)")]
  RoleUnresolved {
    role: String,
    family: Family,
    toolchain: Toolchain,
    count: usize,
  },
}

impl ProjectManifest {
  /// Load and validate a manifest from disk.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let root = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };

    let manifest = Self::parse(&content, root).map_err(|e| match e {
      ManifestError::Parse { source, .. } => ManifestError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;

    debug!(path = %path.display(), units = manifest.units.len(), "loaded manifest");

    Ok(manifest)
  }

  /// Parse and validate manifest text, resolving relative paths against `root`.
  pub fn parse(content: &str, root: PathBuf) -> Result<Self, ManifestError> {
    let mut manifest: ProjectManifest = toml::from_str(content).map_err(|source| ManifestError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    manifest.root = root;
    manifest.validate()?;
    Ok(manifest)
  }

  /// Resolve a manifest-relative path.
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }

  pub fn object_dir(&self) -> PathBuf {
    self.resolve(&self.object_dir)
  }

  pub fn output_dir(&self) -> PathBuf {
    self.resolve(&self.output_dir)
  }

  pub fn main_source(&self) -> PathBuf {
    self.resolve(&self.main)
  }

  fn validate(&self) -> Result<(), ManifestError> {
    if self.name.trim().is_empty() {
      return Err(ManifestError::EmptyField("name"));
    }
    if self.main.as_os_str().is_empty() {
      return Err(ManifestError::EmptyField("main"));
    }
    if self.units.is_empty() {
      return Err(ManifestError::NoUnits);
    }

    let mut seen = HashSet::new();
    let mut roles: BTreeMap<&str, Vec<&UnitEntry>> = BTreeMap::new();

    for unit in &self.units {
      if unit.name.trim().is_empty() {
        return Err(ManifestError::EmptyField("unit.name"));
      }
      if !seen.insert(unit.name.as_str()) {
        return Err(ManifestError::DuplicateUnit(unit.name.clone()));
      }
      if unit.toolchain.is_some() && unit.family.is_some() {
        return Err(ManifestError::ConflictingSelectors(unit.name.clone()));
      }
      match &unit.role {
        Some(role) => roles.entry(role.as_str()).or_default().push(unit),
        None if unit.toolchain.is_some() || unit.family.is_some() => {
          return Err(ManifestError::SelectorWithoutRole(unit.name.clone()));
        }
        None => {}
      }
    }

    // Every role must resolve to exactly one implementation on every platform.
    for (role, units) in roles {
      for family in [Family::Linux, Family::Windows] {
        for toolchain in [Toolchain::Gnu, Toolchain::Intel] {
          let count = units.iter().filter(|u| u.selected_for(family, toolchain)).count();
          if count != 1 {
            return Err(ManifestError::RoleUnresolved {
              role: role.to_string(),
              family,
              toolchain,
              count,
            });
          }
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const MINIMAL: &str = r#"
name = "sim"
main = "src/sim.f90"

[[unit]]
name = "sim"
source = "src/sim.f90"
"#;

  #[test]
  fn parse_minimal_manifest_applies_defaults() {
    let manifest = ProjectManifest::parse(MINIMAL, PathBuf::from("/tree")).unwrap();
    assert_eq!(manifest.name, "sim");
    assert_eq!(manifest.object_dir(), PathBuf::from("/tree/obj"));
    assert_eq!(manifest.output_dir(), PathBuf::from("/tree/."));
    assert_eq!(manifest.main_source(), PathBuf::from("/tree/src/sim.f90"));
    assert!(!manifest.strict_architecture);
    assert!(manifest.compiler.is_none());
  }

  #[test]
  fn parse_rejects_unknown_fields() {
    let content = format!("flavour = \"spicy\"\n{}", MINIMAL);
    let err = ProjectManifest::parse(&content, PathBuf::from(".")).unwrap_err();
    assert!(matches!(err, ManifestError::Parse { .. }));
  }

  #[test]
  fn no_units_is_rejected() {
    let err = ProjectManifest::parse("name = \"sim\"\nmain = \"sim.f90\"\n", PathBuf::from(".")).unwrap_err();
    assert!(matches!(err, ManifestError::NoUnits));
  }

  #[test]
  fn duplicate_units_are_rejected() {
    let content = format!("{}\n[[unit]]\nname = \"sim\"\nsource = \"other.f90\"\n", MINIMAL);
    let err = ProjectManifest::parse(&content, PathBuf::from(".")).unwrap_err();
    assert!(matches!(err, ManifestError::DuplicateUnit(ref n) if n == "sim"));
  }

  #[test]
  fn selector_without_role_is_rejected() {
    let content = format!(
      "{}\n[[unit]]\nname = \"cmd_gnu\"\nsource = \"cmd_gnu.f90\"\ntoolchain = \"gnu\"\n",
      MINIMAL
    );
    let err = ProjectManifest::parse(&content, PathBuf::from(".")).unwrap_err();
    assert!(matches!(err, ManifestError::SelectorWithoutRole(ref n) if n == "cmd_gnu"));
  }

  #[test]
  fn role_missing_an_implementation_is_rejected() {
    let content = format!(
      "{}\n[[unit]]\nname = \"path_win\"\nsource = \"path_win.f90\"\nrole = \"path_get\"\nfamily = \"windows\"\n",
      MINIMAL
    );
    let err = ProjectManifest::parse(&content, PathBuf::from(".")).unwrap_err();
    assert!(matches!(
      err,
      ManifestError::RoleUnresolved { ref role, family: Family::Linux, count: 0, .. } if role == "path_get"
    ));
  }

  #[test]
  fn conflicting_selectors_are_rejected() {
    let content = format!(
      "{}\n[[unit]]\nname = \"x\"\nsource = \"x.f90\"\nrole = \"r\"\nfamily = \"windows\"\ntoolchain = \"gnu\"\n",
      MINIMAL
    );
    let err = ProjectManifest::parse(&content, PathBuf::from(".")).unwrap_err();
    assert!(matches!(err, ManifestError::ConflictingSelectors(_)));
  }

  #[test]
  fn load_resolves_against_manifest_directory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("varbuild.toml");
    std::fs::write(&path, MINIMAL).unwrap();

    let manifest = ProjectManifest::load(&path).unwrap();
    assert_eq!(manifest.root, temp.path());
    assert_eq!(manifest.object_dir(), temp.path().join("obj"));
  }

  #[test]
  fn load_missing_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing.toml");
    let err = ProjectManifest::load(&path).unwrap_err();
    assert!(err.to_string().contains("missing.toml"));
  }
}
