//! Architecture consistency checking.
//!
//! Before a link is trusted, every object in the object directory is scanned for
//! its compiled word width. Objects built for another width must never be linked
//! together. The checker only inspects; remediation is an explicit
//! `clean --scope=all`.

pub mod marker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::OBJECT_EXT;
use crate::platform::{BitWidth, Family, Platform};

/// A compiled object found in the object directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectArtifact {
  pub unit_name: String,
  /// `None` when the header could not be decoded.
  pub compiled_for: Option<BitWidth>,
  pub path: PathBuf,
  #[serde(skip)]
  pub mtime: Option<SystemTime>,
}

#[derive(Debug, Error)]
pub enum ArchitectureError {
  #[error(
    "{count} object file(s) were not compiled for {expected}-bit; \
     remove all artifacts with `varbuild clean --scope=all` and rebuild"
  )]
  Mismatch { count: usize, expected: BitWidth },

  #[error("failed to scan object directory {}: {source}", path.display())]
  Scan {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Count objects whose width disagrees with `expected`.
///
/// Objects with an unrecognised header are not counted.
pub fn check(objects: &[ObjectArtifact], expected: BitWidth) -> Result<(), ArchitectureError> {
  let count = objects
    .iter()
    .filter(|o| o.compiled_for.is_some_and(|w| w != expected))
    .count();

  if count == 0 {
    Ok(())
  } else {
    Err(ArchitectureError::Mismatch { count, expected })
  }
}

/// Read every object file in `object_dir`, sorted by unit name.
///
/// A missing directory yields no objects.
pub fn scan_objects(object_dir: &Path) -> Result<Vec<ObjectArtifact>, ArchitectureError> {
  let scan_err = |source| ArchitectureError::Scan {
    path: object_dir.to_path_buf(),
    source,
  };

  if !object_dir.exists() {
    return Ok(Vec::new());
  }

  let mut objects = Vec::new();
  for entry in std::fs::read_dir(object_dir).map_err(scan_err)? {
    let path = entry.map_err(scan_err)?.path();
    if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(OBJECT_EXT) {
      continue;
    }

    let Some(unit_name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
      continue;
    };

    let compiled_for = marker::read(&path).map_err(scan_err)?;
    if compiled_for.is_none() {
      warn!(path = %path.display(), "unrecognised object header, skipping");
    }

    let mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
    objects.push(ObjectArtifact {
      unit_name,
      compiled_for,
      path,
      mtime,
    });
  }

  objects.sort_by(|a, b| a.unit_name.cmp(&b.unit_name));
  debug!(dir = %object_dir.display(), count = objects.len(), "scanned object files");

  Ok(objects)
}

/// Whether a mismatch aborts the build on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
  Fatal,
  Warn,
}

impl MismatchPolicy {
  /// Fatal on Windows, where 32- and 64-bit toolchains share a tree. On Linux only
  /// 64-bit is supported, so a mismatch is reported but not fatal unless `strict`.
  pub fn for_platform(platform: &Platform, strict: bool) -> Self {
    match platform.family {
      Family::Windows => Self::Fatal,
      Family::Linux if strict => Self::Fatal,
      Family::Linux => Self::Warn,
    }
  }
}

/// Outcome of a policy-aware architecture check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
  pub expected: BitWidth,
  pub policy: MismatchPolicy,
  pub scanned: usize,
  pub mismatched: Vec<ObjectArtifact>,
  pub unknown: Vec<PathBuf>,
}

impl CheckReport {
  pub fn mismatch_count(&self) -> usize {
    self.mismatched.len()
  }

  /// True when the check must abort the build.
  pub fn is_fatal(&self) -> bool {
    self.policy == MismatchPolicy::Fatal && !self.mismatched.is_empty()
  }

  pub fn into_result(self) -> Result<Self, ArchitectureError> {
    if self.is_fatal() {
      Err(ArchitectureError::Mismatch {
        count: self.mismatch_count(),
        expected: self.expected,
      })
    } else {
      Ok(self)
    }
  }
}

/// Scan `object_dir` and apply the platform's mismatch policy.
///
/// Never fails for a mismatch; callers decide via [`CheckReport::is_fatal`].
pub fn verify(object_dir: &Path, platform: &Platform, strict: bool) -> Result<CheckReport, ArchitectureError> {
  let objects = scan_objects(object_dir)?;
  let expected = platform.bit_width;
  let policy = MismatchPolicy::for_platform(platform, strict);

  let unknown = objects
    .iter()
    .filter(|o| o.compiled_for.is_none())
    .map(|o| o.path.clone())
    .collect();

  let scanned = objects.len();
  let mismatched: Vec<ObjectArtifact> = match check(&objects, expected) {
    Ok(()) => Vec::new(),
    Err(_) => objects
      .into_iter()
      .filter(|o| o.compiled_for.is_some_and(|w| w != expected))
      .collect(),
  };

  if !mismatched.is_empty() {
    match policy {
      MismatchPolicy::Fatal => {
        warn!(count = mismatched.len(), expected = %expected, "architecture mismatch in object directory")
      }
      MismatchPolicy::Warn => {
        warn!(count = mismatched.len(), expected = %expected, "architecture mismatch ignored on this platform")
      }
    }
  }

  Ok(CheckReport {
    expected,
    policy,
    scanned,
    mismatched,
    unknown,
  })
}
