//! Scoped removal of build products.
//!
//! `all` removes the intermediate object cache; `check` and `optimized` remove
//! only that variant's final executables. The scopes never overlap.

use std::fmt;
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{OBJECT_EXT, STAMP_FILE};
use crate::manifest::ProjectManifest;
use crate::platform::Platform;
use crate::variant::{CHECK, OPTIMIZED};

/// Fortran module interface files written next to the objects.
const MODULE_EXT: &str = "mod";

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to read directory {}: {source}", path.display())]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to delete {}: {source}", path.display())]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanScope {
  All,
  Check,
  Optimized,
}

impl CleanScope {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::All => "all",
      Self::Check => "check",
      Self::Optimized => "optimized",
    }
  }
}

impl fmt::Display for CleanScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Default, Serialize)]
pub struct CleanStats {
  pub objects_deleted: usize,
  pub modules_deleted: usize,
  pub executables_deleted: usize,
  pub bytes_freed: u64,
}

impl CleanStats {
  pub fn total_deleted(&self) -> usize {
    self.objects_deleted + self.modules_deleted + self.executables_deleted
  }
}

#[derive(Debug, Serialize)]
pub struct CleanResult {
  pub scope: CleanScope,
  pub stats: CleanStats,
  pub deleted_paths: Vec<PathBuf>,
}

/// Remove the build products covered by `scope`.
///
/// A missing directory is already clean. The tree lock file is never removed.
pub fn clean(manifest: &ProjectManifest, platform: &Platform, scope: CleanScope) -> Result<CleanResult, CleanError> {
  let mut stats = CleanStats::default();
  let mut deleted_paths = Vec::new();

  match scope {
    CleanScope::All => sweep_objects(&manifest.object_dir(), &mut stats, &mut deleted_paths)?,
    CleanScope::Check | CleanScope::Optimized => {
      let suffix = match scope {
        CleanScope::Check => CHECK.suffix,
        _ => OPTIMIZED.suffix,
      };
      let pattern = ExecutablePattern {
        prefix: format!("{}-", manifest.name),
        ending: format!("-{}{}{}", platform.tag(), suffix, platform.family.exe_suffix()),
      };
      sweep_executables(&manifest.output_dir(), &pattern, &mut stats, &mut deleted_paths)?;
    }
  }

  info!(
    scope = %scope,
    deleted = stats.total_deleted(),
    bytes_freed = stats.bytes_freed,
    "clean complete"
  );

  Ok(CleanResult {
    scope,
    stats,
    deleted_paths,
  })
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, CleanError> {
  let read_err = |source| CleanError::ReadDir {
    path: dir.to_path_buf(),
    source,
  };

  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(read_err(e)),
  };

  let mut files = Vec::new();
  for entry in entries {
    let path = entry.map_err(read_err)?.path();
    if path.is_file() {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

fn delete(path: PathBuf, deleted_paths: &mut Vec<PathBuf>) -> Result<u64, CleanError> {
  let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
  fs::remove_file(&path).map_err(|source| CleanError::Delete {
    path: path.clone(),
    source,
  })?;
  debug!(path = %path.display(), "removed");
  deleted_paths.push(path);
  Ok(size)
}

fn sweep_objects(object_dir: &Path, stats: &mut CleanStats, deleted_paths: &mut Vec<PathBuf>) -> Result<(), CleanError> {
  for path in list_files(object_dir)? {
    let ext = path.extension().and_then(|e| e.to_str());
    let is_stamp = path.file_name().and_then(|n| n.to_str()) == Some(STAMP_FILE);

    if ext == Some(OBJECT_EXT) {
      stats.bytes_freed += delete(path, deleted_paths)?;
      stats.objects_deleted += 1;
    } else if ext == Some(MODULE_EXT) {
      stats.bytes_freed += delete(path, deleted_paths)?;
      stats.modules_deleted += 1;
    } else if is_stamp {
      delete(path, deleted_paths)?;
    }
  }
  Ok(())
}

/// Matches `<name>-<any version>-<tag><suffix><ext>`.
struct ExecutablePattern {
  prefix: String,
  ending: String,
}

impl ExecutablePattern {
  fn matches(&self, file_name: &str) -> bool {
    file_name.len() > self.prefix.len() + self.ending.len()
      && file_name.starts_with(&self.prefix)
      && file_name.ends_with(&self.ending)
  }
}

fn sweep_executables(
  output_dir: &Path,
  pattern: &ExecutablePattern,
  stats: &mut CleanStats,
  deleted_paths: &mut Vec<PathBuf>,
) -> Result<(), CleanError> {
  for path in list_files(output_dir)? {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
      continue;
    };
    if pattern.matches(file_name) {
      stats.bytes_freed += delete(path, deleted_paths)?;
      stats.executables_deleted += 1;
    }
  }
  Ok(())
}
