//! Output artifact naming and promotion.

pub mod version;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::platform::Platform;
use crate::variant::{Variant, VariantId};

#[derive(Debug, Error)]
pub enum StagingError {
  #[error("cannot promote: optimized artifact not found at {}", path.display())]
  MissingArtifact { path: PathBuf },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A linked executable produced by one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
  pub executable: PathBuf,
  pub version: String,
  pub platform: String,
  pub variant: VariantId,
}

/// Deterministic file name: `<base>-<version>-<family><bits><suffix><ext>`.
pub fn name(base: &str, version: &str, platform: &Platform, variant: &Variant) -> String {
  format_name(base, version, platform, variant.suffix)
}

/// The suffix-free name downstream consumers reference.
pub fn canonical_name(base: &str, version: &str, platform: &Platform) -> String {
  format_name(base, version, platform, "")
}

fn format_name(base: &str, version: &str, platform: &Platform, suffix: &str) -> String {
  format!(
    "{}-{}-{}{}{}",
    base,
    version,
    platform.tag(),
    suffix,
    platform.family.exe_suffix()
  )
}

/// Copy the optimized artifact to its canonical name in the same directory.
///
/// The source is preserved, and repeating the promotion yields the same result.
/// The copy goes through a temporary file so a reader never sees a partial executable.
pub fn promote(optimized: &Path, canonical: &Path) -> Result<PathBuf, StagingError> {
  if !optimized.is_file() {
    return Err(StagingError::MissingArtifact {
      path: optimized.to_path_buf(),
    });
  }

  let copy_err = |source| StagingError::Copy {
    from: optimized.to_path_buf(),
    to: canonical.to_path_buf(),
    source,
  };

  let dir = canonical.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  let staged = tempfile::NamedTempFile::new_in(dir).map_err(copy_err)?;
  std::fs::copy(optimized, staged.path()).map_err(copy_err)?;
  staged.persist(canonical).map_err(|e| copy_err(e.error))?;

  info!(from = %optimized.display(), to = %canonical.display(), "promoted artifact");

  Ok(canonical.to_path_buf())
}
