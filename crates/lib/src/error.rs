//! Configuration errors shared by detection, variant resolution and naming.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. These are surfaced immediately and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unknown variant '{0}' (expected one of: check, optimized, release)")]
  UnknownVariant(String),

  #[error("environment variable {0} is set but empty")]
  MissingSignal(&'static str),

  #[error("no version assignment found in {}", path.display())]
  MissingVersion { path: PathBuf },

  #[error("failed to read {}: {source}", path.display())]
  ReadSource {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
