//! Flag stamp for the object directory.
//!
//! Modification times cannot tell objects compiled with `check` flags from
//! objects compiled with `optimized` flags. The stamp records the flag set, the
//! word width and the link set the current objects were built for; a different
//! or missing flag set invalidates every unit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::STAMP_FILE;
use crate::platform::BitWidth;
use crate::variant::{FlagSet, VariantId};

const STAMP_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagStamp {
  pub version: u32,
  pub variant: VariantId,
  pub bit_width: BitWidth,
  pub fingerprint: String,
  /// Link-set unit names in link order.
  pub units: Vec<String>,
}

impl FlagStamp {
  pub fn new(flags: &FlagSet, bit_width: BitWidth, units: Vec<String>) -> Self {
    Self {
      version: STAMP_VERSION,
      variant: flags.variant,
      bit_width,
      fingerprint: flags.fingerprint(),
      units,
    }
  }

  /// True if both stamps were produced by the same variant and flag list.
  pub fn same_flags(&self, other: &FlagStamp) -> bool {
    self.version == other.version && self.variant == other.variant && self.fingerprint == other.fingerprint
  }
}

/// Read the stamp; an unreadable or malformed stamp counts as absent.
pub fn read(object_dir: &Path) -> Option<FlagStamp> {
  let content = std::fs::read_to_string(object_dir.join(STAMP_FILE)).ok()?;
  match serde_json::from_str(&content) {
    Ok(stamp) => Some(stamp),
    Err(e) => {
      debug!(error = %e, "ignoring malformed flag stamp");
      None
    }
  }
}

pub fn write(object_dir: &Path, stamp: &FlagStamp) -> std::io::Result<()> {
  let content = serde_json::to_string(stamp).map_err(std::io::Error::other)?;
  std::fs::write(object_dir.join(STAMP_FILE), format!("{}\n", content))
}

pub fn remove(object_dir: &Path) -> std::io::Result<()> {
  match std::fs::remove_file(object_dir.join(STAMP_FILE)) {
    Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
    _ => Ok(()),
  }
}
