//! Flag set assembly and the platform side table.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::platform::{BitWidth, Family, Platform};
use crate::variant::{Variant, VariantId};

/// Linker adjustments keyed by platform.
///
/// The MinGW-w64 linker misplaces large static data symbols unless the medium
/// code model is used, so 64-bit Windows builds carry `-mcmodel=medium`.
const PLATFORM_EXTRAS: &[(Family, BitWidth, &[&str])] = &[(Family::Windows, BitWidth::W64, &["-mcmodel=medium"])];

/// Extra flags required by a platform, independent of the variant.
pub fn platform_extras(platform: &Platform) -> &'static [&'static str] {
  PLATFORM_EXTRAS
    .iter()
    .find(|(family, width, _)| *family == platform.family && *width == platform.bit_width)
    .map(|(_, _, extras)| *extras)
    .unwrap_or(&[])
}

/// The ordered compiler options bound for one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
  pub variant: VariantId,
  pub flags: Vec<String>,
}

impl FlagSet {
  /// Variant flags for the platform's toolchain followed by the platform extras.
  pub fn assemble(variant: &Variant, platform: &Platform) -> Self {
    let flags = variant
      .flags_for(platform.toolchain)
      .iter()
      .chain(platform_extras(platform))
      .map(|f| f.to_string())
      .collect();

    Self {
      variant: variant.id,
      flags,
    }
  }

  /// Stable fingerprint of the flag list, used to detect objects built with other flags.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    for flag in &self.flags {
      hasher.update(flag.as_bytes());
      hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
  }

  pub fn as_slice(&self) -> &[String] {
    &self.flags
  }
}
