//! Implementation of the `varbuild describe-environment` command.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use varbuild_lib::consts::DEFAULT_COMPILER;
use varbuild_lib::manifest::ProjectManifest;
use varbuild_lib::platform::{BitWidth, Family, Platform, Toolchain};
use varbuild_lib::variant::{CHECK, OPTIMIZED};

use crate::output::{OutputFormat, print_error, print_json, print_stat};

#[derive(Debug, Serialize)]
struct Environment {
  family: Family,
  bit_width: BitWidth,
  toolchain: Toolchain,
  compiler: String,
  tag: String,
  check_flags: Vec<String>,
  optimized_flags: Vec<String>,
}

impl Environment {
  fn from_platform(platform: &Platform) -> Self {
    Self {
      family: platform.family,
      bit_width: platform.bit_width,
      toolchain: platform.toolchain,
      compiler: platform.compiler.to_string(),
      tag: platform.tag(),
      check_flags: CHECK.flag_set(platform).flags,
      optimized_flags: OPTIMIZED.flag_set(platform).flags,
    }
  }
}

/// Print the detected platform. Always succeeds; detection errors are printed.
///
/// The manifest is optional and only supplies the fallback compiler.
pub fn cmd_describe_environment(manifest_path: &Path, output: OutputFormat) -> Result<()> {
  let compiler = match ProjectManifest::load(manifest_path) {
    Ok(manifest) => manifest.compiler.unwrap_or_else(|| DEFAULT_COMPILER.to_string()),
    Err(e) => {
      debug!(error = %e, "no usable manifest, using default compiler");
      DEFAULT_COMPILER.to_string()
    }
  };

  let platform = match Platform::detect(&compiler) {
    Ok(platform) => platform,
    Err(e) => {
      print_error(&format!("Failed to detect environment: {}", e));
      return Ok(());
    }
  };

  let env = Environment::from_platform(&platform);

  if output.is_json() {
    print_json(&env)?;
  } else {
    println!("varbuild v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print_stat("Platform", &env.tag);
    print_stat("Family", &env.family.to_string());
    print_stat("Bit width", &format!("{}-bit", env.bit_width));
    print_stat("Toolchain", &env.toolchain.to_string());
    print_stat("Compiler", &env.compiler);
    print_stat("Check flags", &env.check_flags.join(" "));
    print_stat("Optimized flags", &env.optimized_flags.join(" "));
  }

  Ok(())
}
