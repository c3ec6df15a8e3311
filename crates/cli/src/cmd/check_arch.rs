//! Implementation of the `varbuild check-architecture` command.

use std::path::Path;

use anyhow::{Context, Result};

use varbuild_lib::arch::{self, MismatchPolicy};
use varbuild_lib::tree_lock::{LockMode, TreeLock};

use super::load_project;
use crate::output::{OutputFormat, print_json, print_stat, print_success, print_unit, print_warning, symbols};

/// Scan the object directory without building.
///
/// Exits non-zero only when a mismatch is found and the platform treats it as fatal.
pub fn cmd_check_architecture(manifest_path: &Path, output: OutputFormat) -> Result<()> {
  let (manifest, platform) = load_project(manifest_path)?;
  let object_dir = manifest.object_dir();

  let _lock =
    TreeLock::acquire(&object_dir, LockMode::Shared, "check-architecture").context("Failed to acquire tree lock")?;

  let report = arch::verify(&object_dir, &platform, manifest.strict_architecture)?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    println!();
    for object in &report.mismatched {
      let built = object
        .mtime
        .map(|t| format!(", built {}", humantime::format_rfc3339_seconds(t)))
        .unwrap_or_default();
      let width = object.compiled_for.map(|w| w.to_string()).unwrap_or_default();
      print_unit(symbols::ERROR, &object.unit_name, &format!("{}-bit{}", width, built));
    }
    for path in &report.unknown {
      print_unit(symbols::SKIPPED, &path.display().to_string(), "unrecognised header");
    }

    match (report.mismatch_count(), report.policy) {
      (0, _) => print_success(&format!("All objects match {}-bit", report.expected)),
      (count, MismatchPolicy::Warn) => print_warning(&format!(
        "{} object file(s) were not compiled for {}-bit (not fatal on {})",
        count, report.expected, platform.family
      )),
      (_, MismatchPolicy::Fatal) => {}
    }
    print_stat("Platform", &platform.to_string());
    print_stat("Objects scanned", &report.scanned.to_string());
    print_stat("Mismatched", &report.mismatch_count().to_string());
  }

  report.into_result()?;

  Ok(())
}
