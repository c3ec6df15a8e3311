//! Implementation of the `varbuild build` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use varbuild_lib::execute::{BuildReport, ReleaseReport, UnitStatus, build_variant, release};
use varbuild_lib::platform::Platform;
use varbuild_lib::tree_lock::{LockMode, TreeLock};
use varbuild_lib::variant::{Resolved, VariantId};

use super::{execute_config, load_project};
use crate::output::{
  OutputFormat, format_duration, print_json, print_stat, print_success, print_unit, print_warning, symbols,
};

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Variant to build: check, optimized or release
  #[arg(long, required_unless_present = "release", conflicts_with = "release")]
  pub variant: Option<String>,

  /// Run the release recipe (check, then optimized, then promote)
  #[arg(long)]
  pub release: bool,

  /// Keep compiling independent units after a failure
  #[arg(long)]
  pub best_effort: bool,

  /// Maximum number of parallel compiles with --best-effort
  #[arg(short, long)]
  pub jobs: Option<usize>,
}

/// Execute the build command.
///
/// Exits non-zero when the build ends in the `Failed` state, even if an
/// executable was written.
pub fn cmd_build(args: BuildArgs, manifest_path: &Path, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let id = if args.release {
    VariantId::Release
  } else {
    args.variant.as_deref().unwrap_or_default().parse::<VariantId>()?
  };

  let (manifest, platform) = load_project(manifest_path)?;
  let config = execute_config(&manifest, args.jobs, args.best_effort)?;

  let _lock = TreeLock::acquire(&manifest.object_dir(), LockMode::Exclusive, &format!("build --variant {}", id))
    .context("Failed to acquire tree lock")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  match id.resolve() {
    Resolved::Single(variant) => {
      let report = rt.block_on(build_variant(&manifest, &platform, &variant, &config))?;
      if output.is_json() {
        print_json(&report)?;
      } else {
        print_report(&report, &platform);
        print_stat("Duration", &format_duration(start.elapsed()));
      }
      report.into_result()?;
    }
    Resolved::Composite => {
      let report = rt.block_on(release(&manifest, &platform, &config))?;
      if output.is_json() {
        print_json(&report)?;
      } else {
        print_release(&report, &platform);
        print_stat("Duration", &format_duration(start.elapsed()));
      }
      report.into_result()?;
    }
  }

  Ok(())
}

fn print_report(report: &BuildReport, platform: &Platform) {
  println!();
  println!("Building {} for {}", report.variant, platform);

  for unit in &report.units {
    match &unit.status {
      UnitStatus::Compiled { reason } => print_unit(symbols::SUCCESS, &unit.name, &format!("compiled ({})", reason)),
      UnitStatus::UpToDate => print_unit(symbols::INFO, &unit.name, "up to date"),
      UnitStatus::Failed { error } => print_unit(symbols::ERROR, &unit.name, &error.to_string()),
      UnitStatus::NotAttempted => print_unit(symbols::SKIPPED, &unit.name, "not attempted"),
    }
  }

  if let Some(check) = &report.architecture
    && check.mismatch_count() > 0
    && !check.is_fatal()
  {
    print_warning(&format!(
      "{} object file(s) were not compiled for {}-bit",
      check.mismatch_count(),
      check.expected
    ));
  }

  println!();
  if report.is_success() {
    print_success(&format!("Build {} complete", report.variant));
  }
  print_stat("Compiled", &report.compiled().len().to_string());
  print_stat("Up to date", &report.up_to_date().len().to_string());
  if let Some(artifact) = &report.artifact {
    let note = if report.linked { "" } else { " (unchanged)" };
    print_stat("Executable", &format!("{}{}", artifact.executable.display(), note));
  }
}

fn print_release(report: &ReleaseReport, platform: &Platform) {
  print_report(&report.check, platform);
  if let Some(optimized) = &report.optimized {
    print_report(optimized, platform);
  }
  if let Some(promoted) = &report.promoted {
    println!();
    print_success("Release complete");
    print_stat("Canonical", &format!("{} {}", symbols::ARROW, promoted.display()));
  }
}
