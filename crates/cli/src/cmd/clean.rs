use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;

use varbuild_lib::clean::{CleanScope, clean};
use varbuild_lib::tree_lock::{LockMode, TreeLock};

use super::load_project;
use crate::output::{OutputFormat, format_bytes, format_duration, print_info, print_json, print_stat, print_success};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
  /// Object and module files in the object directory
  All,
  /// Executables built with the check variant
  Check,
  /// Executables built with the optimized variant
  Optimized,
}

impl From<ScopeArg> for CleanScope {
  fn from(scope: ScopeArg) -> Self {
    match scope {
      ScopeArg::All => CleanScope::All,
      ScopeArg::Check => CleanScope::Check,
      ScopeArg::Optimized => CleanScope::Optimized,
    }
  }
}

pub fn cmd_clean(scope: ScopeArg, manifest_path: &Path, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let scope = CleanScope::from(scope);

  let (manifest, platform) = load_project(manifest_path)?;
  let _lock = TreeLock::acquire(&manifest.object_dir(), LockMode::Exclusive, &format!("clean --scope {}", scope))
    .context("Failed to acquire tree lock")?;

  let result = clean(&manifest, &platform, scope)?;

  if output.is_json() {
    print_json(&result)?;
  } else {
    println!();
    if result.stats.total_deleted() == 0 {
      print_info(&format!("Nothing to clean for scope '{}'", scope));
    } else {
      print_success(&format!("Clean ({}) complete!", scope));
    }
    match scope {
      CleanScope::All => {
        print_stat("Objects removed", &result.stats.objects_deleted.to_string());
        print_stat("Modules removed", &result.stats.modules_deleted.to_string());
      }
      CleanScope::Check | CleanScope::Optimized => {
        print_stat("Executables removed", &result.stats.executables_deleted.to_string());
      }
    }
    print_stat("Space freed", &format_bytes(result.stats.bytes_freed));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
