//! Build orchestration.
//!
//! This module drives a single-variant build through its states and runs the
//! composite `release` recipe. It handles:
//! - Flag-set binding, once per invocation
//! - Incremental compilation of the invalidated subset of the link set
//! - Bounded parallel compilation with fail-fast or best-effort semantics
//! - Linking and the post-link architecture check

pub mod compile;
pub mod stamp;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::arch::{self, ArchitectureError, MismatchPolicy};
use crate::artifact::{self, OutputArtifact};
use crate::clean::{self, CleanScope};
use crate::manifest::ProjectManifest;
use crate::platform::Platform;
use crate::units::{CompilationUnit, LinkSet, Staleness, UnitGraph, object_mtime};
use crate::variant::{CHECK, FlagSet, OPTIMIZED, Variant};

use stamp::FlagStamp;

pub use types::{
  BuildError, BuildReport, BuildState, CompileError, ExecuteConfig, FailureMode, ReleaseReport, UnitRecord, UnitStatus,
};

/// Tracks the current state and the path taken through the state machine.
struct Progress {
  variant: Variant,
  trace: Vec<BuildState>,
}

impl Progress {
  fn new(variant: Variant) -> Self {
    Self {
      variant,
      trace: vec![BuildState::Idle],
    }
  }

  fn advance(&mut self, next: BuildState) {
    let from = self.state();
    debug!(variant = %self.variant.id, from = %from, to = %next, "build state");
    self.trace.push(next);
  }

  fn state(&self) -> BuildState {
    self.trace.last().copied().unwrap_or(BuildState::Idle)
  }
}

/// Build one compile variant of the project.
///
/// Configuration problems are returned as `Err`. Compile, link and architecture
/// failures produce `Ok` with a report in the `Failed` state so callers can see
/// per-unit outcomes; use [`BuildReport::into_result`] to turn them into errors.
pub async fn build_variant(
  manifest: &ProjectManifest,
  platform: &Platform,
  variant: &Variant,
  config: &ExecuteConfig,
) -> Result<BuildReport, BuildError> {
  let mut progress = Progress::new(*variant);
  info!(variant = %variant.id, platform = %platform, "starting build");

  // Detecting: the platform is resolved by the caller; bind the tree's inputs.
  progress.advance(BuildState::Detecting);
  let version = artifact::version::extract(&manifest.main_source())?;
  let link_set = UnitGraph::from_manifest(manifest).link_set(platform);
  let object_dir = manifest.object_dir();
  let executable = manifest
    .output_dir()
    .join(artifact::name(&manifest.name, &version, platform, variant));

  // ConfiguringFlags: exactly one flag set for the whole invocation.
  progress.advance(BuildState::ConfiguringFlags);
  let flags = variant.flag_set(platform);
  std::fs::create_dir_all(&object_dir)
    .map_err(|e| BuildError::io(format!("failed to create {}", object_dir.display()), e))?;

  let unit_names = link_set.names().into_iter().map(str::to_string).collect();
  let current_stamp = FlagStamp::new(&flags, platform.bit_width, unit_names);
  let stored = stamp::read(&object_dir);

  // Objects stamped for another word width are never silently rebuilt where a
  // mismatch is fatal; the tree must be cleaned explicitly.
  if let Some(conflict) = width_conflict(stored.as_ref(), &object_dir, platform, config) {
    error!(variant = %variant.id, error = %conflict, "object directory was built for another word width");
    let report = BuildReport {
      variant: variant.id,
      state: BuildState::ConfiguringFlags,
      trace: Vec::new(),
      flags: flags.flags.clone(),
      units: link_set
        .units
        .iter()
        .map(|unit| UnitRecord {
          name: unit.name.clone(),
          status: UnitStatus::NotAttempted,
        })
        .collect(),
      linked: false,
      artifact: None,
      architecture: None,
      failure: Some(conflict.into()),
    };
    return Ok(finish(report, progress, BuildState::Failed));
  }

  let flags_changed = !stored.as_ref().is_some_and(|s| s.same_flags(&current_stamp));
  let link_set_changed = stored.as_ref().is_none_or(|s| s.units != current_stamp.units);
  if flags_changed {
    debug!(variant = %variant.id, "flag stamp differs, invalidating all objects");
    stamp::remove(&object_dir).map_err(|e| BuildError::io("failed to remove flag stamp", e))?;
  }

  let plan = plan(&link_set, &object_dir, flags_changed);
  info!(
    variant = %variant.id,
    units = link_set.len(),
    stale = plan.iter().filter(|(_, reason)| reason.is_some()).count(),
    "computed compile plan"
  );

  // Compiling
  progress.advance(BuildState::Compiling);
  let units = compile_stale(
    &link_set,
    plan,
    platform,
    &flags,
    &object_dir,
    &manifest.root,
    config,
  )
  .await;

  let mut report = BuildReport {
    variant: variant.id,
    state: BuildState::Compiling,
    trace: Vec::new(),
    flags: flags.flags.clone(),
    units,
    linked: false,
    artifact: None,
    architecture: None,
    failure: None,
  };

  let failed: Vec<String> = report.failed().into_iter().map(str::to_string).collect();
  if !failed.is_empty() {
    error!(variant = %variant.id, failed = ?failed, "compilation failed, skipping link");
    report.failure = Some(BuildError::Compilation { units: failed });
    return Ok(finish(report, progress, BuildState::Failed));
  }

  if flags_changed {
    stamp::write(&object_dir, &current_stamp).map_err(|e| BuildError::io("failed to write flag stamp", e))?;
  }

  // Linking
  progress.advance(BuildState::Linking);
  let objects = link_set.object_paths(&object_dir);
  if report.compiled().is_empty() && !link_set_changed && is_current(&executable, &objects) {
    debug!(executable = %executable.display(), "executable is current, skipping link");
  } else {
    match compile::link_executable(platform, &flags, &objects, &executable, &manifest.root).await {
      Ok(()) => {
        info!(executable = %executable.display(), "linked");
        report.linked = true;
      }
      Err(e) => {
        error!(executable = %executable.display(), error = %e, "link failed");
        report.failure = Some(BuildError::Link(e));
        return Ok(finish(report, progress, BuildState::Failed));
      }
    }
  }

  if !flags_changed && stored.as_ref() != Some(&current_stamp) {
    stamp::write(&object_dir, &current_stamp).map_err(|e| BuildError::io("failed to write flag stamp", e))?;
  }

  report.artifact = Some(OutputArtifact {
    executable,
    version,
    platform: platform.tag(),
    variant: variant.id,
  });

  // CheckingArchitecture: a failure here leaves the executable on disk but untrusted.
  progress.advance(BuildState::CheckingArchitecture);
  match arch::verify(&object_dir, platform, config.strict_architecture) {
    Ok(check) => {
      let mismatch = check.clone().into_result().err();
      report.architecture = Some(check);
      if let Some(e) = mismatch {
        report.failure = Some(e.into());
        return Ok(finish(report, progress, BuildState::Failed));
      }
    }
    Err(e) => {
      report.failure = Some(e.into());
      return Ok(finish(report, progress, BuildState::Failed));
    }
  }

  Ok(finish(report, progress, BuildState::Done))
}

fn finish(mut report: BuildReport, mut progress: Progress, terminal: BuildState) -> BuildReport {
  progress.advance(terminal);
  match terminal {
    BuildState::Done => info!(variant = %progress.variant.id, "build complete"),
    _ => warn!(variant = %progress.variant.id, state = %progress.state(), "build failed"),
  }
  report.state = terminal;
  report.trace = progress.trace;
  report
}

/// Decide, per unit in link order, whether it must be recompiled and why.
fn plan(link_set: &LinkSet, object_dir: &Path, flags_changed: bool) -> Vec<(usize, Option<Staleness>)> {
  link_set
    .units
    .iter()
    .enumerate()
    .map(|(idx, unit)| {
      let last_build = object_mtime(&unit.object_path(object_dir));
      let reason = match last_build {
        Some(_) if flags_changed => Some(Staleness::FlagsChanged),
        _ => unit.staleness(last_build),
      };
      (idx, reason)
    })
    .collect()
}

/// Detect objects stamped for a word width other than the platform's.
///
/// Only reported where a mismatch is fatal and the directory still holds objects;
/// elsewhere the post-link check warns as usual.
fn width_conflict(
  stored: Option<&FlagStamp>,
  object_dir: &Path,
  platform: &Platform,
  config: &ExecuteConfig,
) -> Option<ArchitectureError> {
  let stored = stored?;
  if stored.bit_width == platform.bit_width
    || MismatchPolicy::for_platform(platform, config.strict_architecture) != MismatchPolicy::Fatal
  {
    return None;
  }

  match arch::scan_objects(object_dir) {
    Ok(objects) if objects.is_empty() => None,
    Ok(objects) => Some(ArchitectureError::Mismatch {
      count: objects.len(),
      expected: platform.bit_width,
    }),
    Err(e) => Some(e),
  }
}

/// True if `executable` exists and is at least as new as every object.
fn is_current(executable: &Path, objects: &[PathBuf]) -> bool {
  let Some(built) = object_mtime(executable) else {
    return false;
  };
  objects
    .iter()
    .all(|o| object_mtime(o).is_some_and(|mtime| mtime <= built))
}

/// Compile every stale unit and return a record per unit in link order.
///
/// Units are dispatched in link order. A permit is taken before each spawn. In
/// fail-fast mode the pool holds a single permit, so a unit is dispatched only
/// once the previous result is known and nothing follows a failure.
async fn compile_stale(
  link_set: &LinkSet,
  plan: Vec<(usize, Option<Staleness>)>,
  platform: &Platform,
  flags: &FlagSet,
  object_dir: &Path,
  cwd: &Path,
  config: &ExecuteConfig,
) -> Vec<UnitRecord> {
  let fail_fast = config.mode == FailureMode::FailFast;
  let workers = if fail_fast { 1 } else { config.parallelism.max(1) };
  debug!(workers, mode = ?config.mode, "starting compile pool");
  let semaphore = Arc::new(Semaphore::new(workers));
  let cancelled = Arc::new(AtomicBool::new(false));

  let mut statuses: Vec<UnitStatus> = plan
    .iter()
    .map(|(_, reason)| match reason {
      Some(_) => UnitStatus::NotAttempted,
      None => UnitStatus::UpToDate,
    })
    .collect();
  let mut reasons: HashMap<usize, Staleness> = HashMap::new();
  let mut join_set = JoinSet::new();

  for (idx, reason) in plan {
    let Some(reason) = reason else {
      continue;
    };
    if fail_fast && cancelled.load(Ordering::SeqCst) {
      break;
    }

    let Ok(permit) = semaphore.clone().acquire_owned().await else {
      break;
    };
    if fail_fast && cancelled.load(Ordering::SeqCst) {
      break;
    }

    let unit: CompilationUnit = link_set.units[idx].clone();
    debug!(unit = %unit.name, reason = ?reason, "dispatching compile");
    reasons.insert(idx, reason);

    let platform = platform.clone();
    let flags = flags.clone();
    let object_dir = object_dir.to_path_buf();
    let cwd = cwd.to_path_buf();
    let cancelled = cancelled.clone();

    join_set.spawn(async move {
      let result = compile::compile_unit(&platform, &flags, &unit, &object_dir, &cwd).await;
      if result.is_err() {
        cancelled.store(true, Ordering::SeqCst);
      }
      drop(permit);
      (idx, result)
    });
  }

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((idx, result)) => {
        let name = &link_set.units[idx].name;
        statuses[idx] = match result {
          Ok(()) => {
            info!(unit = %name, "compiled");
            UnitStatus::Compiled {
              reason: reasons.remove(&idx).unwrap_or(Staleness::Missing),
            }
          }
          Err(e) => {
            error!(unit = %name, error = %e, "compile failed");
            UnitStatus::Failed { error: e }
          }
        };
      }
      Err(e) => {
        error!(error = %e, "compile task panicked");
      }
    }
  }

  // A dispatched unit whose task never reported back counts as failed.
  for idx in reasons.into_keys() {
    if matches!(statuses[idx], UnitStatus::NotAttempted) {
      statuses[idx] = UnitStatus::Failed {
        error: CompileError::Failed {
          target: link_set.units[idx].name.clone(),
          code: None,
          stderr: "compile task aborted".to_string(),
        },
      };
    }
  }

  link_set
    .units
    .iter()
    .zip(statuses)
    .map(|(unit, status)| UnitRecord {
      name: unit.name.clone(),
      status,
    })
    .collect()
}

/// Run the composite release recipe.
///
/// Clean, build `check`, clean, build `optimized`, then promote the optimized
/// executable to its canonical name. Each phase binds its own flag set, and a
/// failed phase stops the recipe.
pub async fn release(
  manifest: &ProjectManifest,
  platform: &Platform,
  config: &ExecuteConfig,
) -> Result<ReleaseReport, BuildError> {
  info!(platform = %platform, "starting release");

  clean::clean(manifest, platform, CleanScope::All)?;
  clean::clean(manifest, platform, CleanScope::Check)?;
  let check = build_variant(manifest, platform, &CHECK, config).await?;
  if !check.is_success() {
    return Ok(ReleaseReport {
      check,
      optimized: None,
      promoted: None,
    });
  }

  clean::clean(manifest, platform, CleanScope::All)?;
  clean::clean(manifest, platform, CleanScope::Optimized)?;
  let optimized = build_variant(manifest, platform, &OPTIMIZED, config).await?;
  let built = match optimized.artifact.clone() {
    Some(artifact) if optimized.is_success() => artifact,
    _ => {
      return Ok(ReleaseReport {
        check,
        optimized: Some(optimized),
        promoted: None,
      });
    }
  };

  let canonical = manifest
    .output_dir()
    .join(artifact::canonical_name(&manifest.name, &built.version, platform));
  let promoted = artifact::promote(&built.executable, &canonical)?;

  info!(canonical = %promoted.display(), "release complete");

  Ok(ReleaseReport {
    check,
    optimized: Some(optimized),
    promoted: Some(promoted),
  })
}
