mod build;
mod check_arch;
mod clean;
mod describe;

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use varbuild_lib::consts::{DEFAULT_COMPILER, ENV_JOBS};
use varbuild_lib::execute::{ExecuteConfig, FailureMode, types::num_cpus};
use varbuild_lib::manifest::ProjectManifest;
use varbuild_lib::platform::Platform;

pub use build::{BuildArgs, cmd_build};
pub use check_arch::cmd_check_architecture;
pub use clean::{ScopeArg, cmd_clean};
pub use describe::cmd_describe_environment;

/// Load the manifest and detect the platform, using the manifest's compiler
/// when `FC` is unset.
fn load_project(manifest_path: &Path) -> Result<(ProjectManifest, Platform)> {
  let manifest = ProjectManifest::load(manifest_path)?;
  let compiler = manifest.compiler.as_deref().unwrap_or(DEFAULT_COMPILER);
  let platform = Platform::detect(compiler).context("Failed to detect platform")?;
  debug!(platform = %platform, manifest = %manifest_path.display(), "loaded project");
  Ok((manifest, platform))
}

/// Resolve the worker-pool size: `--jobs`, then `VARBUILD_JOBS`, then the
/// manifest, then the number of cores.
fn resolve_jobs(cli_jobs: Option<usize>, env_jobs: Option<String>, manifest_jobs: Option<usize>) -> Result<usize> {
  let env_jobs = match env_jobs {
    Some(value) => Some(
      value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_JOBS, value))?,
    ),
    None => None,
  };

  let jobs = cli_jobs.or(env_jobs).or(manifest_jobs).unwrap_or_else(num_cpus);
  if jobs == 0 {
    bail!("the number of jobs must be at least 1");
  }
  Ok(jobs)
}

fn execute_config(manifest: &ProjectManifest, jobs: Option<usize>, best_effort: bool) -> Result<ExecuteConfig> {
  Ok(ExecuteConfig {
    parallelism: resolve_jobs(jobs, std::env::var(ENV_JOBS).ok(), manifest.jobs)?,
    mode: if best_effort {
      FailureMode::BestEffort
    } else {
      FailureMode::FailFast
    },
    strict_architecture: manifest.strict_architecture,
  })
}
