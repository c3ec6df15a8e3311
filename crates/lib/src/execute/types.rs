//! Types for build orchestration.
//!
//! This module defines the error taxonomy, per-unit outcomes, build reports and
//! the configuration threaded through every orchestrator call.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::arch::{ArchitectureError, CheckReport};
use crate::artifact::{OutputArtifact, StagingError};
use crate::clean::CleanError;
use crate::error::ConfigError;
use crate::units::Staleness;
use crate::variant::VariantId;

/// A single compile or link step failed.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{target}: compiler exited with code {code:?}{}", format_stderr(stderr))]
  Failed {
    target: String,
    code: Option<i32>,
    stderr: String,
  },
}

fn format_stderr(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!("\n{}", stderr)
  }
}

/// Errors surfaced by the orchestrator. Every variant is fatal to the build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("{} unit(s) failed to compile: {}", units.len(), units.join(", "))]
  Compilation { units: Vec<String> },

  #[error("link failed: {0}")]
  Link(#[source] CompileError),

  #[error(transparent)]
  Architecture(#[from] ArchitectureError),

  #[error(transparent)]
  Staging(#[from] StagingError),

  #[error(transparent)]
  Clean(#[from] CleanError),

  #[error("{context}: {source}")]
  Io {
    context: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{variant} phase of release failed: {source}")]
  ReleasePhase {
    variant: VariantId,
    #[source]
    source: Box<BuildError>,
  },
}

impl BuildError {
  pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      context: context.into(),
      source,
    }
  }
}

/// Serialize any displayable value as its string form.
pub(crate) fn as_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.collect_str(value)
}

fn as_display_opt<T: fmt::Display, S: Serializer>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error> {
  match value {
    Some(v) => serializer.collect_str(v),
    None => serializer.serialize_none(),
  }
}

/// States of a single-variant build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
  Idle,
  Detecting,
  ConfiguringFlags,
  Compiling,
  Linking,
  CheckingArchitecture,
  Done,
  Failed,
}

impl BuildState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Done | Self::Failed)
  }
}

impl fmt::Display for BuildState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Idle => "idle",
      Self::Detecting => "detecting",
      Self::ConfiguringFlags => "configuring-flags",
      Self::Compiling => "compiling",
      Self::Linking => "linking",
      Self::CheckingArchitecture => "checking-architecture",
      Self::Done => "done",
      Self::Failed => "failed",
    };
    write!(f, "{}", name)
  }
}

/// What happened to one unit of the link set.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
  UpToDate,
  Compiled {
    reason: Staleness,
  },
  Failed {
    #[serde(serialize_with = "as_display")]
    error: CompileError,
  },
  /// Not dispatched because an earlier unit failed in fail-fast mode.
  NotAttempted,
}

#[derive(Debug, Serialize)]
pub struct UnitRecord {
  pub name: String,
  #[serde(flatten)]
  pub status: UnitStatus,
}

/// How the orchestrator reacts to a failing unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
  /// Compile units one at a time and stop at the first failure.
  #[default]
  FailFast,
  /// Keep compiling independent units and aggregate every failure.
  BestEffort,
}

/// Configuration for build execution, bound once per invocation.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of units to compile in parallel in best-effort mode.
  /// Fail-fast builds compile one unit at a time.
  pub parallelism: usize,

  pub mode: FailureMode,

  /// Treat architecture mismatches as fatal on every platform family.
  pub strict_architecture: bool,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      mode: FailureMode::FailFast,
      strict_architecture: false,
    }
  }
}

/// Get the number of CPUs for default parallelism.
pub fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Result of a single-variant build.
///
/// A `Failed` state with `artifact` set means an executable exists on disk but
/// must not be trusted.
#[derive(Debug, Serialize)]
pub struct BuildReport {
  pub variant: VariantId,
  pub state: BuildState,
  pub trace: Vec<BuildState>,
  pub flags: Vec<String>,
  pub units: Vec<UnitRecord>,
  pub linked: bool,
  pub artifact: Option<OutputArtifact>,
  pub architecture: Option<CheckReport>,
  #[serde(serialize_with = "as_display_opt")]
  pub failure: Option<BuildError>,
}

impl BuildReport {
  pub fn is_success(&self) -> bool {
    self.state == BuildState::Done
  }

  /// True if the executable exists and the build reached `Done`.
  pub fn artifact_trusted(&self) -> bool {
    self.is_success() && self.artifact.is_some()
  }

  pub fn compiled(&self) -> Vec<&str> {
    self.names_where(|s| matches!(s, UnitStatus::Compiled { .. }))
  }

  pub fn up_to_date(&self) -> Vec<&str> {
    self.names_where(|s| matches!(s, UnitStatus::UpToDate))
  }

  pub fn failed(&self) -> Vec<&str> {
    self.names_where(|s| matches!(s, UnitStatus::Failed { .. }))
  }

  pub fn not_attempted(&self) -> Vec<&str> {
    self.names_where(|s| matches!(s, UnitStatus::NotAttempted))
  }

  /// Units the compiler was actually invoked for.
  pub fn attempted(&self) -> Vec<&str> {
    self.names_where(|s| matches!(s, UnitStatus::Compiled { .. } | UnitStatus::Failed { .. }))
  }

  fn names_where(&self, pred: impl Fn(&UnitStatus) -> bool) -> Vec<&str> {
    self
      .units
      .iter()
      .filter(|u| pred(&u.status))
      .map(|u| u.name.as_str())
      .collect()
  }

  pub fn executable(&self) -> Option<&PathBuf> {
    self.artifact.as_ref().map(|a| &a.executable)
  }

  /// Convert a failed report into its error.
  pub fn into_result(mut self) -> Result<Self, BuildError> {
    match self.failure.take() {
      Some(err) => Err(err),
      None => Ok(self),
    }
  }
}

/// Result of the composite release recipe.
#[derive(Debug, Serialize)]
pub struct ReleaseReport {
  pub check: BuildReport,
  pub optimized: Option<BuildReport>,
  pub promoted: Option<PathBuf>,
}

impl ReleaseReport {
  pub fn is_success(&self) -> bool {
    self.check.is_success() && self.optimized.as_ref().is_some_and(|r| r.is_success()) && self.promoted.is_some()
  }

  /// Convert into an error naming the phase that failed.
  pub fn into_result(self) -> Result<Self, BuildError> {
    let Self {
      check,
      optimized,
      promoted,
    } = self;

    let check = check.into_result().map_err(|e| BuildError::ReleasePhase {
      variant: VariantId::Check,
      source: Box::new(e),
    })?;

    let optimized = match optimized {
      Some(report) => Some(report.into_result().map_err(|e| BuildError::ReleasePhase {
        variant: VariantId::Optimized,
        source: Box::new(e),
      })?),
      None => None,
    };

    Ok(Self {
      check,
      optimized,
      promoted,
    })
  }
}
