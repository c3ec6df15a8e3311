//! Compiler and linker invocation.
//!
//! Each call spawns the configured compiler as an external process with the
//! inherited environment. Units write disjoint object files, so concurrent
//! compiles need no coordination beyond the worker pool.

use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::debug;

use crate::execute::types::CompileError;
use crate::platform::{Platform, Toolchain};
use crate::units::CompilationUnit;
use crate::variant::FlagSet;

/// Flags that direct module output and lookup to the object directory.
fn module_dir_args(toolchain: Toolchain, object_dir: &Path) -> Vec<String> {
  let dir = object_dir.display().to_string();
  match toolchain {
    Toolchain::Gnu => vec!["-J".to_string(), dir.clone(), "-I".to_string(), dir],
    Toolchain::Intel => vec!["-module".to_string(), dir.clone(), "-I".to_string(), dir],
  }
}

/// Arguments for compiling one unit: `-c <flags> <module dirs> <source> -o <object>`.
pub fn compile_args(platform: &Platform, flags: &FlagSet, unit: &CompilationUnit, object_dir: &Path) -> Vec<String> {
  let mut args = platform.compiler.args.clone();
  args.push("-c".to_string());
  args.extend(flags.as_slice().iter().cloned());
  args.extend(module_dir_args(platform.toolchain, object_dir));
  args.push(unit.source.display().to_string());
  args.push("-o".to_string());
  args.push(unit.object_path(object_dir).display().to_string());
  args
}

/// Arguments for linking: `<flags> <objects...> -o <executable>`.
pub fn link_args(platform: &Platform, flags: &FlagSet, objects: &[PathBuf], executable: &Path) -> Vec<String> {
  let mut args = platform.compiler.args.clone();
  args.extend(flags.as_slice().iter().cloned());
  args.extend(objects.iter().map(|o| o.display().to_string()));
  args.push("-o".to_string());
  args.push(executable.display().to_string());
  args
}

/// Compile a single unit into its object file.
pub async fn compile_unit(
  platform: &Platform,
  flags: &FlagSet,
  unit: &CompilationUnit,
  object_dir: &Path,
  cwd: &Path,
) -> Result<(), CompileError> {
  let args = compile_args(platform, flags, unit, object_dir);
  run(&platform.compiler.program, &args, cwd, &unit.name).await
}

/// Link the objects, in order, into the executable.
pub async fn link_executable(
  platform: &Platform,
  flags: &FlagSet,
  objects: &[PathBuf],
  executable: &Path,
  cwd: &Path,
) -> Result<(), CompileError> {
  if let Some(parent) = executable.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .map_err(|source| CompileError::Spawn {
        program: platform.compiler.program.clone(),
        source,
      })?;
  }

  let args = link_args(platform, flags, objects, executable);
  let target = executable
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| executable.display().to_string());
  run(&platform.compiler.program, &args, cwd, &target).await
}

async fn run(program: &str, args: &[String], cwd: &Path, target: &str) -> Result<(), CompileError> {
  debug!(program = %program, args = ?args, cwd = %cwd.display(), "spawning compiler");

  let output: Output = Command::new(program)
    .args(args)
    .current_dir(cwd)
    .output()
    .await
    .map_err(|source| CompileError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !output.status.success() {
    return Err(CompileError::Failed {
      target: target.to_string(),
      code: output.status.code(),
      stderr,
    });
  }

  if !stderr.is_empty() {
    debug!(target = %target, stderr = %stderr, "compiler diagnostics");
  }

  Ok(())
}
