//! Test utilities for varbuild-lib.
//!
//! Provides a throwaway source tree and a fake Fortran compiler so the
//! orchestrator can be exercised without a real toolchain.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::manifest::ProjectManifest;
use crate::platform::{BitWidth, CompilerCommand, Family, Platform};

/// A POSIX shell stand-in for a Fortran compiler.
///
/// With `-c` it writes a 64-bit ELF header followed by the flags and source
/// text; sources containing `BROKEN` fail. Without `-c` it links by
/// concatenating its inputs.
pub const FAKE_COMPILER: &str = r#"#!/bin/sh
compile=0
out=""
flags=""
inputs=""
while [ $# -gt 0 ]; do
  case "$1" in
    -c) compile=1 ;;
    -o) shift; out="$1" ;;
    -J|-I|-module) shift ;;
    -check|-warn) flags="$flags $1 $2"; shift ;;
    -*) flags="$flags $1" ;;
    *) inputs="$inputs $1" ;;
  esac
  shift
done
if [ "$compile" = 1 ]; then
  for src in $inputs; do
    if grep -q BROKEN "$src"; then
      echo "$src: Error: unclassifiable statement" >&2
      exit 1
    fi
  done
  printf '\177ELF\002\001\001\000' > "$out"
  echo "flags:$flags" >> "$out"
  cat $inputs >> "$out"
else
  cat $inputs > "$out"
fi
"#;

pub const VERSION: &str = "1.2.3";

/// A source tree with a manifest, sources and the fake compiler.
pub struct TestProject {
  pub dir: TempDir,
  pub manifest: ProjectManifest,
}

impl TestProject {
  /// Create a project whose units are `units` (name, body) followed by `main`.
  ///
  /// Every non-main unit depends on `src/common.inc`.
  pub fn new(units: &[(&str, &str)]) -> Self {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("tools")).unwrap();
    std::fs::write(root.join("tools/fakefc.sh"), FAKE_COMPILER).unwrap();
    std::fs::write(root.join("src/common.inc"), "integer, parameter :: dp = kind(1.0d0)\n").unwrap();
    std::fs::write(
      root.join("src/main.f90"),
      format!("program sim\n  character(len=*), parameter :: version = '{}'\nend program\n", VERSION),
    )
    .unwrap();

    let mut manifest = String::from("name = \"sim\"\nmain = \"src/main.f90\"\noutput_dir = \"bin\"\n");
    for (name, body) in units {
      std::fs::write(root.join(format!("src/{}.f90", name)), body).unwrap();
      manifest.push_str(&format!(
        "\n[[unit]]\nname = \"{name}\"\nsource = \"src/{name}.f90\"\ndepends_on = [\"src/common.inc\"]\n"
      ));
    }
    manifest.push_str("\n[[unit]]\nname = \"main\"\nsource = \"src/main.f90\"\n");

    let manifest_path = root.join("varbuild.toml");
    std::fs::write(&manifest_path, manifest).unwrap();
    let manifest = ProjectManifest::load(&manifest_path).unwrap();

    Self { dir, manifest }
  }

  pub fn root(&self) -> &Path {
    self.dir.path()
  }

  pub fn object_dir(&self) -> PathBuf {
    self.manifest.object_dir()
  }

  pub fn source(&self, unit: &str) -> PathBuf {
    self.root().join(format!("src/{}.f90", unit))
  }

  /// Platform that compiles with the fake compiler.
  pub fn platform(&self, family: Family, bit_width: BitWidth) -> Platform {
    let compiler = CompilerCommand {
      program: "/bin/sh".to_string(),
      args: vec![self.root().join("tools/fakefc.sh").display().to_string()],
    };
    Platform {
      family,
      bit_width,
      toolchain: compiler.toolchain(),
      compiler,
    }
  }

  /// Make the fake compiler emit objects for `width`, as a different MSYS2
  /// session would.
  pub fn compiler_emits(&self, width: BitWidth) {
    let class = match width {
      BitWidth::W32 => r"\177ELF\001",
      BitWidth::W64 => r"\177ELF\002",
    };
    let script = FAKE_COMPILER.replace(r"\177ELF\002", class);
    std::fs::write(self.root().join("tools/fakefc.sh"), script).unwrap();
  }

  pub fn linux(&self) -> Platform {
    self.platform(Family::Linux, BitWidth::W64)
  }
}
