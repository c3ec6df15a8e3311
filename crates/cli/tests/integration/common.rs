//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const VERSION: &str = "16.00.48";

pub const ELF32: &[u8] = b"\x7fELF\x01\x01\x01\x00";

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated source tree with the sample manifest and the fake compiler.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// A tree whose every unit compiles.
  pub fn sample() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };

    env.write_file("varbuild.toml", &fixture_content("varbuild.toml"));
    env.write_file("tools/fakefc.sh", &fixture_content("fakefc.sh"));
    env.write_file("src/common.inc", "integer, parameter :: dp = kind(1.0d0)\n");
    env.write_file(
      "src/palm.f90",
      &format!(
        "program palm\n  character(len=*), parameter :: version = '{}'\nend program\n",
        VERSION
      ),
    );
    for unit in [
      "kinds",
      "cmdline_gnu",
      "cmdline_intel",
      "path_get_linux",
      "path_get_windows",
      "grid",
      "solver",
    ] {
      env.write_file(&format!("src/{}.f90", unit), &format!("module {}\nend module\n", unit));
    }

    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap_or_else(|_| self.temp.path().to_path_buf())
  }

  pub fn object_dir(&self) -> PathBuf {
    self.root().join("obj")
  }

  /// Path of a linux64 executable; `suffix` is `-check`, `-o3` or empty.
  pub fn executable(&self, suffix: &str) -> PathBuf {
    self
      .root()
      .join("bin")
      .join(format!("palm-{}-linux64{}", VERSION, suffix))
  }

  /// The fake compiler command, suitable for `FC`.
  pub fn compiler(&self) -> String {
    format!("/bin/sh {}", self.root().join("tools/fakefc.sh").display())
  }

  /// Get a pre-configured Command for the varbuild binary.
  ///
  /// Runs in the tree root with a Linux environment and the fake compiler.
  pub fn varbuild_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("varbuild");
    cmd
      .current_dir(self.root())
      .env("FC", self.compiler())
      .env_remove("OS")
      .env_remove("MSYSTEM")
      .env_remove("VARBUILD_JOBS")
      .env_remove("RUST_LOG");
    cmd
  }

  /// Same as [`varbuild_cmd`](Self::varbuild_cmd) in a 64-bit MSYS2 session.
  pub fn windows_cmd(&self, msystem: &str) -> Command {
    let mut cmd = self.varbuild_cmd();
    cmd.env("OS", "Windows_NT").env("MSYSTEM", msystem);
    cmd
  }
}
