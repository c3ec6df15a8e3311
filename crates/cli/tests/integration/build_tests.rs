use predicates::prelude::*;
use varbuild_lib::tree_lock::{LockMode, TreeLock};

use super::common::{TestEnv, VERSION};

#[test]
fn build_optimized_produces_named_executable() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build optimized complete"))
    .stdout(predicate::str::contains(format!("palm-{}-linux64-o3", VERSION)));

  let exe = env.executable("-o3");
  assert!(exe.exists());
  let content = std::fs::read_to_string(&exe).unwrap();
  assert!(content.contains("module path_get_linux"));
  assert!(content.contains("module cmdline_gnu"));
  assert!(!content.contains("module path_get_windows"));
  assert!(!content.contains("module cmdline_intel"));
}

#[test]
fn build_check_uses_check_flags() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["build", "--variant", "check"])
    .assert()
    .success();

  let content = std::fs::read_to_string(env.executable("-check")).unwrap();
  assert!(content.contains("-fcheck=all"));
  assert!(!content.contains("-O3"));
}

#[test]
fn intel_compiler_selects_intel_units() {
  let env = TestEnv::sample();
  env.write_file("tools/ifort", &std::fs::read_to_string(env.root().join("tools/fakefc.sh")).unwrap());

  env
    .varbuild_cmd()
    .env("FC", format!("/bin/sh {}", env.root().join("tools/ifort").display()))
    .args(["build", "--variant", "optimized"])
    .assert()
    .success();

  let content = std::fs::read_to_string(env.executable("-o3")).unwrap();
  assert!(content.contains("module cmdline_intel"));
  assert!(content.contains("flags: -O3 -check bounds"));
}

#[test]
fn rebuild_without_changes_compiles_nothing() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized"])
    .assert()
    .success();
  let before = std::fs::read(env.executable("-o3")).unwrap();

  let output = env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["state"], "done");
  assert_eq!(report["linked"], false);
  let units = report["units"].as_array().unwrap();
  assert!(units.iter().all(|u| u["status"] == "up_to_date"));
  assert_eq!(std::fs::read(env.executable("-o3")).unwrap(), before);
}

#[test]
fn compile_failure_exits_non_zero_without_executable() {
  let env = TestEnv::sample();
  env.write_file("src/grid.f90", "module grid\n  BROKEN\nend module\n");

  env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized", "--jobs", "1"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("not attempted"))
    .stderr(predicate::str::contains("failed to compile: grid"));

  assert!(!env.executable("-o3").exists());
}

#[test]
fn fail_fast_with_many_jobs_stops_at_first_failure() {
  let env = TestEnv::sample();
  env.write_file("src/kinds.f90", "BROKEN\n");

  let output = env
    .varbuild_cmd()
    .args(["build", "--variant", "check", "--jobs", "8", "-o", "json"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let statuses: Vec<(&str, &str)> = report["units"]
    .as_array()
    .unwrap()
    .iter()
    .map(|u| (u["name"].as_str().unwrap(), u["status"].as_str().unwrap()))
    .collect();
  assert_eq!(statuses[0], ("kinds", "failed"));
  assert!(statuses[1..].iter().all(|(_, status)| *status == "not_attempted"));
  assert!(!env.object_dir().join("grid.o").exists());
}

#[test]
fn best_effort_reports_every_failure() {
  let env = TestEnv::sample();
  env.write_file("src/kinds.f90", "BROKEN\n");
  env.write_file("src/solver.f90", "BROKEN\n");

  let output = env
    .varbuild_cmd()
    .args(["build", "--variant", "check", "--best-effort", "-o", "json"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["state"], "failed");
  let failed: Vec<&str> = report["units"]
    .as_array()
    .unwrap()
    .iter()
    .filter(|u| u["status"] == "failed")
    .map(|u| u["name"].as_str().unwrap())
    .collect();
  assert_eq!(failed, vec!["kinds", "solver"]);
  assert!(
    report["units"]
      .as_array()
      .unwrap()
      .iter()
      .all(|u| u["status"] != "not_attempted")
  );
}

#[test]
fn unknown_variant_is_fatal() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["build", "--variant", "debug"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown variant 'debug'"));

  assert!(!env.object_dir().join("kinds.o").exists());
}

#[test]
fn release_produces_variant_and_canonical_artifacts() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["build", "--release"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Release complete"));

  let check = env.executable("-check");
  let optimized = env.executable("-o3");
  let canonical = env.executable("");
  assert!(check.exists());
  assert!(optimized.exists());
  assert_eq!(std::fs::read(&canonical).unwrap(), std::fs::read(&optimized).unwrap());
}

#[test]
fn missing_manifest_is_reported() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["--manifest", "nope.toml", "build", "--variant", "check"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn locked_tree_is_refused() {
  let env = TestEnv::sample();
  let _held = TreeLock::acquire(&env.object_dir(), LockMode::Exclusive, "clean --scope all").unwrap();

  env
    .varbuild_cmd()
    .args(["build", "--variant", "check"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("locked by another varbuild process"))
    .stderr(predicate::str::contains("clean --scope all"));
}
