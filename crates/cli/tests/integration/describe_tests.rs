use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn describes_linux_gnu_by_default() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .arg("describe-environment")
    .assert()
    .success()
    .stdout(predicate::str::contains("linux64"))
    .stdout(predicate::str::contains("gnu"));
}

#[test]
fn describes_windows_32_bit_session() {
  let env = TestEnv::sample();

  let output = env
    .windows_cmd("MINGW32")
    .env("FC", "ifort")
    .args(["describe-environment", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let described: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(described["tag"], "windows32");
  assert_eq!(described["bit_width"], "32");
  assert_eq!(described["toolchain"], "intel");
  assert!(
    !described["optimized_flags"]
      .as_array()
      .unwrap()
      .iter()
      .any(|f| f == "-mcmodel=medium")
  );
}

#[test]
fn windows_64_bit_flags_include_medium_code_model() {
  let env = TestEnv::sample();

  env
    .windows_cmd("UCRT64")
    .arg("describe-environment")
    .assert()
    .success()
    .stdout(predicate::str::contains("windows64"))
    .stdout(predicate::str::contains("-mcmodel=medium"));
}

#[test]
fn works_without_a_manifest() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["--manifest", "missing.toml", "describe-environment"])
    .assert()
    .success();
}

#[test]
fn blank_compiler_is_reported_but_exits_zero() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .env("FC", "  ")
    .arg("describe-environment")
    .assert()
    .success()
    .stderr(predicate::str::contains("FC"));
}
