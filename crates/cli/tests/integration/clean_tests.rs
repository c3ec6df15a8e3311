use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn clean_all_removes_objects_and_keeps_executables() {
  let env = TestEnv::sample();
  env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized"])
    .assert()
    .success();
  assert!(env.object_dir().join("kinds.o").exists());

  env
    .varbuild_cmd()
    .args(["clean", "--scope", "all"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Objects removed: 6"));

  assert!(!env.object_dir().join("kinds.o").exists());
  assert!(env.executable("-o3").exists());
}

#[test]
fn clean_variant_removes_only_its_executable() {
  let env = TestEnv::sample();
  env.varbuild_cmd().args(["build", "--release"]).assert().success();

  env
    .varbuild_cmd()
    .args(["clean", "--scope", "check"])
    .assert()
    .success();

  assert!(!env.executable("-check").exists());
  assert!(env.executable("-o3").exists());
  assert!(env.executable("").exists());
  assert!(env.object_dir().join("kinds.o").exists());
}

#[test]
fn clean_on_fresh_tree_is_noop() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["clean", "--scope", "optimized"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to clean"));
}

#[test]
fn clean_json_output_is_valid() {
  let env = TestEnv::sample();

  let output = env
    .varbuild_cmd()
    .args(["clean", "--scope", "all", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["scope"], "all");
  assert_eq!(result["stats"]["objects_deleted"], 0);
  assert!(result["deleted_paths"].as_array().unwrap().is_empty());
}

#[test]
fn invalid_scope_is_rejected() {
  let env = TestEnv::sample();

  env
    .varbuild_cmd()
    .args(["clean", "--scope", "everything"])
    .assert()
    .failure();
}
