use predicates::prelude::*;

use super::common::{ELF32, TestEnv, VERSION};

fn plant_32_bit_object(env: &TestEnv) {
  std::fs::create_dir_all(env.object_dir()).unwrap();
  std::fs::write(env.object_dir().join("legacy.o"), ELF32).unwrap();
}

#[test]
fn clean_tree_passes_check() {
  let env = TestEnv::sample();
  env
    .varbuild_cmd()
    .args(["build", "--variant", "optimized"])
    .assert()
    .success();

  env
    .varbuild_cmd()
    .arg("check-architecture")
    .assert()
    .success()
    .stdout(predicate::str::contains("All objects match 64-bit"));
}

#[test]
fn mismatch_is_fatal_on_windows() {
  let env = TestEnv::sample();
  plant_32_bit_object(&env);

  env
    .windows_cmd("MINGW64")
    .arg("check-architecture")
    .assert()
    .failure()
    .stdout(predicate::str::contains("legacy"))
    .stderr(predicate::str::contains("1 object file(s) were not compiled for 64-bit"))
    .stderr(predicate::str::contains("clean --scope=all"));

  // The checker never removes anything.
  assert!(env.object_dir().join("legacy.o").exists());
}

#[test]
fn mismatch_only_warns_on_linux() {
  let env = TestEnv::sample();
  plant_32_bit_object(&env);

  env
    .varbuild_cmd()
    .arg("check-architecture")
    .assert()
    .success()
    .stderr(predicate::str::contains("not fatal on linux"));
}

#[test]
fn strict_manifest_makes_linux_mismatch_fatal() {
  let env = TestEnv::sample();
  let manifest = std::fs::read_to_string(env.root().join("varbuild.toml")).unwrap();
  env.write_file("varbuild.toml", &format!("strict_architecture = true\n{}", manifest));
  plant_32_bit_object(&env);

  env.varbuild_cmd().arg("check-architecture").assert().failure();
}

#[test]
fn windows_build_with_mismatch_fails_but_leaves_executable() {
  let env = TestEnv::sample();
  plant_32_bit_object(&env);

  env
    .windows_cmd("MINGW64")
    .args(["build", "--variant", "optimized"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("clean --scope=all"));

  let exe = env
    .root()
    .join("bin")
    .join(format!("palm-{}-windows64-o3.exe", VERSION));
  assert!(exe.exists());
  assert!(std::fs::read_to_string(&exe).unwrap().contains("-mcmodel=medium"));

  env
    .windows_cmd("MINGW64")
    .args(["clean", "--scope", "all"])
    .assert()
    .success();
  env
    .windows_cmd("MINGW64")
    .args(["build", "--variant", "optimized"])
    .assert()
    .success();
}

#[test]
fn json_report_lists_mismatches() {
  let env = TestEnv::sample();
  plant_32_bit_object(&env);

  let output = env
    .windows_cmd("MINGW64")
    .args(["check-architecture", "-o", "json"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["expected"], "64");
  assert_eq!(report["policy"], "fatal");
  assert_eq!(report["mismatched"][0]["unit_name"], "legacy");
  assert_eq!(report["mismatched"][0]["compiled_for"], "32");
}
