//! Apply, pull, status and history against an in-process service.

use predicates::prelude::*;
use serde_json::Value;

use confkit_lib::hash::HashScheme;

use super::common::{ACTOR, INSTANCE, TestEnv};

const DISABLED: &str = r#"{ "version": "1.0", "organizations": { "enabled": false } }"#;

const WITH_ROLES: &str = r#"{
  "version": "1.0",
  "organizations": {
    "enabled": true,
    "roles": [{ "name": "Admin", "key": "admin", "permissions": ["x"] }]
  }
}"#;

#[test]
fn first_apply_is_initial() {
  let env = TestEnv::with_server();
  let file = env.write_file("config.json", DISABLED);

  env
    .confkit_cmd()
    .arg("apply")
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Applied to '{}': initial configuration", INSTANCE)))
    .stdout(predicate::str::contains("sha256:"));

  assert!(env.cache_file().exists());
}

#[test]
fn second_apply_reports_changes() {
  let env = TestEnv::with_server();
  let first = env.write_file("first.json", DISABLED);
  let second = env.write_file("second.json", WITH_ROLES);

  env.confkit_cmd().arg("apply").arg(&first).assert().success();

  env
    .confkit_cmd()
    .arg("apply")
    .arg(&second)
    .assert()
    .success()
    .stdout(predicate::str::contains("1 added, 1 modified, 0 removed"))
    .stdout(predicate::str::contains("+ organizations.roles"))
    .stdout(predicate::str::contains("~ organizations.enabled"));
}

#[test]
fn blocking_errors_never_leave_the_machine() {
  let env = TestEnv::offline();
  let file = env.write_file("config.json", r#"{ "organizations": { "enabled": true } }"#);

  env
    .confkit_cmd()
    .arg("apply")
    .arg(&file)
    .assert()
    .failure()
    .stdout(predicate::str::contains("Config version is required"))
    .stderr(predicate::str::contains("Not applying: 1 validation error(s)"));
}

#[test]
fn dry_run_diffs_against_cache_offline() {
  let env = TestEnv::offline();
  let file = env.write_file("config.json", DISABLED);

  env
    .confkit_cmd()
    .args(["apply", "--dry-run"])
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::contains("initial configuration"));

  assert!(!env.cache_file().exists());
}

#[test]
fn status_and_history_after_apply() {
  let env = TestEnv::with_server();
  let file = env.write_file("config.json", WITH_ROLES);
  let edited = env.write_file("edited.json", DISABLED);

  env.confkit_cmd().arg("apply").arg(&file).assert().success();

  env
    .confkit_cmd()
    .arg("status")
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Instance '{}'", INSTANCE)))
    .stdout(predicate::str::contains(format!("by {} via cli", ACTOR)))
    .stdout(predicate::str::contains("matches"));

  env
    .confkit_cmd()
    .arg("status")
    .arg(&edited)
    .assert()
    .success()
    .stderr(predicate::str::contains("differs"));

  env
    .confkit_cmd()
    .arg("history")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("1 revision(s) of '{}'", INSTANCE)))
    .stdout(predicate::str::contains(ACTOR));
}

#[test]
fn unchanged_file_matches_v2_server() {
  let env = TestEnv::with_server_scheme(HashScheme::V2);
  let file = env.write_file(
    "config.json",
    r#"{
      "version": "1.0",
      "redirects": { "signUpUrl": "https://example.com/up", "signInUrl": "https://example.com/in" }
    }"#,
  );
  env.confkit_cmd().arg("apply").arg(&file).assert().success();

  env
    .confkit_cmd()
    .arg("status")
    .arg(&file)
    .assert()
    .success()
    .stdout(predicate::str::contains("matches"));

  let output = env.confkit_cmd().arg("hash").arg(&file).output().unwrap();
  let local = String::from_utf8(output.stdout).unwrap().trim().to_string();
  env
    .confkit_cmd()
    .arg("apply")
    .arg(&file)
    .arg("--expected-hash")
    .arg(&local)
    .assert()
    .success();
}

#[test]
fn status_json_carries_document() {
  let env = TestEnv::with_server();
  let file = env.write_file("config.json", DISABLED);
  env.confkit_cmd().arg("apply").arg(&file).assert().success();

  let output = env.confkit_cmd().args(["status", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let status: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(status["hasChanges"], false);
  assert_eq!(status["lastModifiedBy"], ACTOR);
  assert_eq!(status["document"]["organizations"]["enabled"], false);
  assert_eq!(status["document"]["_metadata"]["instanceId"], INSTANCE);
}

#[test]
fn pull_writes_file_and_feeds_diff() {
  let env = TestEnv::with_server();
  let file = env.write_file("config.json", DISABLED);
  env.confkit_cmd().arg("apply").arg(&file).assert().success();
  std::fs::remove_file(env.cache_file()).unwrap();

  let pulled = env.path("pulled.json");
  env
    .confkit_cmd()
    .arg("pull")
    .arg("--output")
    .arg(&pulled)
    .assert()
    .success()
    .stdout(predicate::str::contains("Pulled"));

  let content: Value = serde_json::from_str(&std::fs::read_to_string(&pulled).unwrap()).unwrap();
  assert_eq!(content["version"], "1.0");
  assert!(env.cache_file().exists());

  let edited = env.write_file("edited.json", WITH_ROLES);
  env
    .confkit_cmd()
    .arg("diff")
    .arg(&edited)
    .assert()
    .success()
    .stdout(predicate::str::contains("1 added, 1 modified, 0 removed"));
}

#[test]
fn pull_refuses_to_overwrite_without_force() {
  let env = TestEnv::with_server();
  let file = env.write_file("config.json", DISABLED);
  env.confkit_cmd().arg("apply").arg(&file).assert().success();

  env
    .confkit_cmd()
    .arg("pull")
    .arg("--output")
    .arg(&file)
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));

  env
    .confkit_cmd()
    .arg("pull")
    .arg("--output")
    .arg(&file)
    .arg("--force")
    .assert()
    .success();
}

#[test]
fn stale_expected_hash_is_a_conflict() {
  let env = TestEnv::with_server();
  let first = env.write_file("first.json", DISABLED);
  let second = env.write_file("second.json", WITH_ROLES);

  let output = env.confkit_cmd().arg("hash").arg(&first).output().unwrap();
  let stale = String::from_utf8(output.stdout).unwrap().trim().to_string();

  env.confkit_cmd().arg("apply").arg(&first).assert().success();
  env.confkit_cmd().arg("apply").arg(&second).assert().success();

  env
    .confkit_cmd()
    .arg("apply")
    .arg(&first)
    .args(["--expected-hash", &stale])
    .assert()
    .failure()
    .stderr(predicate::str::contains("conflict"));
}

#[test]
fn unknown_instance_fails() {
  let env = TestEnv::with_server();

  env
    .confkit_cmd()
    .args(["status", "--instance", "ins_nobody"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));
}

#[test]
fn missing_api_key_fails() {
  let env = TestEnv::with_server();

  env
    .confkit_cmd()
    .env_remove("CONFKIT_API_KEY")
    .arg("history")
    .assert()
    .failure()
    .stderr(predicate::str::contains("no API key configured"));
}
