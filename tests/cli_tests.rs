use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn release() -> Command {
    let mut cmd = Command::cargo_bin("kodegen_release_manager").unwrap();
    cmd.env_remove("RELEASE_BATCH").env_remove("RELEASE_SCM_URL");
    cmd
}

#[test]
fn help_lists_goals() {
    release()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prepare"))
        .stdout(predicate::str::contains("perform"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("update-versions"));
}

#[test]
fn status_without_state() {
    let dir = tempfile::tempdir().unwrap();
    release()
        .args(["status", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No release in progress"));
}

#[test]
fn status_json_reports_prepared_release() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("release.json"),
        r#"{
  "completedPhase": "end-release",
  "scm": { "tag": "app-1.0" },
  "projects": { "acme:app": { "release": "1.0" } }
}"#,
    )
    .unwrap();

    release()
        .args(["status", "--json", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"prepared\""))
        .stdout(predicate::str::contains("\"acme:app\": \"1.0\""));
}

#[test]
fn status_reports_interrupted_prepare() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("release.json"), r#"{"completedPhase": "scm-commit"}"#).unwrap();

    release()
        .args(["status", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("scm-commit"))
        .stdout(predicate::str::contains("run 'prepare' to resume"));
}

#[test]
fn missing_working_dir_is_rejected() {
    release()
        .args(["status", "-C", "/definitely/not/here"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid arguments"));
}

#[test]
fn malformed_define_is_rejected() {
    release()
        .args(["prepare", "-D", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn clean_removes_state() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Cargo.toml"),
        "[package]\nname = \"app\"\nversion = \"1.0.0-SNAPSHOT\"\nedition = \"2021\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("release.json"), r#"{"completedPhase": "scm-commit"}"#).unwrap();

    release()
        .args(["clean", "--batch", "-C"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(!dir.path().join("release.json").exists());
}

#[test]
fn status_rejects_corrupt_state() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("release.json"), "completedPhase=scm-commit\n").unwrap();

    release()
        .args(["status", "-C"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse state"));
}
