use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn paramfile(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("paramfile").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("PARAMFILE_KEY")
        .arg("--config")
        .arg(dir.join("paramfile.conf"))
        .arg("--file")
        .arg(dir.join("params.dat"));
    cmd
}

#[test]
fn set_get_delete_round_trip() {
    let dir = tempdir().unwrap();
    paramfile(dir.path())
        .args(["set", "db-host", "localhost:5432"])
        .assert()
        .success();
    paramfile(dir.path())
        .args(["get", "db-host"])
        .assert()
        .success()
        .stdout("localhost:5432\n");
    paramfile(dir.path())
        .args(["delete", "db-host"])
        .assert()
        .success();
    paramfile(dir.path())
        .args(["get", "db-host"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn encrypted_store_needs_matching_key() {
    let dir = tempdir().unwrap();
    paramfile(dir.path())
        .env("PARAMFILE_KEY", "hunter2")
        .args(["--mode", "encrypted", "set", "token", "s3cr3t"])
        .assert()
        .success();

    let raw = fs::read_to_string(dir.path().join("params.dat")).unwrap();
    assert!(!raw.contains("s3cr3t"));

    paramfile(dir.path())
        .env("PARAMFILE_KEY", "hunter2")
        .args(["--mode", "encrypted", "get", "token"])
        .assert()
        .success()
        .stdout("s3cr3t\n");
    paramfile(dir.path())
        .env("PARAMFILE_KEY", "wrong")
        .args(["--mode", "encrypted", "get", "token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mode mismatch"));
}

#[test]
fn mode_is_fixed_after_creation() {
    let dir = tempdir().unwrap();
    paramfile(dir.path())
        .args(["--mode", "compressed", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compressed"));
    paramfile(dir.path())
        .args(["--mode", "plain", "get", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mode mismatch"));
}

#[test]
fn invalid_name_is_rejected() {
    let dir = tempdir().unwrap();
    paramfile(dir.path())
        .args(["set", "a.b", "v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong parameter name"));
}

#[test]
fn config_file_is_created_then_read() {
    let dir = tempdir().unwrap();
    let conf = dir.path().join("paramfile.conf");
    paramfile(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    assert!(fs::read_to_string(&conf).unwrap().contains("Mode = plain"));

    fs::write(
        &conf,
        format!(
            "StorePath = {}\nMode = compressed\n",
            dir.path().join("other.dat").display()
        ),
    )
    .unwrap();
    paramfile(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 applied").and(predicate::str::contains("Mode = compressed")));
}

#[test]
fn config_supplies_defaults() {
    let dir = tempdir().unwrap();
    let conf = dir.path().join("paramfile.conf");
    let store = dir.path().join("from-config.dat");
    fs::write(
        &conf,
        format!("StorePath = {}\nMode = compressed\n", store.display()),
    )
    .unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("paramfile").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(&conf)
        .args(["set", "p1", "v1"])
        .assert()
        .success();

    let text = fs::read_to_string(&store).unwrap();
    assert!(text.starts_with("CurrentDataTypeForParameters$"));
    assert!(text.contains("\np1$"));
}

#[test]
fn binder_diagnostics_reach_stderr() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("paramfile.conf"), "Mode = plain\nBogus = 1\n").unwrap();
    paramfile(dir.path())
        .env("RUST_LOG", "debug")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 applied, 1 skipped"))
        .stderr(predicate::str::contains("unknown parameter \"Bogus\" ignored"));
}

#[test]
fn config_log_filter_applies_without_rust_log() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("paramfile.conf"),
        "LogFilter = info\nBogus = 1\n",
    )
    .unwrap();
    paramfile(dir.path())
        .args(["set", "p1", "v1"])
        .assert()
        .success()
        .stderr(
            predicate::str::contains("parameter stored")
                .and(predicate::str::contains("Bogus").not()),
        );
}
