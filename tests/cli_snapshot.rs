mod common;

use common::buildward_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn snapshot_lists_files_and_directories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/a.cpp"), "int main() {}").unwrap();
    fs::write(temp.path().join("Jamroot"), "exe a : src/a.cpp ;").unwrap();

    buildward_cmd(temp.path())
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("f "))
        .stdout(predicate::str::contains(" src/a.cpp"))
        .stdout(predicate::str::contains(" Jamroot"))
        .stdout(predicate::str::is_match(r"(?m)^d .* src$").unwrap());
}

#[test]
fn snapshot_accepts_explicit_path() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("tree")).unwrap();
    fs::write(temp.path().join("tree/file.txt"), "hello").unwrap();

    buildward_cmd(temp.path())
        .arg("snapshot")
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 bytes"))
        .stdout(predicate::str::contains(" file.txt"));
}

#[test]
fn snapshot_of_empty_directory_prints_nothing() {
    let temp = TempDir::new().unwrap();

    buildward_cmd(temp.path())
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn snapshot_of_missing_directory_is_an_error() {
    let temp = TempDir::new().unwrap();

    buildward_cmd(temp.path())
        .arg("snapshot")
        .arg("does-not-exist")
        .assert()
        .code(255)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(unix)]
#[test]
fn snapshot_records_symlinks_without_following_them() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("target.txt"), "data").unwrap();
    std::os::unix::fs::symlink("target.txt", temp.path().join("link")).unwrap();

    buildward_cmd(temp.path())
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^l .* link$").unwrap());
}
