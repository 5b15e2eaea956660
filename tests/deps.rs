mod common;

use common::depstamp_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn deps_prints_sorted_unique_inputs() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("out.d"),
        "out.dill : b.dart a.dart b.dart\n",
    )
    .unwrap();

    depstamp_cmd(temp.path())
        .arg("deps")
        .arg("out.d")
        .assert()
        .success()
        .stdout("a.dart\nb.dart\n");
}

#[test]
fn deps_unescapes_paths() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("out.d"),
        r"out.dill : fil\\e2.dart fil\ e3.dart",
    )
    .unwrap();

    depstamp_cmd(temp.path())
        .arg("deps")
        .arg("out.d")
        .assert()
        .success()
        .stdout("fil e3.dart\nfil\\e2.dart\n");
}

#[test]
fn deps_rejects_missing_separator() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("out.d"), "out.dill a.dart\n").unwrap();

    depstamp_cmd(temp.path())
        .arg("deps")
        .arg("out.d")
        .assert()
        .code(255)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Malformed depfile"));
}

#[test]
fn deps_reports_unreadable_depfile() {
    let temp = TempDir::new().unwrap();

    depstamp_cmd(temp.path())
        .arg("deps")
        .arg("absent.d")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("absent.d"));
}
