mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{Action, depstamp_cmd};
use predicates::prelude::*;

fn stamp_cmd(action: &Action) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("depstamp");
    cmd.arg("-C")
        .arg(action.temp.path())
        .arg("stamp")
        .args(["--stamp", "app.stamp", "--mode", "release"])
        .args(["--depfile", "app.d"]);
    cmd
}

#[test]
fn stamp_without_flags_respects_rust_log_info() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Stamped 2 inputs"));
}

#[test]
fn stamp_without_flags_respects_rust_log_warn() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "warn")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn verbose_overrides_rust_log_warn() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "warn")
        .arg("-v")
        .assert()
        .success()
        .stderr(predicate::str::contains("Stamped 2 inputs"));
}

#[test]
fn verbose_debug_overrides_rust_log_warn() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "warn")
        .arg("-vv")
        .assert()
        .success()
        .stderr(predicate::str::contains("Checksum of"))
        .stderr(predicate::str::contains("lists 2 inputs"));
}

#[test]
fn log_level_overrides_rust_log_warn() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "warn")
        .arg("--log-level")
        .arg("info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Stamped 2 inputs"));
}

#[test]
fn trace_log_level_emits_debug_messages() {
    let action = Action::new();

    stamp_cmd(&action)
        .env("RUST_LOG", "warn")
        .arg("--log-level")
        .arg("trace")
        .assert()
        .success()
        .stderr(predicate::str::contains("Checksum of"));
}

#[test]
fn log_level_conflicts_with_verbose() {
    cargo_bin_cmd!("depstamp")
        .arg("--log-level")
        .arg("info")
        .arg("-v")
        .arg("deps")
        .arg("app.d")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--log-level <LEVEL>"))
        .stderr(predicate::str::contains("--verbose"));
}

#[test]
fn help_mentions_rust_log_precedence_for_logging_flags() {
    cargo_bin_cmd!("depstamp")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("-v, --verbose"))
        .stdout(predicate::str::contains("--log-level <LEVEL>"))
        .stdout(predicate::str::contains("Takes precedence over RUST_LOG"));
}

#[test]
fn errors_log_to_stderr_without_emoji_when_not_tty() {
    let action = Action::new();
    std::fs::write(action.path("app.d"), "no separator").unwrap();

    // capture() makes stdout/stderr non-tty
    let output = stamp_cmd(&action)
        .env_remove("RUST_LOG")
        .assert()
        .code(255)
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    for ch in stderr.chars() {
        assert!(
            ch.is_ascii(),
            "stderr unexpectedly contains non-ASCII character: {ch:?}"
        );
    }
    assert!(
        stderr.contains("ERROR:"),
        "stderr should include the error prefix"
    );
    assert!(
        stderr.contains("Malformed depfile"),
        "stderr should include the error message"
    );
}

#[test]
fn deps_reports_input_count_at_info_and_keeps_stdout_clean() {
    let action = Action::new();

    depstamp_cmd(action.temp.path())
        .arg("-v")
        .arg("deps")
        .arg("app.d")
        .assert()
        .success()
        .stdout("a.dart\nb.dart\n")
        .stderr(predicate::str::contains("INFO: app.d lists 2 inputs"))
        .stderr(predicate::str::contains("Depfile").not());
}

#[test]
fn deps_debug_logs_parsed_depfile() {
    let action = Action::new();

    depstamp_cmd(action.temp.path())
        .arg("-vv")
        .arg("deps")
        .arg("app.d")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG: Depfile app.d lists 2 inputs"));
}

#[test]
fn check_logs_up_to_date_at_info() {
    let action = Action::new();
    action.run("stamp").assert().success();

    action
        .run("check")
        .arg("-v")
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO: app.stamp is up to date"));
}

#[test]
fn check_warns_about_unusable_stamp_by_default() {
    let action = Action::new();
    std::fs::write(action.path("app.stamp"), "[metadata]\nversion = \"0.0.0-old\"\n").unwrap();

    action
        .run("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("WARN: Ignoring stamp app.stamp"))
        .stderr(predicate::str::contains("INFO:").not());
}
