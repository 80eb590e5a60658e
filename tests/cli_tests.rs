//! Black-box checks of the `promforge` binary: help output, argument
//! rejection, and the pre-run failure paths with their exit codes.
//!
//! Every invocation runs in a scratch directory with the provider key
//! variables removed, so no implicit `promforge.toml` or ambient credentials
//! leak into the assertions.

use assert_cmd::Command;
use predicates::prelude::*;

fn promforge() -> Command {
    let mut cmd = Command::cargo_bin("promforge").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY");
    cmd
}

#[test]
fn help_shows_name_and_subcommand() {
    promforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("promforge"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("EXAMPLES"));
}

#[test]
fn run_help_lists_the_pipeline_flags() {
    promforge()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--exporter-path"))
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--max-fix-retries"));
}

#[test]
fn version_flag_reports_the_package_version() {
    promforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("promforge"));
}

#[test]
fn invalid_mode_is_rejected_by_the_parser() {
    promforge()
        .args(["run", "--mode", "replace"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn extend_without_exporter_path_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    promforge()
        .current_dir(dir.path())
        .args(["run", "--mode", "extend"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("exporter path"));
}

#[test]
fn implicit_config_file_is_discovered() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("promforge.toml"), "mode = \"extend\"\n").unwrap();

    promforge()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("exporter path"));
}

#[test]
fn missing_api_key_fails_before_any_pipeline_work() {
    let dir = tempfile::tempdir().unwrap();
    promforge()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));

    // Nothing was generated.
    assert!(!dir.path().join("generated-exporter").exists());
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    promforge()
        .current_dir(dir.path())
        .args(["run", "--config", "does-not-exist.toml"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("does-not-exist.toml"));
}
