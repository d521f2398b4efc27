//! Configuration layering tests.
//!
//! Precedence, lowest to highest: XDG config, project `.wmdetect.toml`
//! (searched up from the working directory), command-line flags.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wmdetect(home: &TempDir, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wmdetect").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .current_dir(cwd);
    cmd
}

fn write_xdg_config(home: &TempDir, content: &str) {
    let dir = home.path().join("config").join("wmdetect");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

fn weights_in(dir: &Path) -> String {
    dir.join("watermark_detector.safetensors")
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_project_config_sets_models_dir() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let models = project.path().join("weights");
    fs::write(
        project.path().join(".wmdetect.toml"),
        format!("[model]\ndir = {:?}\n", models.to_string_lossy()),
    )
    .unwrap();

    wmdetect(&home, project.path())
        .args(["model", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(weights_in(&models)));
}

#[test]
fn test_project_config_found_from_subdirectory() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let nested = project.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        project.path().join(".wmdetect.toml"),
        "[model]\npath = \"/srv/models/custom.safetensors\"\n",
    )
    .unwrap();

    wmdetect(&home, &nested)
        .args(["model", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/models/custom.safetensors"));
}

#[test]
fn test_cli_models_dir_overrides_config_path() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let cli_dir = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".wmdetect.toml"),
        "[model]\npath = \"/srv/models/custom.safetensors\"\n",
    )
    .unwrap();

    wmdetect(&home, project.path())
        .args(["model", "path", "--models-dir"])
        .arg(cli_dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains(weights_in(cli_dir.path()))
                .and(predicate::str::contains("custom.safetensors").not()),
        );
}

#[test]
fn test_xdg_config_is_read() {
    let home = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    write_xdg_config(&home, "[model]\npath = \"/opt/xdg/model.safetensors\"\n");

    wmdetect(&home, cwd.path())
        .args(["model", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/opt/xdg/model.safetensors"));
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_xdg_config(&home, "[model]\npath = \"/opt/xdg/model.safetensors\"\n");
    fs::write(
        project.path().join(".wmdetect.toml"),
        "[model]\npath = \"/opt/project/model.safetensors\"\n",
    )
    .unwrap();

    wmdetect(&home, project.path())
        .args(["model", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/opt/project/model.safetensors"));
}

#[test]
fn test_invalid_format_in_config_warns() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".wmdetect.toml"),
        "[output]\nformat = \"xml\"\n",
    )
    .unwrap();

    wmdetect(&home, project.path())
        .args(["model", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("output.format must be"));
}

#[test]
fn test_malformed_sha256_in_config_warns() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".wmdetect.toml"),
        "[model]\nsha256 = \"abc\"\n",
    )
    .unwrap();

    wmdetect(&home, project.path())
        .args(["model", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"));
}
