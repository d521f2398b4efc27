//! CLI argument validation tests.
//!
//! Covers argument parsing and the failures that happen before any image is
//! classified. None of these need real weights.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wmdetect_test_support::SyntheticImageBuilder;

/// A command isolated from the user's config and data directories.
fn wmdetect(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wmdetect").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .current_dir(home.path());
    cmd
}

fn dir_with_image() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let img = SyntheticImageBuilder::solid(16, 16, [200, 30, 30]);
    SyntheticImageBuilder::write(&img, &dir.path().join("photo.png")).unwrap();
    dir
}

// === Missing/Invalid Path Tests ===

#[test]
fn test_missing_path_shows_error() {
    let home = tempfile::tempdir().unwrap();
    wmdetect(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No paths specified"));
}

#[test]
fn test_empty_directory_selects_nothing() {
    let home = tempfile::tempdir().unwrap();
    let empty = tempfile::tempdir().unwrap();

    wmdetect(&home)
        .arg(empty.path())
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No images selected for detection."));
}

#[test]
fn test_nonexistent_path_selects_nothing() {
    let home = tempfile::tempdir().unwrap();

    wmdetect(&home)
        .arg("/nonexistent/path/to/image.jpg")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No images selected for detection."));
}

#[test]
fn test_unmatched_selection_selects_nothing() {
    let home = tempfile::tempdir().unwrap();
    let images = dir_with_image();

    wmdetect(&home)
        .arg(images.path())
        .arg("--select")
        .arg(images.path().join("other.png"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No images selected for detection."));
}

// === Format Validation Tests ===

#[test]
fn test_invalid_format_rejected() {
    let home = tempfile::tempdir().unwrap();

    wmdetect(&home)
        .arg("--format")
        .arg("xml")
        .arg("photo.png")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_help_lists_detect_options() {
    let home = tempfile::tempdir().unwrap();

    wmdetect(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("--select")
            .and(predicate::str::contains("--fail-fast"))
            .and(predicate::str::contains("--models-dir")),
    );
}

// === Model Location Tests ===

#[test]
fn test_missing_model_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let images = dir_with_image();
    let models = tempfile::tempdir().unwrap();

    wmdetect(&home)
        .arg(images.path())
        .arg("--models-dir")
        .arg(models.path())
        .arg("--cpu")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("model file not found"));
}

#[test]
fn test_model_path_uses_models_dir() {
    let home = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    let expected = models.path().join("watermark_detector.safetensors");

    wmdetect(&home)
        .args(["model", "path", "--models-dir"])
        .arg(models.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy()));
}

#[test]
fn test_model_path_defaults_to_data_dir() {
    let home = tempfile::tempdir().unwrap();
    let expected = home
        .path()
        .join("data")
        .join("wmdetect")
        .join("models")
        .join("watermark_detector.safetensors");

    wmdetect(&home)
        .args(["model", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy()));
}

#[test]
fn test_model_check_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();

    wmdetect(&home)
        .args(["model", "check", "--cpu", "--model"])
        .arg(home.path().join("absent.safetensors"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("model file not found"));
}
