//! Model file resolution, checksum verification and loading.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::Device;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use wmdetect_core::inference::{init_shared, WatermarkClassifier};
use wmdetect_core::ModelLoadError;

/// File name of the weights inside the models directory.
pub const DEFAULT_MODEL_FILE: &str = "watermark_detector.safetensors";

/// Returns the default models directory.
///
/// Uses `XDG_DATA_HOME/wmdetect/models` or `~/.local/share/wmdetect/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wmdetect")
        .join("models")
}

/// Resolves the weights file to load.
///
/// An explicit `model` path wins; otherwise the default file name inside
/// `dir`, or inside [`models_dir`] when no directory is given.
#[must_use]
pub fn resolve_model_path(model: Option<&Path>, dir: Option<&Path>) -> PathBuf {
    model.map_or_else(
        || {
            dir.map_or_else(models_dir, Path::to_path_buf)
                .join(DEFAULT_MODEL_FILE)
        },
        Path::to_path_buf,
    )
}

/// Hex-encoded SHA-256 of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checks `path` against an expected SHA-256 (case-insensitive hex).
///
/// # Errors
///
/// Returns [`ModelLoadError::NotFound`] if the file is missing,
/// [`ModelLoadError::Checksum`] on mismatch, and
/// [`ModelLoadError::Incompatible`] if the file cannot be read.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), ModelLoadError> {
    let actual = sha256_file(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ModelLoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ModelLoadError::Incompatible {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if actual.eq_ignore_ascii_case(expected) {
        debug!("Checksum verified for {}", path.display());
        Ok(())
    } else {
        Err(ModelLoadError::Checksum {
            path: path.to_path_buf(),
            expected: expected.to_ascii_lowercase(),
            actual,
        })
    }
}

/// Verifies (when `sha256` is set) and loads the process-wide classifier.
///
/// # Errors
///
/// Returns a [`ModelLoadError`] if the file is missing, fails the checksum,
/// or does not hold compatible weights.
pub fn load_classifier(
    path: &Path,
    sha256: Option<&str>,
    device: &Device,
) -> Result<Arc<WatermarkClassifier>, ModelLoadError> {
    if !path.is_file() {
        return Err(ModelLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if let Some(expected) = sha256 {
        verify_checksum(path, expected)?;
    }

    info!("Loading watermark model: {}", path.display());
    init_shared(path, device)
}
