//! Process-wide classifier instance.
//!
//! The model is loaded at most once per process and reused by every batch.

use std::path::Path;
use std::sync::Arc;

use candle_core::Device;
use once_cell::sync::OnceCell;

use super::WatermarkClassifier;
use crate::error::ModelLoadError;

static SHARED: OnceCell<Arc<WatermarkClassifier>> = OnceCell::new();

/// Returns the shared classifier, loading it from `path` on first use.
///
/// Later calls return the already-loaded instance and ignore `path` and
/// `device`. A failed load leaves the slot empty so a later call may retry.
///
/// # Errors
///
/// Returns a [`ModelLoadError`] if this call performed the load and it failed.
pub fn init_shared(
    path: impl AsRef<Path>,
    device: &Device,
) -> Result<Arc<WatermarkClassifier>, ModelLoadError> {
    SHARED
        .get_or_try_init(|| WatermarkClassifier::load(path, device).map(Arc::new))
        .map(Arc::clone)
}

/// The shared classifier, if it has been loaded.
#[must_use]
pub fn shared() -> Option<Arc<WatermarkClassifier>> {
    SHARED.get().cloned()
}
