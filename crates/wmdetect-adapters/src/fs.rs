//! Filesystem adapter for discovering and loading images.

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::{debug, warn};
use wmdetect_core::{ImageLoader, ImageRef, LoadError, RawImage};

/// Supported image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Loads images from the local filesystem and converts them to RGB.
///
/// The format is sniffed from the file contents, so a mislabelled extension
/// still decodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

impl FsImageLoader {
    /// Creates a new loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, image: &ImageRef) -> Result<RawImage, LoadError> {
        let path = image.path();
        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let decode_error = |reason: String| LoadError::Decode {
            path: path.to_path_buf(),
            reason,
        };
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| decode_error(e.to_string()))?
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;

        debug!(
            "Loaded {} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );
        Ok(decoded.to_rgb8())
    }
}

/// Expands files and directories into an ordered list of image references.
///
/// Files are kept in argument order; directory contents are sorted by path.
/// Duplicates are kept. Unsupported files and missing paths are logged and
/// skipped.
#[must_use]
pub fn collect_images(paths: &[PathBuf], recursive: bool) -> Vec<ImageRef> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                files.push(ImageRef::new(path.clone()));
            } else {
                warn!("Unsupported file type: {}", path.display());
            }
        } else if path.is_dir() {
            collect_from_dir(path, recursive, &mut files);
        } else {
            warn!("Path does not exist: {}", path.display());
        }
    }

    debug!("Found {} image files", files.len());
    files
}

fn collect_from_dir(dir: &Path, recursive: bool, files: &mut Vec<ImageRef>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_file() && is_supported_image(&path) {
            files.push(ImageRef::new(path));
        } else if path.is_dir() && recursive {
            collect_from_dir(&path, recursive, files);
        }
    }
}

/// Checks if a path has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
