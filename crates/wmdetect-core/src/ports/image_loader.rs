//! Image loader port.

use crate::domain::ImageRef;
use crate::error::LoadError;

use super::RawImage;

/// Port for reading an image reference into a decoded image.
pub trait ImageLoader: Send + Sync {
    /// Loads and decodes the referenced image. Never returns partial data.
    ///
    /// # Errors
    ///
    /// Returns a `LoadError` if the image is missing, unreadable or corrupt.
    fn load(&self, image: &ImageRef) -> Result<RawImage, LoadError>;
}
