//! Classifier port.

use crate::domain::Prediction;

/// Decoded image in the classifier's input representation.
pub type RawImage = image::RgbImage;

/// Port for the binary watermark classifier.
///
/// Implementations must be deterministic for a fixed model and input and safe
/// to call repeatedly. They are not required to support concurrent calls; the
/// batch runner keeps at most one call in flight.
pub trait Classifier: Send + Sync {
    /// Classifies a decoded image.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails. The runner reports it as a failed
    /// item and moves on.
    fn classify(&self, image: &RawImage) -> anyhow::Result<Prediction>;
}
