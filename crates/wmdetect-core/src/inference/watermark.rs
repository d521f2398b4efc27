//! Binary watermark classifier.
//!
//! A ResNet-18 fine-tuned to two classes (0 = clean, 1 = watermark). Images
//! are resized to 224x224 and scaled to `[0, 1]` without mean/std
//! normalisation, matching how the weights were trained.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::VarBuilder;
use image::imageops::{self, FilterType};
use tracing::{debug, info};

use super::{argmax, load_safetensors, softmax, ResNet18};
use crate::domain::{Label, Prediction};
use crate::error::ModelLoadError;
use crate::ports::{Classifier, RawImage};

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;
/// Number of output classes.
pub const NUM_CLASSES: usize = 2;

/// Watermark classifier backed by a ResNet-18.
pub struct WatermarkClassifier {
    model: ResNet18,
    device: Device,
}

impl WatermarkClassifier {
    /// Builds the classifier from already-loaded weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let model = ResNet18::new(NUM_CLASSES, vb).context("Failed to build ResNet-18")?;
        Ok(Self { model, device })
    }

    /// Loads weights from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelLoadError::NotFound`] if the file does not exist and
    /// [`ModelLoadError::Incompatible`] if it cannot be parsed or does not
    /// describe a two-class ResNet-18.
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelLoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let incompatible = |err: anyhow::Error| ModelLoadError::Incompatible {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        };
        let vb = load_safetensors(path, device).map_err(incompatible)?;
        let classifier = Self::new(&vb).map_err(incompatible)?;

        info!("Loaded watermark model from {}", path.display());
        Ok(classifier)
    }

    /// Device the model runs on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Converts an RGB image into a `(1, 3, 224, 224)` tensor in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor cannot be created on the model device.
    pub fn preprocess(&self, image: &RawImage) -> Result<Tensor> {
        let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let size = INPUT_SIZE as usize;

        let mut data = vec![0f32; 3 * size * size];
        for (i, pixel) in resized.pixels().enumerate() {
            for (c, &value) in pixel.0.iter().enumerate() {
                data[c * size * size + i] = f32::from(value) / 255.0;
            }
        }

        Tensor::from_vec(data, (1, 3, size, size), &self.device)
            .context("Failed to create input tensor")
    }

    /// Per-class probabilities for one image, indexed by class.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or the forward pass fails.
    pub fn probabilities(&self, image: &RawImage) -> Result<Vec<f32>> {
        let input = self.preprocess(image)?;
        let logits = self
            .model
            .forward(&input)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .context("Forward pass failed")?;
        Ok(softmax(&logits))
    }
}

impl Classifier for WatermarkClassifier {
    fn classify(&self, image: &RawImage) -> Result<Prediction> {
        let probs = self.probabilities(image)?;
        let (index, confidence) =
            argmax(&probs).context("Model produced no class probabilities")?;
        debug!(?probs, index, "Watermark classification");
        Ok(Prediction::new(Label::from_class_index(index), confidence))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::DType;
    use image::{Rgb, RgbImage};
    use std::io::Write;

    fn zero_classifier() -> WatermarkClassifier {
        WatermarkClassifier::new(&VarBuilder::zeros(DType::F32, &Device::Cpu)).unwrap()
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let classifier = zero_classifier();
        let image = RgbImage::from_pixel(50, 30, Rgb([255, 0, 128]));

        let tensor = classifier.preprocess(&image).unwrap();
        assert_eq!(tensor.dims(), &[1, 3, 224, 224]);

        let values = tensor.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let plane = 224 * 224;
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!(values[plane].abs() < 1e-6);
        assert!((values[2 * plane] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_resolves_to_clean() {
        let classifier = zero_classifier();
        let image = RgbImage::from_pixel(64, 64, Rgb([10, 20, 30]));

        let prediction = classifier.classify(&image).unwrap();
        assert_eq!(prediction.label, Label::Clean);
        assert!((prediction.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file() {
        let err = WatermarkClassifier::load("/nonexistent/model.safetensors", &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, ModelLoadError::NotFound { .. }));
    }

    #[test]
    fn test_load_incompatible_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a model").unwrap();

        let err = WatermarkClassifier::load(file.path(), &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, ModelLoadError::Incompatible { .. }));
    }
}
