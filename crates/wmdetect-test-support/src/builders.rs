//! Synthetic images and model weights for testing.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use image::{Rgb, RgbImage};
use wmdetect_core::inference::{softmax, ResNet18, NUM_CLASSES};
use wmdetect_core::Label;

/// Builder for creating synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates an image filled with one colour.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    /// Creates a smooth diagonal colour gradient.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient(width: u32, height: u32) -> RgbImage {
        let (w, h) = (width.max(1), height.max(1));
        RgbImage::from_fn(width, height, |x, y| {
            let r = (255 * x / w) as u8;
            let g = (255 * y / h) as u8;
            Rgb([r, g, 128])
        })
    }

    /// A gradient with a repeating translucent white stripe pattern on top,
    /// roughly what a tiled text watermark looks like.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_overlay(width: u32, height: u32) -> RgbImage {
        let mut img = Self::gradient(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            if (x + y) % 32 < 4 {
                for channel in &mut pixel.0 {
                    *channel = ((u16::from(*channel) + 255) / 2) as u8;
                }
            }
        }
        img
    }

    /// Encodes `image` to `path`; the format follows the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown or the write fails.
    pub fn write(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Writes bytes that no image decoder accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_corrupt(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, b"\x89PNG\r\n\x1a\nthis is not really a png")
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Writes ResNet-18 safetensors files whose output ignores the input.
///
/// The backbone is randomly initialised, the head weights are zero and the
/// head bias holds the requested logits, so every image produces exactly
/// those logits.
#[derive(Debug, Clone, Copy)]
pub struct ModelWeightsBuilder {
    logits: [f32; NUM_CLASSES],
}

impl ModelWeightsBuilder {
    /// Weights that score both classes equally.
    #[must_use]
    pub const fn new() -> Self {
        Self { logits: [0.0; NUM_CLASSES] }
    }

    /// Weights that prefer `label` by `margin` logits.
    #[must_use]
    pub fn favouring(label: Label, margin: f32) -> Self {
        let logits = match label {
            Label::Watermarked => [0.0, margin],
            Label::Clean => [margin, 0.0],
        };
        Self { logits }
    }

    /// The confidence every classification with these weights reports.
    #[must_use]
    pub fn expected_confidence(&self) -> f32 {
        softmax(&self.logits).into_iter().fold(0.0, f32::max)
    }

    /// Writes the weights to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be built or the file written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let device = Device::Cpu;
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        ResNet18::new(NUM_CLASSES, &vb)?;

        varmap.set_one("fc.weight", Tensor::zeros((NUM_CLASSES, 512), DType::F32, &device)?)?;
        varmap.set_one("fc.bias", Tensor::new(&self.logits, &device)?)?;
        varmap
            .save(path.as_ref())
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))
    }
}

impl Default for ModelWeightsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
