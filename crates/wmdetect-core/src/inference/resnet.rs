//! ResNet-18 backbone with a configurable classification head.
//!
//! Parameter names follow the torchvision layout (`conv1`, `bn1`,
//! `layer{1..4}.{0,1}.*`, `downsample.{0,1}`, `fc`), so weights exported from a
//! fine-tuned torchvision model load without renaming.

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, BatchNorm, Conv2d, Conv2dConfig, Linear, VarBuilder,
};

const BN_EPS: f64 = 1e-5;

/// Channels and stride of the first block in each of the four stages.
const STAGES: [(usize, usize, usize); 4] = [(64, 64, 1), (64, 128, 2), (128, 256, 2), (256, 512, 2)];

fn conv(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    vb: VarBuilder,
) -> Result<Conv2d> {
    conv2d_no_bias(
        in_channels,
        out_channels,
        kernel,
        Conv2dConfig {
            stride,
            padding,
            ..Conv2dConfig::default()
        },
        vb,
    )
}

/// Two 3x3 convolutions with an identity (or projected) shortcut.
struct BasicBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    downsample: Option<(Conv2d, BatchNorm)>,
}

impl BasicBlock {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: &VarBuilder) -> Result<Self> {
        let downsample = if stride != 1 || in_channels != out_channels {
            Some((
                conv(in_channels, out_channels, 1, stride, 0, vb.pp("downsample.0"))?,
                batch_norm(out_channels, BN_EPS, vb.pp("downsample.1"))?,
            ))
        } else {
            None
        };

        Ok(Self {
            conv1: conv(in_channels, out_channels, 3, stride, 1, vb.pp("conv1"))?,
            bn1: batch_norm(out_channels, BN_EPS, vb.pp("bn1"))?,
            conv2: conv(out_channels, out_channels, 3, 1, 1, vb.pp("conv2"))?,
            bn2: batch_norm(out_channels, BN_EPS, vb.pp("bn2"))?,
            downsample,
        })
    }
}

impl Module for BasicBlock {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let shortcut = match &self.downsample {
            Some((conv, bn)) => x.apply(conv)?.apply_t(bn, false)?,
            None => x.clone(),
        };
        let y = x
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?;
        (y + shortcut)?.relu()
    }
}

/// ResNet-18 in inference mode (batch norm uses running statistics).
///
/// Input: `(N, 3, H, W)` float tensor. Output: `(N, num_classes)` logits.
/// Global average pooling makes the network accept any spatial size of at
/// least 32x32.
pub struct ResNet18 {
    conv1: Conv2d,
    bn1: BatchNorm,
    blocks: Vec<BasicBlock>,
    fc: Linear,
}

impl ResNet18 {
    /// Builds the network, reading every parameter from `vb`.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    pub fn new(num_classes: usize, vb: &VarBuilder) -> Result<Self> {
        let mut blocks = Vec::with_capacity(STAGES.len() * 2);
        for (i, &(in_channels, out_channels, stride)) in STAGES.iter().enumerate() {
            let stage = vb.pp(format!("layer{}", i + 1));
            blocks.push(BasicBlock::new(in_channels, out_channels, stride, &stage.pp("0"))?);
            blocks.push(BasicBlock::new(out_channels, out_channels, 1, &stage.pp("1"))?);
        }

        Ok(Self {
            conv1: conv(3, 64, 7, 2, 3, vb.pp("conv1"))?,
            bn1: batch_norm(64, BN_EPS, vb.pp("bn1"))?,
            blocks,
            fc: linear(512, num_classes, vb.pp("fc"))?,
        })
    }
}

impl Module for ResNet18 {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        // Replicate padding is equivalent to -inf padding under a max pool.
        let mut x = x
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .pad_with_same(D::Minus1, 1, 1)?
            .pad_with_same(D::Minus2, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;

        for block in &self.blocks {
            x = block.forward(&x)?;
        }

        x.mean((2, 3))?.apply(&self.fc)
    }
}
