//! Safetensors weight loading.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// Every tensor is converted to `F32`, the dtype the classifier computes in.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors, or
/// holds a tensor with an unsupported dtype.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::with_capacity(tensors.len());
    for (name, view) in tensors.tensors() {
        let dtype = candle_dtype(view.dtype())
            .with_context(|| format!("Tensor '{name}' has an unsupported dtype"))?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .and_then(|t| t.to_dtype(DType::F32))
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensor_map.insert(name, tensor);
    }
    debug!("Loaded {} tensors", tensor_map.len());

    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("{other:?}"),
    }
}
