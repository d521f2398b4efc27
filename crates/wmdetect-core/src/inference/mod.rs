//! ML inference using Candle.
//!
//! Provides the ResNet-18 watermark classifier, safetensors weight loading,
//! device selection and the process-wide classifier instance.

mod device;
mod loader;
mod resnet;
mod shared;
mod utils;
mod watermark;

pub use device::{select_device, DevicePreference};
pub use loader::load_safetensors;
pub use resnet::ResNet18;
pub use shared::{init_shared, shared};
pub use utils::{argmax, softmax};
pub use watermark::{WatermarkClassifier, INPUT_SIZE, NUM_CLASSES};
