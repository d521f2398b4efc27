//! Device selection for inference.

use candle_core::Device;
use tracing::info;

/// Which device the classifier should run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Use an accelerator when one is compiled in and available.
    #[default]
    Auto,
    /// Always run on the CPU.
    Cpu,
}

/// Returns the device to load the model onto.
///
/// With `Auto`, tries Metal, then CUDA (each only when its cargo feature is
/// enabled) before falling back to the CPU.
#[must_use]
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        info!("Using CPU for inference (requested)");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal device for inference");
            return device;
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA device for inference");
            return device;
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}
