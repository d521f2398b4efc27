//! wmdetect adapters - external adapters for the detection pipeline.
//!
//! This crate provides adapters for:
//! - Filesystem image discovery and loading
//! - Model file resolution, checksum verification and loading

pub mod fs;
pub mod models;

pub use fs::{collect_images, is_supported_image, FsImageLoader};
pub use models::{
    load_classifier, models_dir, resolve_model_path, sha256_file, verify_checksum, DEFAULT_MODEL_FILE,
};
