//! Model command - inspect the weights file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use wmdetect_adapters::{load_classifier, resolve_model_path, sha256_file};
use wmdetect_core::inference::{select_device, DevicePreference, WatermarkClassifier};
use wmdetect_core::ModelLoadError;

use crate::config::AppConfig;

/// Where the weights come from and how they are loaded.
#[derive(Args, Clone, Debug, Default)]
pub struct ModelSource {
    /// Weights file (overrides --models-dir and config)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Directory containing watermark_detector.safetensors
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Run inference on the CPU even if an accelerator is available
    #[arg(long)]
    pub cpu: bool,

    /// Expected SHA-256 of the weights (config only).
    #[arg(skip)]
    pub sha256: Option<String>,
}

impl ModelSource {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Any model location given on the command line hides both config
    /// locations, so `--models-dir` beats `[model] path`.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.model.is_none() && self.models_dir.is_none() {
            self.model.clone_from(&config.model.path);
            self.models_dir.clone_from(&config.model.dir);
        }
        if !self.cpu {
            self.cpu = config.model.cpu.unwrap_or(false);
        }
        if self.sha256.is_none() {
            self.sha256.clone_from(&config.model.sha256);
        }
        self
    }

    /// The weights file that will be loaded.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        resolve_model_path(self.model.as_deref(), self.models_dir.as_deref())
    }

    /// Verifies and loads the process-wide classifier.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelLoadError`] if the weights are missing, fail the
    /// checksum, or are incompatible.
    pub fn load(&self) -> Result<Arc<WatermarkClassifier>, ModelLoadError> {
        let preference = if self.cpu {
            DevicePreference::Cpu
        } else {
            DevicePreference::Auto
        };
        load_classifier(
            &self.path(),
            self.sha256.as_deref(),
            &select_device(preference),
        )
    }
}

/// Arguments for the model command
#[derive(Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommand,
}

/// Model subcommands
#[derive(Subcommand)]
pub enum ModelCommand {
    /// Print the resolved weights path
    Path(ModelSource),
    /// Verify that the weights exist, match the checksum and load
    Check(ModelSource),
}

/// Run the model command.
pub fn run(args: &ModelArgs, config: &AppConfig) -> Result<()> {
    match &args.command {
        ModelCommand::Path(source) => {
            println!("{}", source.clone().with_config(config).path().display());
            Ok(())
        }
        ModelCommand::Check(source) => check(&source.clone().with_config(config)),
    }
}

fn check(source: &ModelSource) -> Result<()> {
    let path = source.path();
    source.load()?;
    let digest = sha256_file(&path)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    println!("ok: {} (sha256 {digest})", path.display());
    Ok(())
}
