//! Error types for the detection pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::RunId;

/// Failure to read an image into the classifier's input representation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

/// Per-item failure. Never aborts a batch; becomes a `Failure` outcome.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    #[error("classification failed: {0:#}")]
    Classify(anyhow::Error),

    #[error("{stage} failed: worker panicked: {message}")]
    Panicked {
        stage: &'static str,
        message: String,
    },
}

/// Errors returned synchronously by the batch runner.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunnerError {
    #[error("runner busy: run {active} is still active")]
    Busy { active: RunId },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Fatal failure to load the classifier at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("incompatible model weights in {}: {reason}", path.display())]
    Incompatible { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_error_reason_prefixes() {
        let load = ItemError::from(LoadError::NotFound {
            path: PathBuf::from("missing.jpg"),
        });
        assert_eq!(load.to_string(), "load failed: file not found: missing.jpg");

        let classify = ItemError::Classify(anyhow::anyhow!("shape mismatch"));
        assert!(classify.to_string().starts_with("classification failed:"));
    }

    #[test]
    fn test_busy_message_names_active_run() {
        let err = RunnerError::Busy { active: RunId(3) };
        assert_eq!(err.to_string(), "runner busy: run #3 is still active");
    }
}
