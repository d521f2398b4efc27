//! Configuration file support for wmdetect.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/wmdetect/config.toml` (lowest priority)
//! - Project-local: `.wmdetect.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// Name of the project-local config file.
pub const PROJECT_CONFIG_FILE: &str = ".wmdetect.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Model file settings.
    pub model: ModelConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Explicit weights file.
    pub path: Option<PathBuf>,
    /// Directory holding `watermark_detector.safetensors`.
    pub dir: Option<PathBuf>,
    /// Expected SHA-256 of the weights file (hex).
    pub sha256: Option<String>,
    /// Force CPU inference.
    pub cpu: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Missing files are silently ignored. Invalid values are reported as a
    /// warning and the config is still used.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), String> {
        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        if let Some(ref digest) = self.model.sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!(
                    "model.sha256 must be 64 hexadecimal characters, got '{digest}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        self.model.path = other.model.path.or_else(|| self.model.path.take());
        self.model.dir = other.model.dir.or_else(|| self.model.dir.take());
        self.model.sha256 = other.model.sha256.or_else(|| self.model.sha256.take());
        self.model.cpu = other.model.cpu.or(self.model.cpu);

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wmdetect").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|path| path.exists())
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.general.recursive.is_none());
        assert!(config.model.path.is_none());
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[general]
recursive = true

[model]
dir = '/opt/models'
sha256 = 'ABCDEF0123456789abcdef0123456789abcdef0123456789abcdef0123456789'
cpu = true

[output]
format = 'json'
pretty = true
progress = false
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.general.recursive, Some(true));
        assert_eq!(config.model.dir, Some(PathBuf::from("/opt/models")));
        assert_eq!(config.model.cpu, Some(true));
        assert_eq!(config.output.format.as_deref(), Some("json"));
        assert_eq!(config.output.pretty, Some(true));
        assert_eq!(config.output.progress, Some(false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_overrides_present_values_only() {
        let mut base: AppConfig = toml::from_str(
            r"
[general]
recursive = true

[model]
dir = '/xdg/models'

[output]
format = 'jsonl'
",
        )
        .unwrap();
        let project: AppConfig = toml::from_str(
            r"
[model]
path = './weights.safetensors'

[output]
format = 'json'
",
        )
        .unwrap();

        base.merge(project);

        assert_eq!(base.general.recursive, Some(true));
        assert_eq!(base.model.dir, Some(PathBuf::from("/xdg/models")));
        assert_eq!(
            base.model.path,
            Some(PathBuf::from("./weights.safetensors"))
        );
        assert_eq!(base.output.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base = AppConfig::default();
        base.model.sha256 = Some("a".repeat(64));
        base.output.pretty = Some(true);

        base.merge(AppConfig::default());

        assert_eq!(base.model.sha256, Some("a".repeat(64)));
        assert_eq!(base.output.pretty, Some(true));
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let toml = r#"
[general]
recursive = "sometimes"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "type mismatch should return error");
    }

    #[test]
    fn test_unknown_section_ignored() {
        let toml = r"
[output]
pretty = true

[experimental]
batch_size = 8
";
        let config: AppConfig = toml::from_str(toml).expect("unknown sections are ignored");
        assert_eq!(config.output.pretty, Some(true));
    }

    #[test]
    fn test_validate_output_format_invalid() {
        let mut config = AppConfig::default();
        config.output.format = Some("xml".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.contains("output.format"));
    }

    #[test]
    fn test_validate_sha256() {
        let mut config = AppConfig::default();
        config.model.sha256 = Some("1234".to_string());
        assert!(config.validate().unwrap_err().contains("model.sha256"));

        config.model.sha256 = Some("g".repeat(64));
        assert!(config.validate().is_err());

        config.model.sha256 = Some("0".repeat(64));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_find_config_in_parents() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let found = find_config_in_parents(&nested).unwrap();
        assert_eq!(found, temp.path().join(PROJECT_CONFIG_FILE));
    }
}
