//! Application configuration.
//!
//! Handles loading and validating `retouch.toml`. The file is optional: a
//! missing file means stock defaults, and a present file only needs the keys
//! it wants to override. Config drives the CLI and batch runs only; the
//! editing core takes every parameter explicitly.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [processing]
//! max_processes = 4         # Max parallel batch workers (omit for auto = CPU cores)
//!
//! [output]
//! format = "png"            # png | jpg | jpeg | tif | tiff | webp
//! suffix = "edited"         # Batch output name: <stem>-<suffix>.<format>
//! overwrite = false         # Replace existing batch outputs
//! quality = 90              # JPEG quality (1-100)
//!
//! [presets]
//! file = "presets.json"     # User preset library, merged over the stock presets
//!
//! [logging]
//! level = "info"            # error | warn | info | debug | trace
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::codec;
use crate::editing::{PresetError, PresetLibrary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Preset file {}: {source}", path.display())]
    Presets {
        path: PathBuf,
        #[source]
        source: PresetError,
    },
}

/// Configuration loaded from `retouch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Batch output naming and encoding.
    pub output: OutputConfig,
    /// User preset library.
    pub presets: PresetsConfig,
    pub logging: LoggingConfig,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if codec::format_for_extension(&self.output.format).is_err() {
            return Err(ConfigError::Validation(format!(
                "output.format '{}' is not one of: png, jpg, jpeg, tif, tiff, webp",
                self.output.format
            )));
        }
        if self.output.quality == 0 || self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.suffix must not contain path separators".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Batch output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output file extension; also selects the encoder.
    pub format: String,
    /// Appended to the source stem: `photo.jpg` → `photo-edited.png`.
    /// Empty keeps the stem unchanged.
    pub suffix: String,
    /// Replace outputs that already exist instead of skipping them.
    pub overwrite: bool,
    /// JPEG encoding quality.
    pub quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            suffix: "edited".to_string(),
            overwrite: false,
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetsConfig {
    /// JSON preset library. Relative paths resolve against the config file's
    /// directory.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log level; `RUST_LOG` and `-v` take precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Returns stock defaults if the file does not exist. Relative preset paths
/// are resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    if let (Some(file), Some(dir)) = (config.presets.file.as_mut(), path.parent())
        && file.is_relative()
    {
        *file = dir.join(&*file);
    }
    Ok(config)
}

/// Stock presets merged with the user library at `file`, if any.
pub fn load_preset_library(file: Option<&Path>) -> Result<PresetLibrary, ConfigError> {
    let mut library = PresetLibrary::stock();
    if let Some(path) = file {
        let content = fs::read_to_string(path)?;
        let user = PresetLibrary::from_json_str(&content).map_err(|source| {
            ConfigError::Presets {
                path: path.to_path_buf(),
                source,
            }
        })?;
        library.merge(user);
    }
    Ok(library)
}

/// Returns a fully-commented stock `retouch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# retouch configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch runs.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Batch output
# ---------------------------------------------------------------------------
[output]
# Output format, chosen by extension: png, jpg, jpeg, tif, tiff, webp.
# PNG and TIFF keep 16-bit depth and alpha; JPEG drops both; WebP is 8-bit.
format = "png"

# Output files are named <stem>-<suffix>.<format>. Empty keeps the stem.
suffix = "edited"

# Replace outputs that already exist (otherwise they are skipped).
overwrite = false

# JPEG quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
[presets]
# A JSON preset library merged over the built-in presets. Same-named
# presets in this file replace the built-in ones.
# file = "presets.json"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# error, warn, info, debug or trace. RUST_LOG and -v override this.
level = "info"
"##
}
