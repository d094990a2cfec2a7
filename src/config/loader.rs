// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_BUFFER_HIGH_WATERMARK, DEFAULT_BUFFER_LOW_WATERMARK};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure for the graph execution engine.
///
/// Every section is optional; a missing section falls back to its defaults.
///
/// # Example
/// ```yaml
/// buffer:
///   high_watermark: 16
///   low_watermark: 8
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub buffer: BufferConfig,
}

impl EngineConfig {
    /// Check every section for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buffer.validate()
    }
}

/// Buffering and demand replenishment for a subscriber inlet.
///
/// The inlet keeps `outstanding demand + buffered elements` at or below
/// `high_watermark`, and tops the sum back up to `high_watermark` once it
/// drops to `low_watermark` or below.
///
/// # Fields
/// * `high_watermark` - Maximum elements requested or buffered at once (defaults to 8)
/// * `low_watermark` - Level that triggers the next batched request (defaults to 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_high_watermark")]
    pub high_watermark: usize,
    #[serde(default = "default_low_watermark")]
    pub low_watermark: usize,
}

fn default_high_watermark() -> usize {
    DEFAULT_BUFFER_HIGH_WATERMARK
}

fn default_low_watermark() -> usize {
    DEFAULT_BUFFER_LOW_WATERMARK
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            high_watermark: DEFAULT_BUFFER_HIGH_WATERMARK,
            low_watermark: DEFAULT_BUFFER_LOW_WATERMARK,
        }
    }
}

impl BufferConfig {
    pub fn new(high_watermark: usize, low_watermark: usize) -> Self {
        Self {
            high_watermark,
            low_watermark,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_watermark == 0 {
            return Err(ConfigError::ZeroHighWatermark);
        }
        if self.low_watermark >= self.high_watermark {
            return Err(ConfigError::InvertedWatermarks {
                high_watermark: self.high_watermark,
                low_watermark: self.low_watermark,
            });
        }
        Ok(())
    }
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load a config from a YAML file and reject values the engine cannot run with
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_buffer_section() {
        let yaml = r#"
buffer:
  high_watermark: 10
  low_watermark: 5
"#;

        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.buffer, BufferConfig::new(10, 5));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.buffer.high_watermark, DEFAULT_BUFFER_HIGH_WATERMARK);
        assert_eq!(cfg.buffer.low_watermark, DEFAULT_BUFFER_LOW_WATERMARK);

        let partial: EngineConfig = serde_yaml::from_str("buffer:\n  high_watermark: 32\n").unwrap();
        assert_eq!(partial.buffer, BufferConfig::new(32, DEFAULT_BUFFER_LOW_WATERMARK));
    }

    #[test]
    fn validate_rejects_bad_watermarks() {
        assert!(matches!(
            BufferConfig::new(0, 0).validate(),
            Err(ConfigError::ZeroHighWatermark)
        ));
        let error = BufferConfig::new(4, 4).validate().unwrap_err();
        assert!(error.to_string().contains("must be lower than high watermark (4)"));
        assert!(BufferConfig::new(1, 0).validate().is_ok());
    }

    #[test]
    fn test_load_and_validate_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "buffer:\n  high_watermark: 16\n  low_watermark: 8").unwrap();

        let cfg = load_and_validate_config(file.path()).expect("config should load");
        assert_eq!(cfg.buffer, BufferConfig::new(16, 8));
    }

    #[test]
    fn test_load_and_validate_inverted_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "buffer:\n  high_watermark: 2\n  low_watermark: 6").unwrap();

        let result = load_and_validate_config(file.path());
        assert!(matches!(
            result,
            Err(ConfigError::InvertedWatermarks {
                high_watermark: 2,
                low_watermark: 6
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/definitely/not/here.yaml");
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("Failed to read config file"));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "buffer: [not, a, map]").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
