// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur while loading or validating engine configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io {
        path: String,
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML for `EngineConfig`
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    /// The buffer high watermark must allow at least one element
    ZeroHighWatermark,
    /// The low watermark must sit strictly below the high watermark
    InvertedWatermarks {
        high_watermark: usize,
        low_watermark: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path, source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path, source)
            }
            ConfigError::ZeroHighWatermark => {
                write!(f, "Buffer high watermark must be greater than zero")
            }
            ConfigError::InvertedWatermarks {
                high_watermark,
                low_watermark,
            } => {
                write!(
                    f,
                    "Buffer low watermark ({}) must be lower than high watermark ({})",
                    low_watermark, high_watermark
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}
