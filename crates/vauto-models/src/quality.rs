//! Output quality presets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Output quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Quality {
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "4k")]
    P4k,
}

/// Encoder settings for a quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Target video bitrate in kbit/s
    pub bitrate_kbps: u32,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
            Quality::P4k => "4k",
        }
    }

    pub fn settings(&self) -> QualitySettings {
        match self {
            Quality::P720 => QualitySettings {
                width: 1280,
                height: 720,
                fps: 30,
                bitrate_kbps: 2000,
            },
            Quality::P1080 => QualitySettings {
                width: 1920,
                height: 1080,
                fps: 30,
                bitrate_kbps: 4000,
            },
            Quality::P4k => QualitySettings {
                width: 3840,
                height: 2160,
                fps: 30,
                bitrate_kbps: 8000,
            },
        }
    }

    /// Multiplier applied to processing time estimates.
    pub fn processing_factor(&self) -> f64 {
        match self {
            Quality::P720 => 1.0,
            Quality::P1080 => 1.5,
            Quality::P4k => 3.0,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown quality preset: {0}")]
pub struct QualityParseError(pub String);

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "720p" => Ok(Quality::P720),
            "1080p" => Ok(Quality::P1080),
            "4k" | "2160p" => Ok(Quality::P4k),
            other => Err(QualityParseError(other.to_string())),
        }
    }
}
