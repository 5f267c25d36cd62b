//! Job request parameters and submission validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{Quality, SegmentKind};

/// Maximum accepted script length in characters.
pub const MAX_SCRIPT_CHARS: usize = 100_000;

/// Template ids the timeline styler knows about.
pub const KNOWN_TEMPLATES: &[&str] = &["minimal", "scientific", "storytelling"];

fn default_template_id() -> String {
    "minimal".to_string()
}

/// Background selection overrides.
///
/// The asset kind for each segment comes from the fixed background table;
/// `sources` only replaces the source reference for the listed kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundConfig {
    #[serde(default)]
    pub sources: BTreeMap<SegmentKind, String>,
}

impl BackgroundConfig {
    /// Override the background source for a segment kind.
    pub fn with_source(mut self, kind: SegmentKind, source: impl Into<String>) -> Self {
        self.sources.insert(kind, source.into());
        self
    }

    pub fn source_for(&self, kind: SegmentKind) -> Option<&str> {
        self.sources.get(&kind).map(String::as_str)
    }
}

/// Immutable parameters of a video creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRequest {
    /// Raw script text with optional section markers
    pub script_content: String,

    /// Reference (URL or path) to the voice track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_reference: Option<String>,

    /// Template applied to the timeline
    #[serde(default = "default_template_id")]
    pub template_id: String,

    /// Output quality preset
    #[serde(default)]
    pub quality: Quality,

    /// Background selection overrides
    #[serde(default)]
    pub background_config: BackgroundConfig,
}

impl JobRequest {
    pub fn new(script_content: impl Into<String>) -> Self {
        Self {
            script_content: script_content.into(),
            voice_reference: None,
            template_id: default_template_id(),
            quality: Quality::default(),
            background_config: BackgroundConfig::default(),
        }
    }

    /// Set the voice track reference.
    pub fn with_voice(mut self, voice_reference: impl Into<String>) -> Self {
        self.voice_reference = Some(voice_reference.into());
        self
    }

    /// Set the template id.
    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    /// Set the quality preset.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set background overrides.
    pub fn with_background(mut self, background_config: BackgroundConfig) -> Self {
        self.background_config = background_config;
        self
    }

    /// Validate the request before it is queued.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.script_content.trim().is_empty() {
            return Err(RequestError::EmptyScript);
        }

        let chars = self.script_content.chars().count();
        if chars > MAX_SCRIPT_CHARS {
            return Err(RequestError::ScriptTooLong {
                chars,
                max: MAX_SCRIPT_CHARS,
            });
        }

        if !KNOWN_TEMPLATES.contains(&self.template_id.as_str()) {
            return Err(RequestError::UnknownTemplate(self.template_id.clone()));
        }

        if let Some(voice) = &self.voice_reference {
            if voice.trim().is_empty() {
                return Err(RequestError::EmptyVoiceReference);
            }
        }

        Ok(())
    }

    /// Rough processing time estimate in seconds, scaled by script length and quality.
    pub fn estimated_processing_secs(&self) -> f64 {
        const BASE_SECS: f64 = 30.0;
        let length_factor = (self.script_content.chars().count() as f64 / 1000.0).min(3.0);
        BASE_SECS * (1.0 + length_factor) * self.quality.processing_factor()
    }
}

/// Malformed request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Script content is empty")]
    EmptyScript,

    #[error("Script is too long ({chars} chars, max {max})")]
    ScriptTooLong { chars: usize, max: usize },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Voice reference is empty")]
    EmptyVoiceReference,
}
