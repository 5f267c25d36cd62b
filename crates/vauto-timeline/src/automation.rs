//! Automated timeline population from a script and a voice track.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vauto_models::{BackgroundConfig, SegmentKind};

use crate::error::TimelineResult;
use crate::segmenter::{estimate_voice_duration, segment};
use crate::timeline::{Asset, AssetKind, Effect, Timeline, TimelineId, TrackKind, Transitions};

/// Background asset picked for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundChoice {
    pub kind: AssetKind,
    pub source: &'static str,
}

/// Fixed background lookup by segment kind.
pub fn background_for(kind: Option<SegmentKind>) -> BackgroundChoice {
    let (asset_kind, source) = match kind {
        Some(SegmentKind::Hook) => (AssetKind::Video, "dynamic_background_1.mp4"),
        Some(SegmentKind::Introduction) => (AssetKind::Video, "intro_background.mp4"),
        Some(SegmentKind::Main) => (AssetKind::Image, "content_background.jpg"),
        Some(SegmentKind::Conclusion) => (AssetKind::Video, "outro_background.mp4"),
        Some(SegmentKind::CallToAction) => (AssetKind::Video, "cta_background.mp4"),
        None => (AssetKind::Image, "default_background.jpg"),
    };
    BackgroundChoice {
        kind: asset_kind,
        source,
    }
}

/// Outcome of [`Timeline::populate_from_script_and_voice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub timeline_id: TimelineId,
    pub total_duration: f64,
    pub tracks_created: usize,
    pub assets_created: usize,
    pub segments_processed: usize,
}

impl Timeline {
    /// Lay out a voice track, subtitles and backgrounds for a script.
    ///
    /// The voice asset spans the estimated spoken length of the whole script.
    /// Segments are placed back to back from 0; each gets a subtitle and a
    /// background chosen by segment kind.
    pub fn populate_from_script_and_voice(
        &mut self,
        script: &str,
        voice_reference: Option<&str>,
        background: &BackgroundConfig,
    ) -> TimelineResult<PopulationSummary> {
        let segments = segment(script);

        let video_track = self.first_track_id(TrackKind::Video)?;
        let audio_track = self.first_track_id(TrackKind::Audio)?;
        let subtitle_track = self.first_track_id(TrackKind::Subtitle)?;

        let mut voice = Asset::new(
            AssetKind::Audio,
            "Generated Voice",
            0.0,
            estimate_voice_duration(script),
        );
        if let Some(reference) = voice_reference {
            voice = voice.with_source(reference);
        }
        self.add_asset(&audio_track, voice)?;

        let mut current_time = 0.0;
        for (index, seg) in segments.iter().enumerate() {
            let subtitle = Asset::new(
                AssetKind::Text,
                format!("Subtitle {}", index + 1),
                current_time,
                seg.duration,
            )
            .with_text(seg.text.clone());
            self.add_asset(&subtitle_track, subtitle)?;

            let choice = background_for(Some(seg.kind));
            let source = background
                .source_for(seg.kind)
                .unwrap_or(choice.source)
                .to_string();
            let mut backdrop = Asset::new(
                choice.kind,
                format!("Background {}", index + 1),
                current_time,
                seg.duration,
            )
            .with_source(source);

            if seg.kind == SegmentKind::Hook {
                backdrop = backdrop.with_effect(Effect::new("zoom_in").with_param("intensity", 1.2));
            } else if seg.kind.is_transition_boundary() {
                backdrop = backdrop.with_transitions(Transitions::new("fade_in", "fade_out"));
            }
            self.add_asset(&video_track, backdrop)?;

            current_time += seg.duration;
        }

        let summary = PopulationSummary {
            timeline_id: self.id.clone(),
            total_duration: self.duration,
            tracks_created: self.tracks.len(),
            assets_created: self.asset_count(),
            segments_processed: segments.len(),
        };
        debug!(
            timeline_id = %self.id,
            segments = summary.segments_processed,
            assets = summary.assets_created,
            duration = summary.total_duration,
            "Populated timeline"
        );
        Ok(summary)
    }
}
