//! Multi-track timeline model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{TimelineError, TimelineResult};

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(TimelineId);
uuid_id!(TrackId);
uuid_id!(AssetId);

/// Default timeline length before any asset extends it, in seconds.
pub const DEFAULT_DURATION_SECS: f64 = 60.0;

/// Kind of media an asset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
    Text,
}

impl AssetKind {
    /// Whether template styling applies to this kind.
    pub fn is_visual(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Image)
    }
}

/// Kind of lane a track represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
            TrackKind::Subtitle => "subtitle",
        }
    }
}

/// Named effect with numeric parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
}

impl Effect {
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// Entry and exit transitions of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transitions {
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub transition_in: Option<String>,
    #[serde(rename = "out", skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<String>,
}

impl Transitions {
    pub fn new(transition_in: impl Into<String>, transition_out: impl Into<String>) -> Self {
        Self {
            transition_in: Some(transition_in.into()),
            transition_out: Some(transition_out.into()),
        }
    }
}

/// One placed media or text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub name: String,
    /// Length in seconds
    pub duration: f64,
    /// Position on the timeline in seconds
    pub start_time: f64,
    /// Owning track, set on insertion
    pub track_id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub transitions: Transitions,
}

impl Asset {
    pub fn new(kind: AssetKind, name: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            id: AssetId::new(),
            kind,
            name: name.into(),
            duration,
            start_time,
            track_id: TrackId(String::new()),
            source_reference: None,
            text_content: None,
            effects: Vec::new(),
            transitions: Transitions::default(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_reference = Some(source.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_transitions(mut self, transitions: Transitions) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    fn validate(&self) -> TimelineResult<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(TimelineError::invalid_asset(format!(
                "{}: start time {} must be >= 0",
                self.name, self.start_time
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(TimelineError::invalid_asset(format!(
                "{}: duration {} must be > 0",
                self.name, self.duration
            )));
        }
        Ok(())
    }
}

/// An ordered lane of assets of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    pub order_index: usize,
    pub enabled: bool,
    pub muted: bool,
    pub locked: bool,
    /// Assets in insertion order
    pub assets: Vec<Asset>,
}

impl Track {
    fn new(kind: TrackKind, name: impl Into<String>, order_index: usize) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            name: name.into(),
            order_index,
            enabled: true,
            muted: false,
            locked: false,
            assets: Vec::new(),
        }
    }

    /// Make room for an asset spanning `[start, end)`.
    ///
    /// Every existing asset is compared once against the new interval:
    /// fully covered assets are removed, assets overlapping at their tail are
    /// truncated at `start`, assets overlapping at their head are moved to
    /// `end`. An insertion strictly inside an existing asset truncates it at
    /// `start` and its tail is dropped rather than split off.
    fn resolve_overlaps(&mut self, start: f64, end: f64) {
        self.assets.retain_mut(|existing| {
            let existing_start = existing.start_time;
            let existing_end = existing.end_time();

            if !(start < existing_end && end > existing_start) {
                return true;
            }

            if start <= existing_start && end >= existing_end {
                debug!(asset_id = %existing.id, "Removing fully covered asset");
                return false;
            }

            if start > existing_start && start < existing_end {
                existing.duration = start - existing_start;
            } else if end > existing_start && end < existing_end {
                existing.duration = existing_end - end;
                existing.start_time = end;
            }
            true
        });
    }
}

/// The multi-track composition for one video project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: TimelineId,
    pub project_id: String,
    /// Length in seconds; grows with inserted assets
    pub duration: f64,
    pub frame_rate: u32,
    pub resolution: (u32, u32),
    pub created_at: DateTime<Utc>,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Timeline {
    /// Create a timeline with the default video, audio and subtitle tracks.
    pub fn new(project_id: impl Into<String>) -> Self {
        let mut timeline = Self {
            id: TimelineId::new(),
            project_id: project_id.into(),
            duration: DEFAULT_DURATION_SECS,
            frame_rate: 30,
            resolution: (1920, 1080),
            created_at: Utc::now(),
            tracks: Vec::new(),
            metadata: BTreeMap::new(),
        };
        timeline.create_default_tracks();
        timeline
    }

    fn create_default_tracks(&mut self) {
        self.add_track(TrackKind::Video, "Video 1");
        self.add_track(TrackKind::Audio, "Audio 1");
        self.add_track(TrackKind::Subtitle, "Subtitles");
    }

    /// Append a track after the existing ones.
    pub fn add_track(&mut self, kind: TrackKind, name: impl Into<String>) -> &Track {
        let track = Track::new(kind, name, self.tracks.len());
        self.tracks.push(track);
        &self.tracks[self.tracks.len() - 1]
    }

    pub fn get_track(&self, track_id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == track_id)
    }

    pub fn get_track_mut(&mut self, track_id: &TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.id == track_id)
    }

    /// Tracks of a kind, ordered by `order_index`.
    pub fn get_tracks_by_kind(&self, kind: TrackKind) -> Vec<&Track> {
        let mut tracks: Vec<&Track> = self.tracks.iter().filter(|t| t.kind == kind).collect();
        tracks.sort_by_key(|t| t.order_index);
        tracks
    }

    /// First track of a kind, by `order_index`.
    pub fn first_track_id(&self, kind: TrackKind) -> TimelineResult<TrackId> {
        self.get_tracks_by_kind(kind)
            .first()
            .map(|t| t.id.clone())
            .ok_or(TimelineError::MissingTrack(kind.as_str()))
    }

    /// Place an asset on a track, resolving overlaps with its current assets.
    pub fn add_asset(&mut self, track_id: &TrackId, mut asset: Asset) -> TimelineResult<()> {
        asset.validate()?;

        let track = self
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::track_not_found(track_id))?;

        let end = asset.end_time();
        track.resolve_overlaps(asset.start_time, end);
        asset.track_id = track.id.clone();
        track.assets.push(asset);

        if end > self.duration {
            self.duration = end;
        }
        Ok(())
    }

    /// Explicitly set the duration, including shrinking it.
    pub fn reset_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    pub fn asset_count(&self) -> usize {
        self.tracks.iter().map(|t| t.assets.len()).sum()
    }

    /// Iterate over every asset on every track.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.tracks.iter().flat_map(|t| t.assets.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(start: f64, duration: f64) -> Asset {
        Asset::new(AssetKind::Video, "clip", start, duration)
    }

    fn spans(track: &Track) -> Vec<(f64, f64)> {
        track
            .assets
            .iter()
            .map(|a| (a.start_time, a.duration))
            .collect()
    }

    #[test]
    fn test_default_tracks() {
        let timeline = Timeline::new("project");
        let kinds: Vec<_> = timeline.tracks.iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![TrackKind::Video, TrackKind::Audio, TrackKind::Subtitle]
        );
        assert_eq!(
            timeline.tracks.iter().map(|t| t.order_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(timeline.duration, DEFAULT_DURATION_SECS);
    }

    #[test]
    fn test_add_track_order_index() {
        let mut timeline = Timeline::new("project");
        let track = timeline.add_track(TrackKind::Video, "Overlay");
        assert_eq!(track.order_index, 3);

        let videos = timeline.get_tracks_by_kind(TrackKind::Video);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].name, "Video 1");
        assert_eq!(videos[1].name, "Overlay");
    }

    #[test]
    fn test_add_asset_unknown_track() {
        let mut timeline = Timeline::new("project");
        let result = timeline.add_asset(&TrackId::new(), video(0.0, 5.0));
        assert!(matches!(result, Err(TimelineError::TrackNotFound(_))));
        assert_eq!(timeline.asset_count(), 0);
    }

    #[test]
    fn test_add_asset_rejects_invalid_spans() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        assert!(matches!(
            timeline.add_asset(&track_id, video(0.0, 0.0)),
            Err(TimelineError::InvalidAsset(_))
        ));
        assert!(matches!(
            timeline.add_asset(&track_id, video(-1.0, 2.0)),
            Err(TimelineError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_disjoint_insertions_are_kept() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        for i in 0..5 {
            timeline
                .add_asset(&track_id, video(i as f64 * 10.0, 10.0))
                .unwrap();
        }

        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(track.assets.len(), 5);
        assert!(track.assets.iter().all(|a| a.duration == 10.0));
        assert!(track.assets.iter().all(|a| a.track_id == track_id));
    }

    #[test]
    fn test_covering_asset_replaces_existing() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        timeline.add_asset(&track_id, video(0.0, 10.0)).unwrap();
        let replacement = video(0.0, 10.0);
        let replacement_id = replacement.id.clone();
        timeline.add_asset(&track_id, replacement).unwrap();

        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(track.assets.len(), 1);
        assert_eq!(track.assets[0].id, replacement_id);
    }

    #[test]
    fn test_tail_overlap_truncates_existing() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        timeline.add_asset(&track_id, video(0.0, 10.0)).unwrap();
        timeline.add_asset(&track_id, video(5.0, 10.0)).unwrap();

        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(spans(track), vec![(0.0, 5.0), (5.0, 10.0)]);
    }

    #[test]
    fn test_head_overlap_moves_existing() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        timeline.add_asset(&track_id, video(5.0, 10.0)).unwrap();
        timeline.add_asset(&track_id, video(0.0, 8.0)).unwrap();

        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(spans(track), vec![(8.0, 7.0), (0.0, 8.0)]);
    }

    #[test]
    fn test_insertion_spanning_two_assets() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        timeline.add_asset(&track_id, video(0.0, 4.0)).unwrap();
        timeline.add_asset(&track_id, video(4.0, 4.0)).unwrap();
        timeline.add_asset(&track_id, video(8.0, 4.0)).unwrap();
        timeline.add_asset(&track_id, video(2.0, 8.0)).unwrap();

        // [0,4) truncated, [4,8) removed, [8,12) moved to start at 10.
        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(spans(track), vec![(0.0, 2.0), (10.0, 2.0), (2.0, 8.0)]);
    }

    #[test]
    fn test_insertion_inside_existing_drops_tail() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();

        timeline.add_asset(&track_id, video(0.0, 10.0)).unwrap();
        timeline.add_asset(&track_id, video(3.0, 2.0)).unwrap();

        // Single pass: the existing asset is truncated at 3.0 and [5,10) is lost.
        let track = timeline.get_track(&track_id).unwrap();
        assert_eq!(spans(track), vec![(0.0, 3.0), (3.0, 2.0)]);
    }

    #[test]
    fn test_duration_grows_never_shrinks() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Audio).unwrap();

        timeline
            .add_asset(&track_id, Asset::new(AssetKind::Audio, "voice", 0.0, 75.0))
            .unwrap();
        assert_eq!(timeline.duration, 75.0);

        timeline
            .add_asset(&track_id, Asset::new(AssetKind::Audio, "voice", 0.0, 10.0))
            .unwrap();
        assert_eq!(timeline.duration, 75.0);

        timeline.reset_duration(12.0);
        assert_eq!(timeline.duration, 12.0);
    }

    #[test]
    fn test_timeline_serde_roundtrip() {
        let mut timeline = Timeline::new("project");
        let track_id = timeline.first_track_id(TrackKind::Video).unwrap();
        timeline
            .add_asset(
                &track_id,
                video(0.0, 4.0)
                    .with_source("bg.mp4")
                    .with_effect(Effect::new("zoom_in").with_param("intensity", 1.2))
                    .with_transitions(Transitions::new("fade_in", "fade_out")),
            )
            .unwrap();

        let json = serde_json::to_value(&timeline).unwrap();
        let asset = &json["tracks"][0]["assets"][0];
        assert_eq!(asset["effects"][0]["type"], "zoom_in");
        assert_eq!(asset["transitions"]["in"], "fade_in");

        let parsed: Timeline = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, timeline);
    }
}
