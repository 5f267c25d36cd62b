//! Script segmentation and multi-track timeline composition.
//!
//! This crate provides:
//! - The script segmenter (structural markers to timed segments)
//! - The timeline model (tracks, assets, overlap resolution)
//! - Automated timeline population from a script and a voice track
//! - Template styling

pub mod automation;
pub mod error;
pub mod segmenter;
pub mod template;
pub mod timeline;

pub use automation::{background_for, BackgroundChoice, PopulationSummary};
pub use error::{TimelineError, TimelineResult};
pub use segmenter::{estimate_voice_duration, segment, WORDS_PER_MINUTE};
pub use template::{Template, TEMPLATES};
pub use timeline::{
    Asset, AssetId, AssetKind, Effect, Timeline, TimelineId, Track, TrackId, TrackKind,
    Transitions,
};
