//! Timeline error types.

use thiserror::Error;

pub type TimelineResult<T> = Result<T, TimelineError>;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Timeline has no {0} track")]
    MissingTrack(&'static str),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
}

impl TimelineError {
    pub fn track_not_found(id: impl ToString) -> Self {
        Self::TrackNotFound(id.to_string())
    }

    pub fn invalid_asset(msg: impl Into<String>) -> Self {
        Self::InvalidAsset(msg.into())
    }
}
