//! Script segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural section of a script.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Hook,
    Introduction,
    Main,
    Conclusion,
    CallToAction,
}

impl SegmentKind {
    pub const ALL: &'static [SegmentKind] = &[
        SegmentKind::Hook,
        SegmentKind::Introduction,
        SegmentKind::Main,
        SegmentKind::Conclusion,
        SegmentKind::CallToAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Hook => "hook",
            SegmentKind::Introduction => "introduction",
            SegmentKind::Main => "main",
            SegmentKind::Conclusion => "conclusion",
            SegmentKind::CallToAction => "call_to_action",
        }
    }

    /// Line prefix that opens a section of this kind.
    pub fn marker(&self) -> &'static str {
        match self {
            SegmentKind::Hook => "[HOOK",
            SegmentKind::Introduction => "[INTRODUCTION",
            SegmentKind::Main => "[MAIN CONTENT",
            SegmentKind::Conclusion => "[CONCLUSION",
            SegmentKind::CallToAction => "[CALL TO ACTION",
        }
    }

    /// Kinds that sit on a section boundary and get fade transitions.
    pub fn is_transition_boundary(&self) -> bool {
        matches!(self, SegmentKind::Introduction | SegmentKind::Conclusion)
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A text and duration unit derived from one section of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    /// Estimated spoken duration in seconds
    pub duration: f64,
}
