//! Script segmenter.
//!
//! Splits raw script text into typed segments on line-leading section
//! markers (`[HOOK]`, `[INTRODUCTION]`, `[MAIN CONTENT]`, `[CONCLUSION]`,
//! `[CALL TO ACTION]`) and estimates the spoken duration of each one.
//!
//! Text before the first marker belongs to a `main` segment. Segments whose
//! text ends up empty are not emitted, so an empty script (or a script made
//! only of markers) yields no segments at all.

use vauto_models::{Segment, SegmentKind};

/// Assumed speaking rate.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Minimum duration of a single segment, in seconds.
pub const MIN_SEGMENT_SECS: f64 = 3.0;

/// Minimum duration of the whole voice track, in seconds.
pub const MIN_VOICE_SECS: f64 = 30.0;

fn spoken_secs(word_count: usize) -> f64 {
    word_count as f64 / WORDS_PER_MINUTE * 60.0
}

fn marker_kind(line: &str) -> Option<SegmentKind> {
    SegmentKind::ALL
        .iter()
        .copied()
        .find(|kind| line.starts_with(kind.marker()))
}

struct OpenSegment {
    kind: SegmentKind,
    lines: Vec<String>,
}

impl OpenSegment {
    fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    fn close(self, out: &mut Vec<Segment>) {
        if self.lines.is_empty() {
            return;
        }
        let text = self.lines.join("\n");
        let duration = spoken_secs(text.split_whitespace().count()).max(MIN_SEGMENT_SECS);
        out.push(Segment {
            kind: self.kind,
            text,
            duration,
        });
    }
}

/// Split a script into ordered segments.
pub fn segment(script: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = OpenSegment::new(SegmentKind::Main);

    for line in script.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        match marker_kind(line) {
            Some(kind) => {
                let finished = std::mem::replace(&mut current, OpenSegment::new(kind));
                finished.close(&mut segments);
            }
            None => current.lines.push(line.to_string()),
        }
    }

    current.close(&mut segments);
    segments
}

/// Estimate the spoken duration of the whole script.
pub fn estimate_voice_duration(script: &str) -> f64 {
    spoken_secs(script.split_whitespace().count()).max(MIN_VOICE_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_and_main_content() {
        let segments = segment("[HOOK]\nCome see this\n\n[MAIN CONTENT]\nHere is the body");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::Hook);
        assert_eq!(segments[0].text, "Come see this");
        assert_eq!(segments[1].kind, SegmentKind::Main);
        assert_eq!(segments[1].text, "Here is the body");
        assert!(segments.iter().all(|s| s.duration >= MIN_SEGMENT_SECS));
    }

    #[test]
    fn test_unmarked_leading_text_is_main() {
        let segments = segment("Intro without a marker\n[CONCLUSION]\nBye now");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::Main);
        assert_eq!(segments[1].kind, SegmentKind::Conclusion);
    }

    #[test]
    fn test_all_markers_in_order() {
        let script = "[HOOK - 5s]\na\n[INTRODUCTION]\nb\n[MAIN CONTENT]\nc\n[CONCLUSION]\nd\n[CALL TO ACTION]\ne";
        let kinds: Vec<_> = segment(script).into_iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SegmentKind::Hook,
                SegmentKind::Introduction,
                SegmentKind::Main,
                SegmentKind::Conclusion,
                SegmentKind::CallToAction,
            ]
        );
    }

    #[test]
    fn test_empty_sections_are_skipped() {
        let segments = segment("[HOOK]\n\n[INTRODUCTION]\nOnly this one has words");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Introduction);
    }

    #[test]
    fn test_empty_script_yields_nothing() {
        assert!(segment("").is_empty());
        assert!(segment("  \n\n\t").is_empty());
        assert!(segment("[HOOK]\n[MAIN CONTENT]").is_empty());
    }

    #[test]
    fn test_indented_markers_and_other_lines() {
        let segments = segment("   [HOOK]\n  [pause] then words  \nmore");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Hook);
        assert_eq!(segments[0].text, "[pause] then words\nmore");
    }

    #[test]
    fn test_duration_from_word_count() {
        let words = vec!["word"; 300].join(" ");
        let segments = segment(&words);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].duration - 120.0).abs() < 1e-9);

        let short = segment("two words");
        assert_eq!(short[0].duration, MIN_SEGMENT_SECS);
    }

    #[test]
    fn test_voice_duration_floor() {
        assert_eq!(estimate_voice_duration("just a few words"), MIN_VOICE_SECS);
        assert_eq!(estimate_voice_duration(""), MIN_VOICE_SECS);

        let words = vec!["word"; 150].join(" ");
        assert!((estimate_voice_duration(&words) - 60.0).abs() < 1e-9);
    }
}
