//! Template styling.

use serde_json::json;
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{Effect, Timeline};

/// A fixed visual style applied on top of a populated timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    /// Base transition name; assets get `<base>_in` / `<base>_out`
    pub default_transition: &'static str,
    /// Effects appended to every visual asset
    pub effects: &'static [&'static str],
    pub primary_color: &'static str,
    pub accent_color: &'static str,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "minimal",
        default_transition: "fade",
        effects: &[],
        primary_color: "#ffffff",
        accent_color: "#000000",
    },
    Template {
        id: "scientific",
        default_transition: "slide",
        effects: &["diagram_highlight"],
        primary_color: "#2563eb",
        accent_color: "#1e40af",
    },
    Template {
        id: "storytelling",
        default_transition: "cinematic_wipe",
        effects: &["cinematic_blur"],
        primary_color: "#dc2626",
        accent_color: "#991b1b",
    },
];

impl Template {
    pub fn find(id: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|t| t.id == id)
    }

    fn style_metadata(&self) -> serde_json::Value {
        json!({
            "transitions": { "default": self.default_transition },
            "effects": self.effects,
            "colors": { "primary": self.primary_color, "accent": self.accent_color },
        })
    }
}

impl Timeline {
    /// Apply a template to every video and image asset.
    ///
    /// Transitions are overwritten, but effects are appended: applying a
    /// template twice leaves its effects on each asset twice.
    pub fn apply_template_style(&mut self, template_id: &str) -> TimelineResult<()> {
        let template = Template::find(template_id)
            .ok_or_else(|| TimelineError::UnknownTemplate(template_id.to_string()))?;

        let mut styled = 0usize;
        for asset in self
            .tracks
            .iter_mut()
            .flat_map(|t| t.assets.iter_mut())
            .filter(|a| a.kind.is_visual())
        {
            asset.transitions.transition_in = Some(format!("{}_in", template.default_transition));
            asset.transitions.transition_out = Some(format!("{}_out", template.default_transition));
            asset
                .effects
                .extend(template.effects.iter().map(|name| Effect::new(*name)));
            styled += 1;
        }

        self.metadata
            .insert("template".to_string(), json!(template.id));
        self.metadata
            .insert("style".to_string(), template.style_metadata());

        debug!(timeline_id = %self.id, template = template.id, styled, "Applied template");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Asset, AssetKind, TrackKind};

    fn styled_timeline() -> Timeline {
        let mut timeline = Timeline::new("project");
        let video = timeline.first_track_id(TrackKind::Video).unwrap();
        let subtitles = timeline.first_track_id(TrackKind::Subtitle).unwrap();

        timeline
            .add_asset(&video, Asset::new(AssetKind::Video, "bg", 0.0, 5.0))
            .unwrap();
        timeline
            .add_asset(&video, Asset::new(AssetKind::Image, "still", 5.0, 5.0))
            .unwrap();
        timeline
            .add_asset(&subtitles, Asset::new(AssetKind::Text, "sub", 0.0, 5.0))
            .unwrap();
        timeline
    }

    #[test]
    fn test_unknown_template() {
        let mut timeline = styled_timeline();
        assert!(matches!(
            timeline.apply_template_style("neon"),
            Err(TimelineError::UnknownTemplate(_))
        ));
        assert!(timeline.metadata.is_empty());
    }

    #[test]
    fn test_template_styles_visual_assets_only() {
        let mut timeline = styled_timeline();
        timeline.apply_template_style("scientific").unwrap();

        for asset in timeline.assets() {
            if asset.kind.is_visual() {
                assert_eq!(asset.transitions.transition_in.as_deref(), Some("slide_in"));
                assert_eq!(asset.transitions.transition_out.as_deref(), Some("slide_out"));
                assert_eq!(asset.effects, vec![Effect::new("diagram_highlight")]);
            } else {
                assert!(asset.transitions.transition_in.is_none());
                assert!(asset.effects.is_empty());
            }
        }
        assert_eq!(timeline.metadata["template"], "scientific");
        assert_eq!(timeline.metadata["style"]["colors"]["primary"], "#2563eb");
    }

    #[test]
    fn test_repeated_application_accumulates_effects() {
        let mut timeline = styled_timeline();
        timeline.apply_template_style("storytelling").unwrap();
        timeline.apply_template_style("storytelling").unwrap();

        let first_visual = timeline.assets().find(|a| a.kind.is_visual()).unwrap();
        assert_eq!(first_visual.effects.len(), 2);
        assert_eq!(
            first_visual.transitions.transition_in.as_deref(),
            Some("cinematic_wipe_in")
        );
    }

    #[test]
    fn test_templates_match_known_ids() {
        for id in vauto_models::KNOWN_TEMPLATES {
            assert!(Template::find(id).is_some(), "missing template {}", id);
        }
        assert_eq!(TEMPLATES.len(), vauto_models::KNOWN_TEMPLATES.len());
    }
}
