use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractor::CuratedStory;

/// Category label -> (icon, color) lookup table. Kept as data, not
/// branching, so adding a category is a one-line change.
const CATEGORY_STYLES: &[(&str, &str, &str)] = &[
    ("Technology", "Cpu", "from-blue-500 to-cyan-500"),
    ("Science", "Microscope", "from-green-500 to-emerald-500"),
    ("Business", "Briefcase", "from-purple-500 to-indigo-500"),
    ("Politics & World", "Globe", "from-orange-500 to-red-500"),
    ("Social & Culture", "Heart", "from-pink-500 to-rose-500"),
];

const DEFAULT_STYLE: (&str, &str) = ("Lightbulb", "from-gray-500 to-gray-600");

/// A curated story plus presentation metadata; the externally visible unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedStory {
    pub id: usize,
    #[serde(flatten)]
    pub story: CuratedStory,
    pub icon: String,
    pub color: String,
    pub source_display: String,
}

/// The JSON envelope served to the presentation layer and stored in the
/// cache. `cached` is present only when the response came from the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsEnvelope {
    pub success: bool,
    pub stories: Vec<EnrichedStory>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

fn style_for(category: &str) -> (&'static str, &'static str) {
    CATEGORY_STYLES
        .iter()
        .find(|(label, _, _)| *label == category)
        .map(|(_, icon, color)| (*icon, *color))
        .unwrap_or(DEFAULT_STYLE)
}

/// Attach icon/color and a 1-based ordinal id to each story, in array
/// order. Pure; no failure modes.
pub fn enrich(stories: Vec<CuratedStory>) -> Vec<EnrichedStory> {
    stories
        .into_iter()
        .enumerate()
        .map(|(idx, story)| {
            let (icon, color) = style_for(&story.category);
            let source_display = story.source.clone();
            EnrichedStory {
                id: idx + 1,
                story,
                icon: icon.to_string(),
                color: color.to_string(),
                source_display,
            }
        })
        .collect()
}
