use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One curated story as the model is asked to shape it. The model is
/// untrusted free text, so every field is optional in practice: missing or
/// unrecognized fields deserialize to empty values and flow downstream as
/// such rather than failing the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedStory {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub why_it_matters: String,
    #[serde(default)]
    pub discussion_prompts: Vec<String>,
    #[serde(default)]
    pub college_connection: String,
    #[serde(default)]
    pub thinking_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CurationPayload {
    #[serde(default)]
    stories: Vec<CuratedStory>,
}

/// Result of scanning free text for a brace-delimited JSON object.
#[derive(Debug, PartialEq, Eq)]
pub enum JsonSpan {
    Found(Range<usize>),
    NotFound,
    /// Opening braces were never closed; `depth` is how many remained open.
    Unbalanced {
        depth: usize,
    },
}

/// Recover the curated stories from the model's free-text reply.
///
/// Tolerates surrounding prose, code-fence wrapping, and non-ASCII quote
/// glyphs. Structural parse failures are terminal for the run and carry
/// the parser's offset plus a context window for debugging.
pub fn extract_stories(raw: &str) -> Result<Vec<CuratedStory>, PipelineError> {
    let normalized = normalize_quotes(raw);
    let cleaned = strip_code_fence(normalized.trim());

    let span = match find_json_span(cleaned) {
        JsonSpan::Found(range) => &cleaned[range],
        JsonSpan::NotFound => return Err(PipelineError::JsonNotFound),
        JsonSpan::Unbalanced { depth } => return Err(PipelineError::UnbalancedJson { depth }),
    };

    match serde_json::from_str::<CurationPayload>(span) {
        Ok(payload) => Ok(payload.stories),
        Err(e) => {
            let offset = offset_of(span, e.line(), e.column());
            Err(PipelineError::Parse {
                offset,
                context: context_window(span, offset),
                source: e,
            })
        }
    }
}

/// Map curly and CJK quotation glyphs to their ASCII counterparts so the
/// structural parse sees plain quotes.
pub fn normalize_quotes(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{301d}' | '\u{301e}'
            | '\u{ff02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{ff07}' => '\'',
            other => other,
        })
        .collect()
}

/// Remove a leading and trailing triple-backtick fence line, with or
/// without a language tag. Input is expected to be pre-trimmed.
pub fn strip_code_fence(input: &str) -> &str {
    let mut text = input;
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the rest of the fence line (e.g. a "json" tag)
        text = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Incremental bracket-depth scanner: walks from the first `{` tracking
/// string and backslash-escape state, so braces inside string values never
/// truncate the span. Returns the balanced span, or a typed miss.
pub fn find_json_span(text: &str) -> JsonSpan {
    let start = match text.find('{') {
        Some(pos) => pos,
        None => return JsonSpan::NotFound,
    };

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return JsonSpan::Found(start..start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    JsonSpan::Unbalanced { depth }
}

/// Convert serde_json's 1-based line/column into a byte offset.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let mut remaining = line.saturating_sub(1);
    let mut offset = 0;
    for (i, c) in text.char_indices() {
        if remaining == 0 {
            break;
        }
        if c == '\n' {
            remaining -= 1;
            offset = i + 1;
        }
    }
    (offset + column.saturating_sub(1)).min(text.len())
}

/// A short window of text around the failure point, for the error message.
fn context_window(text: &str, offset: usize) -> String {
    let start = offset.saturating_sub(20);
    let end = (offset + 20).min(text.len());
    // Snap to char boundaries
    let start = (0..=start).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    let end = (end..=text.len()).find(|&i| text.is_char_boundary(i)).unwrap_or(text.len());
    text[start..end].to_string()
}
