use thiserror::Error;

/// Failures that can end a curation pipeline run.
///
/// Per-source feed failures and cache failures are absorbed where they
/// happen and never show up here; everything in this enum propagates to
/// the request boundary and is rendered as a structured 500.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required environment variables")]
    Configuration,

    #[error("No articles published today were found across the configured feeds")]
    NoContent,

    #[error("Generation API returned no usable text block (stop_reason: {stop_reason}, content blocks: {blocks})")]
    GenerationApi { stop_reason: String, blocks: usize },

    #[error("No JSON object found in model output")]
    JsonNotFound,

    #[error("Unbalanced JSON in model output (unclosed braces at depth {depth})")]
    UnbalancedJson { depth: usize },

    #[error("Failed to parse model output as JSON at offset {offset} (near: {context:?}): {source}")]
    Parse {
        offset: usize,
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Generation API call failed: {0}")]
    Transport(#[from] anyhow::Error),
}

impl PipelineError {
    /// Operator-facing hint attached to the error response, where one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PipelineError::NoContent => {
                Some("Feeds may not have published yet today. Try again later or check the feed list.")
            }
            _ => None,
        }
    }
}
