use chrono::{DateTime, Utc};

use crate::error::PipelineError;
use crate::fetcher::Article;

/// Upper bound on candidates handed to the prompt builder.
const MAX_CANDIDATES: usize = 25;

/// Description length bound, in characters, before prompt embedding.
const MAX_DESCRIPTION_CHARS: usize = 300;

/// Flatten per-source results into the candidate list for curation.
///
/// Keeps only articles published within the current UTC calendar day,
/// drops anything missing a title or description, sorts newest-first
/// (missing timestamps sort as the epoch), truncates to the candidate
/// bound, and sanitizes every text field for prompt embedding.
///
/// Fails with `NoContent` when the same-day filter leaves nothing, so the
/// pipeline never proceeds with stale data.
pub fn select(
    per_source: Vec<Vec<Article>>,
    now: DateTime<Utc>,
) -> Result<Vec<Article>, PipelineError> {
    let all: Vec<Article> = per_source.into_iter().flatten().collect();

    let today = now.date_naive();
    let mut candidates: Vec<Article> = all
        .into_iter()
        .filter(|a| {
            a.published
                .map(|ts| ts.date_naive() == today)
                .unwrap_or(false)
        })
        .collect();

    if candidates.is_empty() {
        return Err(PipelineError::NoContent);
    }

    candidates.retain(|a| !a.title.is_empty() && !a.description.is_empty());

    sort_by_recency(&mut candidates);
    candidates.truncate(MAX_CANDIDATES);

    for article in &mut candidates {
        article.title = sanitize(&article.title);
        article.source_name = sanitize(&article.source_name);
        article.description = truncate_chars(&sanitize(&article.description), MAX_DESCRIPTION_CHARS);
    }

    Ok(candidates)
}

/// Stable sort, newest first; missing timestamps sort as the epoch, i.e.
/// last. Split out of `select` so ordering is testable without the
/// same-day window.
pub fn sort_by_recency(articles: &mut [Article]) {
    articles.sort_by_key(|a| {
        std::cmp::Reverse(a.published.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    });
}

/// Strip control characters (below 0x20 except tab/newline/CR, plus DEL)
/// that would corrupt the prompt encoding.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|&c| !((c < '\u{20}' && c != '\t' && c != '\n' && c != '\r') || c == '\u{7f}'))
        .collect()
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect()
}
