use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use futures::future::join_all;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::FeedSource;

/// How many entries to keep per source. Feeds are assumed newest-first.
const ENTRIES_PER_SOURCE: usize = 5;

const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// A normalized feed entry, never mutated after creation.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source_name: String,
    pub published: Option<DateTime<Utc>>,
}

pub struct FeedFetcher {
    client: Client,
    sources: Vec<FeedSource>,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self::with_timeout(sources, DEFAULT_FEED_TIMEOUT)
    }

    pub fn with_timeout(sources: Vec<FeedSource>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("DinnerNews/1.0 (RSS Aggregator)")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            sources,
            timeout,
        }
    }

    /// Fetch every configured source concurrently. Each fetch races an
    /// independent timer; a source that times out or fails contributes an
    /// empty list. One bad source never fails the batch.
    pub async fn fetch_all(&self) -> Vec<Vec<Article>> {
        let fetches = self.sources.iter().map(|source| async {
            match tokio::time::timeout(self.timeout, self.fetch_source(source)).await {
                Ok(Ok(articles)) => {
                    info!("Fetched {} articles from '{}'", articles.len(), source.name);
                    articles
                }
                Ok(Err(e)) => {
                    warn!("Failed to fetch feed '{}': {}", source.name, e);
                    Vec::new()
                }
                Err(_) => {
                    warn!(
                        "Feed '{}' timed out after {:?}",
                        source.name, self.timeout
                    );
                    Vec::new()
                }
            }
        });

        join_all(fetches).await
    }

    async fn fetch_source(&self, source: &FeedSource) -> anyhow::Result<Vec<Article>> {
        let response = self.client.get(&source.url).send().await?;
        let bytes = response.bytes().await?;

        let parsed = parser::parse(&bytes[..])?;

        let articles = parsed
            .entries
            .into_iter()
            .take(ENTRIES_PER_SOURCE)
            .map(|entry| {
                let title = entry
                    .title
                    .as_ref()
                    .map(|t| t.content.clone())
                    .unwrap_or_default();

                let description = entry
                    .summary
                    .as_ref()
                    .map(|s| s.content.clone())
                    .unwrap_or_default();

                let url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();

                let published: Option<DateTime<Utc>> =
                    entry.published.or(entry.updated).map(|dt| dt.into());

                Article {
                    title,
                    description,
                    url,
                    source_name: source.name.clone(),
                    published,
                }
            })
            .collect();

        Ok(articles)
    }
}
