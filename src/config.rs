use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// One RSS/Atom source: where to fetch it and what to call it.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "General".to_string()
}

#[derive(Debug, Deserialize)]
struct FeedsFile {
    feeds: Vec<FeedSource>,
}

/// Generation API settings, read from the environment.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub auth_token: String,
    pub base_url: String,
    pub timeout: Duration,
    pub model: String,
    pub max_tokens: u32,
}

/// Key-value cache store settings. Absent when the store is unconfigured;
/// caching then degrades to a no-op.
#[derive(Debug, Clone)]
pub struct KvConfig {
    pub rest_url: String,
    pub rest_token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// None when ANTHROPIC_AUTH_TOKEN is missing; the handler turns this
    /// into the configuration-error response instead of failing startup.
    pub generation: Option<GenerationConfig>,
    pub kv: Option<KvConfig>,
    pub feeds: Vec<FeedSource>,
    pub port: u16,
}

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_MS: u64 = 600_000;
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4000;

impl Config {
    pub fn from_env() -> Self {
        let generation = std::env::var("ANTHROPIC_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(|auth_token| GenerationConfig {
                auth_token,
                base_url: std::env::var("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_millis(
                    std::env::var("API_TIMEOUT_MS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(DEFAULT_TIMEOUT_MS),
                ),
                model: DEFAULT_MODEL.to_string(),
                max_tokens: DEFAULT_MAX_TOKENS,
            });

        let kv = match (
            std::env::var("KV_REST_API_URL"),
            std::env::var("KV_REST_API_TOKEN"),
        ) {
            (Ok(rest_url), Ok(rest_token)) if !rest_url.is_empty() => Some(KvConfig {
                rest_url,
                rest_token,
            }),
            _ => None,
        };

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            generation,
            kv,
            feeds: default_feeds(),
            port,
        }
    }

    /// Replace the compiled-in feed list with one loaded from a TOML file.
    pub fn load_feeds<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.feeds = Self::feeds_from_str(&content)?;
        Ok(())
    }

    /// Parse a feed list from a TOML string (useful for testing)
    pub fn feeds_from_str(content: &str) -> anyhow::Result<Vec<FeedSource>> {
        let file: FeedsFile = toml::from_str(content)?;
        Ok(file.feeds)
    }
}

/// Compiled-in source list covering the five discussion categories.
pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource {
            name: "NPR News".to_string(),
            url: "https://feeds.npr.org/1001/rss.xml".to_string(),
            category: "General".to_string(),
        },
        FeedSource {
            name: "BBC World".to_string(),
            url: "https://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
            category: "Politics & World".to_string(),
        },
        FeedSource {
            name: "Ars Technica".to_string(),
            url: "https://feeds.arstechnica.com/arstechnica/index".to_string(),
            category: "Technology".to_string(),
        },
        FeedSource {
            name: "ScienceDaily".to_string(),
            url: "https://www.sciencedaily.com/rss/top/science.xml".to_string(),
            category: "Science".to_string(),
        },
        FeedSource {
            name: "CNBC Business".to_string(),
            url: "https://www.cnbc.com/id/10001147/device/rss/rss.html".to_string(),
            category: "Business".to_string(),
        },
    ]
}
