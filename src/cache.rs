use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::KvConfig;
use crate::enrich::NewsEnvelope;

/// Cache entries live for one day from write time.
const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// What gets stored: the full response envelope plus the write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub envelope: NewsEnvelope,
    pub cached_at: DateTime<Utc>,
}

/// Deterministic key scoping a cached result to (language, age group,
/// category set, UTC date).
pub fn cache_key(language: &str, age_group: &str, category_set: &str, date: NaiveDate) -> String {
    format!(
        "news:{language}:{age_group}:{category_set}:{}",
        date.format("%Y-%m-%d")
    )
}

/// Gateway over an optional external key-value store. When the store is
/// unconfigured or unreachable, reads are misses and writes are no-ops;
/// caching is an optimization, never a correctness dependency.
pub struct CacheGateway {
    inner: Option<KvClient>,
}

impl CacheGateway {
    pub fn new(config: Option<&KvConfig>) -> Self {
        Self {
            inner: config.map(KvClient::new),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, language: &str, age_group: &str, category_set: &str) -> Option<CacheEntry> {
        let client = self.inner.as_ref()?;
        let key = cache_key(language, age_group, category_set, Utc::now().date_naive());
        match client.get(&key).await {
            Ok(entry) => {
                if entry.is_some() {
                    debug!("Cache hit for {key}");
                }
                entry
            }
            Err(e) => {
                warn!("Cache read failed for {key}: {e}");
                None
            }
        }
    }

    pub async fn set(
        &self,
        language: &str,
        age_group: &str,
        category_set: &str,
        envelope: &NewsEnvelope,
    ) {
        let Some(client) = self.inner.as_ref() else {
            return;
        };
        let key = cache_key(language, age_group, category_set, Utc::now().date_naive());
        let entry = CacheEntry {
            envelope: envelope.clone(),
            cached_at: Utc::now(),
        };
        if let Err(e) = client.set(&key, &entry).await {
            warn!("Cache write failed for {key}: {e}");
        }
    }
}

/// Upstash-style Redis REST client: GET /get/{key} and POST /set/{key}?EX=ttl
/// with a bearer token.
struct KvClient {
    http: reqwest::Client,
    rest_url: String,
    rest_token: String,
}

#[derive(Deserialize)]
struct KvReply {
    result: Option<String>,
}

impl KvClient {
    fn new(config: &KvConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("DinnerNews/1.0")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            rest_url: config.rest_url.trim_end_matches('/').to_string(),
            rest_token: config.rest_token.clone(),
        }
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<CacheEntry>> {
        let resp = self
            .http
            .get(format!("{}/get/{key}", self.rest_url))
            .bearer_auth(&self.rest_token)
            .send()
            .await?
            .error_for_status()?;

        let reply: KvReply = resp.json().await?;
        let Some(raw) = reply.result else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_str(&raw)?;
        Ok(Some(entry))
    }

    async fn set(&self, key: &str, entry: &CacheEntry) -> anyhow::Result<()> {
        let body = serde_json::to_string(entry)?;
        self.http
            .post(format!("{}/set/{key}?EX={CACHE_TTL_SECS}", self.rest_url))
            .bearer_auth(&self.rest_token)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NewsEnvelope;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn empty_envelope() -> NewsEnvelope {
        NewsEnvelope {
            success: true,
            stories: vec![],
            last_updated: Utc::now(),
            cached: None,
        }
    }

    #[test]
    fn test_cache_key_is_deterministic_within_a_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let a = cache_key("en", "default", "all", date);
        let b = cache_key("en", "default", "all", date);
        assert_eq!(a, b);
        assert_eq!(a, "news:en:default:all:2026-08-23");
    }

    #[test]
    fn test_cache_key_changes_with_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let tomorrow = today.succ_opt().unwrap();
        assert_ne!(
            cache_key("en", "default", "all", today),
            cache_key("en", "default", "all", tomorrow)
        );
    }

    #[test]
    fn test_cache_key_scopes_by_language() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_ne!(
            cache_key("en", "default", "all", date),
            cache_key("zh", "default", "all", date)
        );
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_misses_and_noops() {
        let gateway = CacheGateway::disabled();
        assert!(!gateway.is_enabled());
        assert!(gateway.get("en", "default", "all").await.is_none());
        // set must not panic or error
        gateway.set("en", "default", "all", &empty_envelope()).await;
    }

    #[tokio::test]
    async fn test_get_decodes_stored_entry() {
        let server = MockServer::start().await;
        let entry = CacheEntry {
            envelope: empty_envelope(),
            cached_at: Utc::now(),
        };
        let stored = serde_json::to_string(&entry).unwrap();
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "result": stored })),
            )
            .mount(&server)
            .await;

        let gateway = CacheGateway::new(Some(&KvConfig {
            rest_url: server.uri(),
            rest_token: "token".to_string(),
        }));

        let hit = gateway.get("en", "default", "all").await;
        assert!(hit.is_some());
        assert!(hit.unwrap().envelope.success);
    }

    #[tokio::test]
    async fn test_null_result_is_a_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": null })),
            )
            .mount(&server)
            .await;

        let gateway = CacheGateway::new(Some(&KvConfig {
            rest_url: server.uri(),
            rest_token: "token".to_string(),
        }));

        assert!(gateway.get("en", "default", "all").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = CacheGateway::new(Some(&KvConfig {
            rest_url: server.uri(),
            rest_token: "token".to_string(),
        }));

        assert!(gateway.get("en", "default", "all").await.is_none());
        // Writes against the broken store are absorbed too
        gateway.set("en", "default", "all", &empty_envelope()).await;
    }

    #[tokio::test]
    async fn test_set_writes_with_ttl() {
        let server = MockServer::start().await;
        let date = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        Mock::given(method("POST"))
            .and(path(format!("/set/news:en:default:all:{date}")))
            .and(query_param("EX", "86400"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "OK" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = CacheGateway::new(Some(&KvConfig {
            rest_url: server.uri(),
            rest_token: "token".to_string(),
        }));

        gateway.set("en", "default", "all", &empty_envelope()).await;
    }
}
