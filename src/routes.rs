use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::cache::CacheGateway;
use crate::curator::{Curator, Language};
use crate::enrich::{enrich, NewsEnvelope};
use crate::error::PipelineError;
use crate::extractor::extract_stories;
use crate::fetcher::FeedFetcher;
use crate::selector::select;

const DEFAULT_AGE_GROUP: &str = "default";
const DEFAULT_CATEGORY_SET: &str = "all";

pub struct AppState {
    pub fetcher: FeedFetcher,
    /// None when the generation credential is unconfigured; requests then
    /// get the configuration-error response.
    pub curator: Option<Curator>,
    pub cache: CacheGateway,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/curate-news", get(curate_news))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct CurateQuery {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub refresh: bool,
}

fn default_lang() -> String {
    "en".to_string()
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = match self.hint() {
            Some(hint) => json!({
                "success": false,
                "error": self.to_string(),
                "hint": hint,
            }),
            None => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// The one endpoint: serve today's cached curation if present, otherwise
/// run the full pipeline and cache the result.
pub async fn curate_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CurateQuery>,
) -> Response {
    let Some(curator) = &state.curator else {
        return PipelineError::Configuration.into_response();
    };
    let language = Language::parse(&query.lang);

    // refresh=true bypasses the read path but still writes on success
    if !query.refresh {
        if let Some(entry) = state
            .cache
            .get(language.key(), DEFAULT_AGE_GROUP, DEFAULT_CATEGORY_SET)
            .await
        {
            let mut envelope = entry.envelope;
            envelope.cached = Some(true);
            return Json(envelope).into_response();
        }
    }

    match run_pipeline(&state.fetcher, curator, language).await {
        Ok(envelope) => {
            state
                .cache
                .set(
                    language.key(),
                    DEFAULT_AGE_GROUP,
                    DEFAULT_CATEGORY_SET,
                    &envelope,
                )
                .await;
            Json(envelope).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Fetch -> select -> curate -> extract -> enrich, as one straight pipe.
async fn run_pipeline(
    fetcher: &FeedFetcher,
    curator: &Curator,
    language: Language,
) -> Result<NewsEnvelope, PipelineError> {
    let per_source = fetcher.fetch_all().await;
    let total: usize = per_source.iter().map(Vec::len).sum();
    info!("Fetched {total} articles across {} sources", per_source.len());

    let candidates = select(per_source, Utc::now())?;
    info!("Selected {} candidate articles for curation", candidates.len());

    let reply_text = curator.curate(&candidates, language).await?;
    let stories = extract_stories(&reply_text)?;
    info!("Curated {} stories", stories.len());

    Ok(NewsEnvelope {
        success: true,
        stories: enrich(stories),
        last_updated: Utc::now(),
        cached: None,
    })
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::{ContentBlock, GenerationApi, GenerationReply};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct StubApi {
        reply_text: String,
    }

    #[async_trait]
    impl GenerationApi for StubApi {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<GenerationReply> {
            Ok(GenerationReply {
                content: vec![ContentBlock {
                    block_type: "text".to_string(),
                    text: self.reply_text.clone(),
                }],
                stop_reason: Some("end_turn".to_string()),
                usage: None,
            })
        }
    }

    fn app_without_credentials() -> Router {
        let state = Arc::new(AppState {
            fetcher: FeedFetcher::new(vec![]),
            curator: None,
            cache: CacheGateway::disabled(),
        });
        router(state)
    }

    fn app_with_stub(reply_text: &str) -> Router {
        let state = Arc::new(AppState {
            fetcher: FeedFetcher::new(vec![]),
            curator: Some(Curator::new(Arc::new(StubApi {
                reply_text: reply_text.to_string(),
            }))),
            cache: CacheGateway::disabled(),
        });
        router(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app_without_credentials();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_config_error() {
        let app = app_without_credentials();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/curate-news")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Missing required environment variables");
    }

    #[tokio::test]
    async fn test_no_feeds_returns_no_content_error_with_hint() {
        // No sources configured means zero same-day articles
        let app = app_with_stub("{\"stories\": []}");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/curate-news?lang=en")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("today"));
        assert!(json["hint"].is_string());
    }

    #[test]
    fn test_curate_query_defaults() {
        let query: CurateQuery = serde_urlencoded::from_str("").unwrap();
        assert_eq!(query.lang, "en");
        assert!(!query.refresh);
    }

    #[test]
    fn test_curate_query_parses_lang_and_refresh() {
        let query: CurateQuery = serde_urlencoded::from_str("lang=zh&refresh=true").unwrap();
        assert_eq!(query.lang, "zh");
        assert!(query.refresh);
    }
}
