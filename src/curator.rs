use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::fetcher::Article;

/// Output language for the curated stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    /// Unknown values fall back to English.
    pub fn parse(s: &str) -> Self {
        match s {
            "zh" => Language::Chinese,
            _ => Language::English,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            Language::English => "Write all output in English.",
            // Curly and full-width quote glyphs break the JSON contract, so
            // the directive bans them explicitly for Chinese output.
            Language::Chinese => {
                "Write all output in Simplified Chinese. Use ONLY the ASCII double quote character (\") for JSON strings; never use curly, full-width, or CJK quotation marks anywhere in the output."
            }
        }
    }
}

/// One content block from the generation API reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Response envelope from a generation call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationReply {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Seam for the text-generation API, so the pipeline can run against a
/// test double instead of the real endpoint.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GenerationReply>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &GenerationConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("DinnerNews/1.0")
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl GenerationApi for AnthropicClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GenerationReply> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Msg<'a>>,
        }

        let req = Req {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.auth_token)
            .header("anthropic-version", "2023-06-01")
            .json(&req)
            .send()
            .await
            .context("generation API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("generation API returned {status}: {body}");
        }

        let reply: GenerationReply = resp
            .json()
            .await
            .context("generation API returned an undecodable body")?;
        Ok(reply)
    }
}

/// Builds the curation prompt, makes exactly one generation call, and
/// validates the response envelope.
pub struct Curator {
    api: std::sync::Arc<dyn GenerationApi>,
}

impl Curator {
    pub fn new(api: std::sync::Arc<dyn GenerationApi>) -> Self {
        Self { api }
    }

    /// One call per pipeline run, no retry. Returns the first text block.
    pub async fn curate(
        &self,
        articles: &[Article],
        language: Language,
    ) -> Result<String, PipelineError> {
        let prompt = build_prompt(articles, language);
        let reply = self.api.generate(&prompt).await?;

        if let Some(usage) = &reply.usage {
            info!(
                "Generation call used {} input / {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = reply
            .content
            .iter()
            .find(|b| b.block_type == "text" && !b.text.is_empty())
            .map(|b| b.text.clone());

        match text {
            Some(text) => Ok(text),
            None => Err(PipelineError::GenerationApi {
                stop_reason: reply.stop_reason.unwrap_or_else(|| "unknown".to_string()),
                blocks: reply.content.len(),
            }),
        }
    }
}

/// Assemble the single curation prompt: persona, language directive,
/// numbered candidate list, and the strict JSON output contract.
pub fn build_prompt(articles: &[Article], language: Language) -> String {
    let articles_text: String = articles
        .iter()
        .enumerate()
        .map(|(idx, article)| {
            format!(
                "{}. {}\n   Source: {}\n   Description: {}\n   URL: {}\n",
                idx + 1,
                article.title,
                article.source_name,
                article.description,
                article.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a senior college counselor with more than 10 years of experience in international high schools. Your job now is to curate news for dinner discussions with the school's teenagers (age 12-17) and their parents.
From these news articles, select the BEST 5 stories that:
1. Are appropriate and interesting for teenagers
2. Spark meaningful discussion
3. Connect to US college application essays and critical thinking
4. Cover diverse topics across Technology, Science, Business, Politics & World, and Social & Culture

{directive}

Here are today's articles:
{articles_text}

For each of the 5 stories you select, provide:
1. Category (Technology, Science, Business, Politics & World, or Social & Culture)
2. Headline (make it engaging and teen-friendly)
3. Summary (2-3 sentences explaining what happened)
4. Source name and URL
5. Why it matters (1 sentence)
6. Three discussion prompts (conversational, thought-provoking questions)
7. US College essay connection (how this relates to college applications)
8. Three thinking skills developed

Respond ONLY with valid JSON in this exact format:
{{
  "stories": [
    {{
      "category": "Technology",
      "headline": "...",
      "summary": "...",
      "source": "...",
      "sourceUrl": "...",
      "whyItMatters": "...",
      "discussionPrompts": ["...", "...", "..."],
      "collegeConnection": "...",
      "thinkingSkills": ["...", "...", "..."]
    }}
  ]
}}

Remember: Make it conversational and relatable for teenagers. Focus on questions that make them think, not just recall facts."#,
        directive = language.directive(),
        articles_text = articles_text
    )
}
