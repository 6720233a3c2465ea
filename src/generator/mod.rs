//! Content generation for publishable posts
//!
//! This module turns an account persona into a short titled post via an
//! OpenAI-compatible completion endpoint, with features including:
//! - Per-minute rate limiting with governor
//! - Automatic retry with jittered exponential backoff
//! - Optional per-account sample corpus mixed into the prompt
//! - Compact fallback prompt when the full completion is unusable

use anyhow::Context;
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::models::{Account, GeneratedPost};
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::{normalize_whitespace, sanitize_filename, truncate_text};

/// Character budget suggested to the model for the post body
const BODY_CHAR_HINT: usize = 500;

/// Maximum characters of sample corpus included in a prompt
const CORPUS_CHAR_LIMIT: usize = 2000;

/// Errors from content generation
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Upstream answered 429; the hint comes from its Retry-After header
    #[error("generation endpoint rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The account lacks the material needed to build a prompt
    #[error("generator configuration missing: {what}")]
    ConfigMissing { what: String },

    /// Request failed or the endpoint returned an unusable response.
    /// `status` is the HTTP status when a response was received at all.
    #[error("generation endpoint failure: {detail}")]
    Upstream {
        status: Option<u16>,
        detail: String,
    },
}

impl GeneratorError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Upstream { status, .. } => {
                matches!(status, None | Some(500) | Some(502) | Some(503) | Some(504))
            }
            Self::ConfigMissing { .. } => false,
        }
    }
}

/// Produces publishable content for an account
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a titled post for the account.
    ///
    /// `resource_hint` names the image the post will carry, letting the
    /// generator write toward it.
    async fn generate(
        &self,
        account: &Account,
        resource_hint: Option<&str>,
    ) -> Result<GeneratedPost, GeneratorError>;
}

/// Completion request body
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
}

/// Completion response body
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// HTTP content generator against an OpenAI-compatible completion endpoint
pub struct HttpGenerator {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    retry: RetryConfig,
    completion_url: String,
    model: String,
    max_tokens: u32,
    corpus_dir: Option<PathBuf>,
}

impl HttpGenerator {
    /// Create a generator from configuration
    pub fn new(config: &GeneratorConfig) -> anyhow::Result<Self> {
        Self::with_retry(config, RetryConfig::new(config.max_retries))
    }

    /// Create a generator with custom retry behavior
    pub fn with_retry(config: &GeneratorConfig, retry: RetryConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        let rate = NonZeroU32::new(config.requests_per_minute)
            .context("Invalid requests_per_minute value")?;
        let rate_limiter = RateLimiter::direct(Quota::per_minute(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry,
            completion_url: format!("{}/v1/completions", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            corpus_dir: config.corpus_dir.clone(),
        })
    }

    /// Read the account's sample corpus, if one is configured and present
    async fn load_corpus(&self, account_id: &str) -> Option<String> {
        let dir = self.corpus_dir.as_ref()?;
        let path = dir.join(format!("{}.txt", sanitize_filename(account_id)));

        match tokio::fs::read_to_string(&path).await {
            Ok(text) if !text.trim().is_empty() => Some(truncate_text(&text, CORPUS_CHAR_LIMIT)),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read sample corpus");
                None
            }
        }
    }

    /// Build the full prompt from persona, image hint, and corpus samples
    fn build_prompt(
        &self,
        account: &Account,
        profile: &str,
        resource_hint: Option<&str>,
        corpus: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            r#"You are ghost-writing a short social post for the account "{name}".

## Persona:
{profile}

## Rules:
1. Write in the persona's usual voice
2. The first line is the post title; everything after it is the body
3. Keep the body under {chars} characters
4. Use at most two hashtags
"#,
            name = account.name,
            profile = profile,
            chars = BODY_CHAR_HINT,
        );

        if let Some(resource) = resource_hint {
            prompt.push_str(&format!(
                "\n## Attached image:\nThe post carries the image \"{resource}\". \
                 Write toward its mood without naming the file.\n"
            ));
        }

        if let Some(samples) = corpus {
            prompt.push_str(&format!("\n## Recent posts, for voice reference:\n{samples}\n"));
        }

        prompt.push_str("\n## Post (title on the first line):\n");
        prompt
    }

    /// Minimal prompt variant used when the full one yields unusable output
    fn compact_prompt(&self, account: &Account, profile: &str) -> String {
        format!(
            "Write a short social post as \"{}\" ({}). \
             Put the title on the first line and the body on the lines after it.",
            account.name,
            truncate_text(profile, 200),
        )
    }

    /// Split a completion into title and body; `None` when either is missing
    fn parse_post(&self, raw: &str) -> Option<GeneratedPost> {
        let trimmed = raw.trim();
        let mut lines = trimmed.lines();

        // Model output tends to pad titles with markdown and stray spacing
        let title = normalize_whitespace(
            lines.next()?.trim().trim_start_matches('#').trim_matches('"'),
        );
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        if title.is_empty() || body.is_empty() {
            return None;
        }
        Some(GeneratedPost::from_parts(title, body))
    }

    /// One rate-limited request to the completion endpoint
    async fn complete_once(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.rate_limiter.until_ready().await;

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.completion_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Upstream {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            warn!(retry_after_secs = ?retry_after_secs, "Generation endpoint rate limited");
            return Err(GeneratorError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Upstream {
                status: Some(status.as_u16()),
                detail: truncate_text(&body, 200),
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| GeneratorError::Upstream {
                status: Some(status.as_u16()),
                detail: format!("invalid completion payload: {e}"),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| GeneratorError::Upstream {
                status: Some(status.as_u16()),
                detail: "completion had no choices".to_string(),
            })
    }

    /// Request a completion, retrying transient failures with backoff
    async fn complete_with_retry(&self, prompt: &str) -> Result<String, GeneratorError> {
        let outcome = with_retry_if(
            &self.retry,
            || async { self.complete_once(prompt).await.map_err(anyhow::Error::from) },
            |e| {
                e.downcast_ref::<GeneratorError>()
                    .map(GeneratorError::is_transient)
                    .unwrap_or(false)
            },
        )
        .await;

        outcome.map_err(|e| match e.downcast::<GeneratorError>() {
            Ok(err) => err,
            Err(other) => GeneratorError::Upstream {
                status: None,
                detail: other.to_string(),
            },
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(
        &self,
        account: &Account,
        resource_hint: Option<&str>,
    ) -> Result<GeneratedPost, GeneratorError> {
        let profile = account
            .profile
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GeneratorError::ConfigMissing {
                what: format!("profile for account {}", account.id),
            })?;

        let corpus = self.load_corpus(&account.id).await;
        let prompt = self.build_prompt(account, profile, resource_hint, corpus.as_deref());

        let raw = self.complete_with_retry(&prompt).await?;
        if let Some(post) = self.parse_post(&raw) {
            debug!(
                account_id = %account.id,
                title = %post.title,
                char_count = post.char_count,
                "Generated post"
            );
            return Ok(post);
        }

        warn!(account_id = %account.id, "Completion missing title or body, retrying with compact prompt");
        let raw = self.complete_with_retry(&self.compact_prompt(account, profile)).await?;
        self.parse_post(&raw).ok_or_else(|| GeneratorError::Upstream {
            status: None,
            detail: "completion text missing title or body".to_string(),
        })
    }
}
