//! Publishing client for the remote posting service
//!
//! Drives a cookie-session HTTP API: one login call with the account's
//! credentials, then a JSON post submission. Rejections carry the service's
//! own diagnostic text so failed runs are explainable from the history log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::PosterConfig;
use crate::models::{Account, GeneratedPost, ResolvedOptions};
use crate::utils::truncate_text;

const LOGIN_PATH: &str = "/api/login";
const SUBMIT_PATH: &str = "/api/posts";

/// Errors from the publishing service
#[derive(Debug, Error)]
pub enum PosterError {
    #[error("publish request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("login failed: {detail}")]
    LoginFailed { detail: String },

    /// The service answered but refused the post
    #[error("publish rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("poster configuration invalid: {detail}")]
    InvalidConfig { detail: String },
}

/// Acknowledgement returned for a delivered post
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub success: bool,
    pub message: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Delivers generated content to the remote service
#[async_trait]
pub trait Poster: Send + Sync {
    async fn publish(
        &self,
        account: &Account,
        post: &GeneratedPost,
        resource: &str,
        options: ResolvedOptions,
    ) -> Result<PostReceipt, PosterError>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    title: &'a str,
    body: &'a str,
    resource: &'a str,
    channel: &'a str,
    visibility: &'a str,
}

/// HTTP poster holding a cookie session per publish call
#[derive(Debug)]
pub struct HttpPoster {
    client: Client,
    login_url: String,
    submit_url: String,
}

impl HttpPoster {
    /// Create a poster, validating the endpoint URL up front
    pub fn new(config: &PosterConfig) -> Result<Self, PosterError> {
        let parsed = Url::parse(&config.endpoint).map_err(|e| PosterError::InvalidConfig {
            detail: format!("endpoint {}: {e}", config.endpoint),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PosterError::InvalidConfig {
                detail: format!("endpoint {} is not http(s)", config.endpoint),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        let base = config.endpoint.trim_end_matches('/');
        Ok(Self {
            client,
            login_url: format!("{base}{LOGIN_PATH}"),
            submit_url: format!("{base}{SUBMIT_PATH}"),
        })
    }

    fn credential<'a>(account: &'a Account, key: &str) -> Result<&'a str, PosterError> {
        account
            .credentials
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| PosterError::LoginFailed {
                detail: format!("account {} has no {key} credential", account.id),
            })
    }

    /// Establish the cookie session for the account
    async fn login(&self, account: &Account) -> Result<(), PosterError> {
        let request = LoginRequest {
            username: Self::credential(account, "username")?,
            password: Self::credential(account, "password")?,
        };

        let response = self.client.post(&self.login_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PosterError::LoginFailed {
                detail: format!("{status}: {}", truncate_text(&body, 200)),
            });
        }

        let ack: ServiceResponse = response.json().await?;
        if !ack.success {
            return Err(PosterError::LoginFailed {
                detail: ack.message.unwrap_or_else(|| "credentials refused".to_string()),
            });
        }

        debug!(account_id = %account.id, "Login succeeded");
        Ok(())
    }

    async fn submit(
        &self,
        account: &Account,
        post: &GeneratedPost,
        resource: &str,
        options: ResolvedOptions,
    ) -> Result<PostReceipt, PosterError> {
        let request = SubmitRequest {
            title: &post.title,
            body: &post.body,
            resource,
            channel: options.channel.as_str(),
            visibility: options.visibility.as_str(),
        };

        let response = self.client.post(&self.submit_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(account_id = %account.id, status = %status, "Publish rejected");
            return Err(PosterError::Rejected {
                status: status.as_u16(),
                detail: truncate_text(&body, 200),
            });
        }

        let ack: ServiceResponse = response.json().await?;
        if !ack.success {
            return Err(PosterError::Rejected {
                status: status.as_u16(),
                detail: ack.message.unwrap_or_else(|| "service reported failure".to_string()),
            });
        }

        Ok(PostReceipt {
            success: true,
            message: ack.message,
            posted_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Poster for HttpPoster {
    async fn publish(
        &self,
        account: &Account,
        post: &GeneratedPost,
        resource: &str,
        options: ResolvedOptions,
    ) -> Result<PostReceipt, PosterError> {
        self.login(account).await?;
        let receipt = self.submit(account, post, resource, options).await?;
        debug!(
            account_id = %account.id,
            title = %post.title,
            channel = %options.channel,
            "Post delivered"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostChannel, PostVisibility};

    fn config_with_endpoint(endpoint: &str) -> PosterConfig {
        PosterConfig {
            endpoint: endpoint.to_string(),
            ..PosterConfig::default()
        }
    }

    #[test]
    fn test_endpoint_must_be_http() {
        let err = HttpPoster::new(&config_with_endpoint("ftp://example.com")).unwrap_err();
        assert!(matches!(err, PosterError::InvalidConfig { .. }));

        let err = HttpPoster::new(&config_with_endpoint("not a url")).unwrap_err();
        assert!(matches!(err, PosterError::InvalidConfig { .. }));
    }

    #[test]
    fn test_urls_built_from_base() {
        let poster = HttpPoster::new(&config_with_endpoint("https://service.example/")).unwrap();
        assert_eq!(poster.login_url, "https://service.example/api/login");
        assert_eq!(poster.submit_url, "https://service.example/api/posts");
    }

    #[tokio::test]
    async fn test_publish_requires_credentials() {
        let poster = HttpPoster::new(&config_with_endpoint("http://localhost:9999")).unwrap();
        let account = Account::new("a1", "Alpha");
        let post = GeneratedPost::from_parts("t".into(), "b".into());
        let options = ResolvedOptions {
            channel: PostChannel::Feed,
            visibility: PostVisibility::Public,
        };

        // Fails on the missing credential before any network call
        let err = poster.publish(&account, &post, "x.jpg", options).await.unwrap_err();
        assert!(matches!(err, PosterError::LoginFailed { .. }));
    }
}
