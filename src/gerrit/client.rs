use anyhow::{Context, Result};
use async_trait::async_trait;
use digest_auth::AuthContext;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::janitor::ChangeActions;
use crate::report::ActionOutcome;

/// Comment left on changes that are about to be abandoned
pub const WARN_MESSAGE: &str = "Review Cleanup Bot\n\n\
    This change has had unaddressed negative feedback for a significant period of time. \
    If the feedback is not dealt with through a comment or new patch set, the change will \
    be automatically abandoned. Note that if this happens you will still be able to restore \
    the change if you wish to continue working on it.";

/// Message attached when abandoning a change
pub const ABANDON_MESSAGE: &str = "Review Cleanup Bot\n\n\
    This change has had unaddressed negative feedback for more than one month. It is being \
    automatically abandoned by this cleanup job. Please feel free to restore the change if \
    you wish to continue working on it.";

#[derive(Debug, Serialize)]
struct ReviewMessage<'a> {
    message: &'a str,
}

/// Gerrit REST API client for abandoning and commenting on changes
pub struct GerritClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    dry_run: bool,
}

impl GerritClient {
    /// Create a client from the loaded configuration
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.gerrit_url.trim_end_matches('/').to_string(),
            username: config.gerrit_user.clone(),
            password: config.http_password.clone().unwrap_or_default(),
            dry_run: config.dryrun,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn abandon_url(&self, change_id: &str) -> String {
        format!("{}/a/changes/{}/abandon", self.base_url, change_id)
    }

    pub fn review_url(&self, change_id: &str, revision_id: &str) -> String {
        format!(
            "{}/a/changes/{}/revisions/{}/review",
            self.base_url, change_id, revision_id
        )
    }

    async fn post_message(&self, url: &str, message: &str) -> Result<ActionOutcome> {
        let body = serde_json::to_string(&ReviewMessage { message })?;

        if self.dry_run {
            debug!(url, "Dry run, not sending request");
            return Ok(ActionOutcome::DryRun {
                url: url.to_string(),
                body,
            });
        }

        let first = self
            .send(url, &body, None)
            .await
            .with_context(|| format!("Failed to POST {}", url))?;

        let response = if first.status() == StatusCode::UNAUTHORIZED {
            let challenge = first
                .headers()
                .get(WWW_AUTHENTICATE)
                .context("Gerrit returned 401 without an authentication challenge")?
                .to_str()
                .context("Authentication challenge is not valid text")?
                .to_string();

            let authorization = self.digest_authorization(url, &challenge, &body)?;
            self.send(url, &body, Some(authorization))
                .await
                .with_context(|| format!("Failed to POST {}", url))?
        } else {
            first
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Gerrit response body")?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "Gerrit request failed");
            anyhow::bail!("Gerrit returned error for {}: {} - {}", url, status, text.trim());
        }

        Ok(ActionOutcome::response(status, &text))
    }

    async fn send(
        &self,
        url: &str,
        body: &str,
        authorization: Option<String>,
    ) -> reqwest::Result<reqwest::Response> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());

        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        request.send().await
    }

    /// Answer a `WWW-Authenticate: Digest` challenge for a POST to `url`
    fn digest_authorization(&self, url: &str, challenge: &str, body: &str) -> Result<String> {
        let uri = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        let path = match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_string(),
        };

        let mut prompt = digest_auth::parse(challenge)
            .map_err(|err| anyhow::anyhow!("Unsupported authentication challenge: {}", err))?;
        let context = AuthContext::new_post(
            self.username.as_str(),
            self.password.as_str(),
            path.as_str(),
            Some(body.as_bytes()),
        );
        let answer = prompt
            .respond(&context)
            .map_err(|err| anyhow::anyhow!("Failed to answer digest challenge: {}", err))?;

        Ok(answer.to_header_string())
    }
}

#[async_trait]
impl ChangeActions for GerritClient {
    #[instrument(skip(self))]
    async fn abandon(&self, change_id: &str) -> Result<ActionOutcome> {
        info!("Abandoning change");
        self.post_message(&self.abandon_url(change_id), ABANDON_MESSAGE)
            .await
    }

    #[instrument(skip(self))]
    async fn warn(&self, change_id: &str, revision_id: &str) -> Result<ActionOutcome> {
        info!("Warning change");
        self.post_message(&self.review_url(change_id, revision_id), WARN_MESSAGE)
            .await
    }
}
