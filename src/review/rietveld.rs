//! HTTP client for a Rietveld-style review server

use crate::error::{Error, Result};
use crate::review::{IssueMetadata, MessagePost, PatchUpload, ReviewService};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Response};
use std::sync::LazyLock;
use tracing::debug;

/// Environment variable holding the review-server API token
pub const TOKEN_ENV_VAR: &str = "GIT_RV_TOKEN";

const XSRF_HEADER: &str = "X-Requesting-XSRF-Token";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

static UPLOAD_RESPONSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Issue (created|updated)\. URL: (?P<url>.+)$").expect("valid regex"));

/// Talks to a Rietveld server over HTTPS
pub struct RietveldClient {
    client: Client,
    token: Option<String>,
}

impl RietveldClient {
    /// Build a client with an explicit token
    pub fn new(token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, token }
    }

    /// Build a client using the token from [`TOKEN_ENV_VAR`], if set
    pub fn from_env() -> Self {
        Self::new(std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            Error::Auth(format!(
                "no review-server token; set the {TOKEN_ENV_VAR} environment variable"
            ))
        })
    }

    fn url(server: &str, path: &str) -> String {
        // Servers are normally bare hosts; an explicit scheme is honored so
        // tests can point at a local listener.
        if server.contains("://") {
            format!("{server}{path}")
        } else {
            format!("https://{server}{path}")
        }
    }

    async fn checked(server: &str, issue: u64, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::ReviewStatus {
                issue,
                server: server.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            })
        }
    }

    /// Retrieve the XSRF token required by mutating endpoints
    async fn xsrf_token(&self, server: &str) -> Result<String> {
        let response = self
            .client
            .get(Self::url(server, "/xsrf_token"))
            .bearer_auth(self.token()?)
            .header(XSRF_HEADER, "true")
            .send()
            .await?;
        let response = Self::checked(server, 0, response).await?;
        Ok(response.text().await?.trim().to_string())
    }

    fn upload_form(upload: &PatchUpload, xsrf_token: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("xsrf_token", xsrf_token.to_string()),
            ("base_rev", upload.base_revision.clone()),
            ("subject", upload.subject.clone()),
            ("description", upload.description.clone()),
            ("private", u8::from(upload.private).to_string()),
            ("send_mail", u8::from(upload.send_mail).to_string()),
        ];
        if let Some(cc) = &upload.cc {
            form.push(("cc", cc.join(",")));
        }
        if let Some(reviewers) = &upload.reviewers {
            form.push(("reviewers", reviewers.join(",")));
        }
        form
    }

    async fn send_upload(
        &self,
        server: &str,
        issue: Option<u64>,
        upload: &PatchUpload,
    ) -> Result<u64> {
        let xsrf_token = self.xsrf_token(server).await?;
        let mut form = Self::upload_form(upload, &xsrf_token);
        if let Some(issue) = issue {
            form.push(("issue", issue.to_string()));
        }

        debug!(server, ?issue, "uploading patch");
        let response = self
            .client
            .post(Self::url(server, "/upload"))
            .bearer_auth(self.token()?)
            .form(&form)
            .send()
            .await?;
        let response = Self::checked(server, issue.unwrap_or(0), response).await?;
        let body = response.text().await?;
        parse_upload_response(&body)
    }
}

/// Extract the issue id from the first line of an upload response
///
/// The server answers `Issue created. URL: https://server/<id>` (or
/// `updated`); the id is the final path segment of that URL.
fn parse_upload_response(body: &str) -> Result<u64> {
    let first_line = body.lines().next().unwrap_or_default();
    let url = UPLOAD_RESPONSE_RE
        .captures(first_line)
        .map(|captures| captures["url"].to_string())
        .ok_or_else(|| Error::Review(format!("unexpected upload response: {first_line:?}")))?;
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| Error::Review(format!("upload response URL {url:?} has no issue id")))
}

#[async_trait]
impl ReviewService for RietveldClient {
    async fn issue_metadata(&self, server: &str, issue: u64) -> Result<IssueMetadata> {
        let response = self
            .client
            .get(Self::url(server, &format!("/api/{issue}?messages=true")))
            .send()
            .await?;
        let response = Self::checked(server, issue, response).await?;
        Ok(response.json().await?)
    }

    async fn create_issue(&self, server: &str, upload: &PatchUpload) -> Result<u64> {
        self.send_upload(server, None, upload).await
    }

    async fn upload_patch(&self, server: &str, issue: u64, upload: &PatchUpload) -> Result<()> {
        self.send_upload(server, Some(issue), upload).await?;
        Ok(())
    }

    async fn publish_message(&self, server: &str, issue: u64, post: &MessagePost) -> Result<()> {
        let xsrf_token = self.xsrf_token(server).await?;
        let mut form = vec![
            ("xsrf_token", xsrf_token),
            ("message", post.message.clone()),
            ("subject", post.subject.clone()),
            ("message_only", "true".to_string()),
            ("no_redirect", "true".to_string()),
            ("send_mail", "on".to_string()),
        ];
        if let Some(cc) = &post.cc {
            form.push(("cc", cc.join(",")));
        }
        if let Some(reviewers) = &post.reviewers {
            form.push(("reviewers", reviewers.join(",")));
        }

        debug!(server, issue, "publishing message");
        let response = self
            .client
            .post(Self::url(server, &format!("/{issue}/publish")))
            .bearer_auth(self.token()?)
            .form(&form)
            .send()
            .await?;
        Self::checked(server, issue, response).await?;
        Ok(())
    }

    async fn close_issue(&self, server: &str, issue: u64) -> Result<()> {
        let xsrf_token = self.xsrf_token(server).await?;
        debug!(server, issue, "closing issue");
        let response = self
            .client
            .post(Self::url(server, &format!("/{issue}/close")))
            .bearer_auth(self.token()?)
            .form(&[("xsrf_token", xsrf_token)])
            .send()
            .await?;
        Self::checked(server, issue, response).await?;
        Ok(())
    }
}
