//! Ledger store client implementation.

use crate::config::RetryConfig;
use crate::envelope::{decode_ledger, encode_ledger, ContentsResponse, UpdateRequest, UpdateResponse};
use async_trait::async_trait;
use banward_core::{
    BanLedger, BanwardError, ConcurrencyToken, LedgerSnapshot, LedgerStore, Result,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// The hosted git API base URL
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Media type requested from the contents endpoint
const CONTENTS_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Client for the remote ban ledger document
#[derive(Clone)]
pub struct LedgerStoreClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    access_token: String,
    contents_url: Url,
    branch: Option<String>,
    create_if_missing: bool,
    retry_config: RetryConfig,
}

impl LedgerStoreClient {
    /// Create a builder for the document at `path` in `owner/repo`
    #[must_use]
    pub fn builder(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
    ) -> LedgerStoreClientBuilder {
        LedgerStoreClientBuilder::new(owner, repo, path)
    }

    /// URL of the ledger document
    #[must_use]
    pub fn contents_url(&self) -> &Url {
        &self.inner.contents_url
    }

    /// Fetch the ledger and its concurrency token.
    ///
    /// Transport failures are retried with backoff; decode failures are not.
    pub async fn read(&self) -> Result<LedgerSnapshot> {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            match self.read_once().await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = retry.backoff_for(attempt);
                    warn!(error = %e, attempt, ?backoff, "ledger read failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn read_once(&self) -> Result<LedgerSnapshot> {
        let mut url = self.inner.contents_url.clone();
        if let Some(branch) = &self.inner.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        debug!(url = %url, "GET ledger");

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if self.inner.create_if_missing {
                info!(url = %self.inner.contents_url, "ledger document missing, starting empty");
                return Ok(LedgerSnapshot::new(
                    BanLedger::new(),
                    ConcurrencyToken::absent(),
                ));
            }
            return Err(BanwardError::NotFound {
                resource: self.inner.contents_url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(handle_error(status, response).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        let contents: ContentsResponse = serde_json::from_str(&body)
            .map_err(|e| BanwardError::Decode(format!("unexpected contents reply: {e}")))?;
        let ledger = decode_ledger(&contents)?;

        debug!(sha = %contents.sha, entries = ledger.len(), "ledger read");
        Ok(LedgerSnapshot::new(ledger, ConcurrencyToken::new(contents.sha)))
    }

    /// Replace the whole document if it is still at `token`.
    ///
    /// Returns the token of the new version. Never retried here: on
    /// [`BanwardError::Conflict`] the caller must read again.
    pub async fn write(
        &self,
        ledger: &BanLedger,
        token: &ConcurrencyToken,
        description: &str,
    ) -> Result<ConcurrencyToken> {
        if description.trim().is_empty() {
            return Err(BanwardError::Validation(
                "a change description is required for every ledger write".into(),
            ));
        }

        let request = UpdateRequest {
            message: description,
            content: encode_ledger(ledger)?,
            sha: token.as_str(),
            branch: self.inner.branch.as_deref(),
        };
        debug!(url = %self.inner.contents_url, token = %token, entries = ledger.len(), "PUT ledger");

        let response = self
            .request(Method::PUT, self.inner.contents_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(transport_error)?;
            let updated: UpdateResponse = serde_json::from_str(&body)
                .map_err(|e| BanwardError::Decode(format!("unexpected update reply: {e}")))?;
            info!(sha = %updated.content.sha, description, "ledger committed");
            return Ok(ConcurrencyToken::new(updated.content.sha));
        }

        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = error_message(response).await;
            warn!(token = %token, %status, reason = %message, "ledger write rejected, document changed");
            return Err(BanwardError::Conflict(format!(
                "write at {token} rejected: {message}"
            )));
        }

        Err(handle_error(status, response).await)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("token {}", self.inner.access_token))
            .header(ACCEPT, CONTENTS_MEDIA_TYPE)
    }
}

#[async_trait]
impl LedgerStore for LedgerStoreClient {
    async fn read(&self) -> Result<LedgerSnapshot> {
        Self::read(self).await
    }

    async fn write(
        &self,
        ledger: &BanLedger,
        token: &ConcurrencyToken,
        description: &str,
    ) -> Result<ConcurrencyToken> {
        Self::write(self, ledger, token, description).await
    }
}

/// Convert an unexpected status into a [`BanwardError`]
async fn handle_error(status: StatusCode, response: reqwest::Response) -> BanwardError {
    let message = error_message(response).await;

    match status.as_u16() {
        401 | 403 => BanwardError::Config(format!(
            "ledger store rejected the access token ({status}): {message}"
        )),
        404 => BanwardError::NotFound { resource: message },
        _ => BanwardError::Transport(format!("unexpected status {status}: {message}")),
    }
}

/// Pull `message` out of a JSON error body, falling back to the raw body
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body)
}

fn transport_error(e: reqwest::Error) -> BanwardError {
    BanwardError::Transport(e.to_string())
}

/// Builder for configuring a [`LedgerStoreClient`]
pub struct LedgerStoreClientBuilder {
    owner: String,
    repo: String,
    path: String,
    api_base: String,
    access_token: Option<String>,
    branch: Option<String>,
    timeout: Duration,
    user_agent: String,
    create_if_missing: bool,
    retry_config: RetryConfig,
}

impl LedgerStoreClientBuilder {
    /// Create a new builder for the document at `path` in `owner/repo`
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: None,
            branch: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("banward/{}", env!("CARGO_PKG_VERSION")),
            create_if_missing: true,
            retry_config: RetryConfig::default(),
        }
    }

    /// Set the API base URL (useful for testing)
    #[must_use]
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set the access token used to authenticate
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Read and write on this branch instead of the default one
    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Whether a missing document reads as an empty ledger (default) or
    /// fails with [`BanwardError::NotFound`]
    #[must_use]
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Set retry configuration for reads
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<LedgerStoreClient> {
        let access_token = self
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| BanwardError::Config("missing ledger store access token".into()))?;

        for (field, value) in [("owner", &self.owner), ("repo", &self.repo), ("path", &self.path)] {
            if value.trim().is_empty() {
                return Err(BanwardError::Config(format!("ledger store {field} is empty")));
            }
        }

        let contents_url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.path.trim_start_matches('/')
        );
        let contents_url = Url::parse(&contents_url)
            .map_err(|e| BanwardError::Config(format!("invalid ledger URL {contents_url}: {e}")))?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| BanwardError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(LedgerStoreClient {
            inner: Arc::new(ClientInner {
                http,
                access_token,
                contents_url,
                branch: self.branch,
                create_if_missing: self.create_if_missing,
                retry_config: self.retry_config,
            }),
        })
    }
}
