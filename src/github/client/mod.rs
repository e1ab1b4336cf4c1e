//! Minimal GitHub REST client used as the per-credential handle
//!
//! Each [`GithubClient`] is bound to at most one token. Every call returns an
//! [`ApiResponse`] carrying the decoded payload together with the rate-limit
//! headers GitHub sent back, so the credential pool can track quota.
//!
//! # Errors
//!
//! - HTTP 404 becomes [`GithubPoolError::RemoteNotFound`]
//! - every other non-success status, network failure or undecodable body
//!   becomes [`GithubPoolError::Transport`]

pub mod models;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::github::credential_pool::RateLimitInfo;
use crate::github::error::{GithubPoolError, Result};

pub use models::{
    ContentEntry, FileContent, ReleaseAsset, ReleaseInfo, RepositoryContent, RepositorySummary,
    RepositoryType,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Number of repositories requested per listing call (GitHub's maximum page size)
pub const REPOSITORIES_PER_PAGE: u8 = 100;

/// Settings shared by every handle the pool creates
#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    /// Base URL of the REST API, e.g. `https://api.github.com`
    pub api_base_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
}

impl GithubClientConfig {
    pub fn with_api_base_url(mut self, api_base_url: Url) -> Self {
        self.api_base_url = api_base_url;
        self
    }
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_URL).expect("DEFAULT_API_URL must be a valid URL"),
            user_agent: format!(
                "github-pool-mcp/{} (https://github.com/tacogips/github-pool-mcp)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Decoded payload plus the quota state reported with it
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: Option<RateLimitInfo>,
}

/// HTTP handle for the GitHub REST API, optionally authenticated with one token
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
    github_token: Option<String>,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("authenticated", &self.github_token.is_some())
            .finish()
    }
}

impl GithubClient {
    /// Creates a client that sends `token` as a bearer credential
    pub fn authenticated(config: &GithubClientConfig, token: &str) -> Result<Self> {
        Self::build(config, Some(token.to_string()))
    }

    /// Creates a client without credentials (60 requests/hour, public data only)
    pub fn unauthenticated(config: &GithubClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    fn build(config: &GithubClientConfig, github_token: Option<String>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static(GITHUB_API_VERSION),
        );

        if let Some(token) = &github_token {
            let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    GithubPoolError::ClientBuild(
                        "GitHub token contains characters not allowed in an HTTP header"
                            .to_string(),
                    )
                })?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GithubPoolError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            github_token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.github_token.is_some()
    }

    /// Fetches the latest published release of `owner/repo`
    ///
    /// GitHub answers 404 both for a missing repository and for a repository
    /// without releases.
    pub async fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<ReleaseInfo>> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        self.get_json(&url, &[], format!("{}/{}", owner, repo)).await
    }

    /// Fetches a file or a directory listing at `path` for the given git reference
    ///
    /// An empty `path` lists the repository root. File content encoded as
    /// base64 is decoded to text.
    pub async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        ref_name: &str,
    ) -> Result<ApiResponse<RepositoryContent>> {
        let encoded_path = encode_content_path(path);
        let mut url = format!(
            "{}/repos/{}/{}/contents",
            self.api_base,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        if !encoded_path.is_empty() {
            url.push('/');
            url.push_str(&encoded_path);
        }

        let response: ApiResponse<RepositoryContent> = self
            .get_json(&url, &[("ref", ref_name)], format!("{}/{}/{}", owner, repo, path))
            .await?;

        let data = match response.data {
            RepositoryContent::File(file) => RepositoryContent::File(file.decode_content()),
            directory => directory,
        };

        Ok(ApiResponse {
            data,
            rate_limit: response.rate_limit,
        })
    }

    /// Lists repositories of an organization (first page of up to 100)
    pub async fn list_org_repositories(
        &self,
        org: &str,
        repo_type: RepositoryType,
    ) -> Result<ApiResponse<Vec<RepositorySummary>>> {
        let url = format!("{}/orgs/{}/repos", self.api_base, urlencoding::encode(org));
        self.list_repositories(&url, repo_type, org).await
    }

    /// Lists repositories of a user (first page of up to 100)
    pub async fn list_user_repositories(
        &self,
        username: &str,
        repo_type: RepositoryType,
    ) -> Result<ApiResponse<Vec<RepositorySummary>>> {
        let url = format!("{}/users/{}/repos", self.api_base, urlencoding::encode(username));
        self.list_repositories(&url, repo_type, username).await
    }

    async fn list_repositories(
        &self,
        url: &str,
        repo_type: RepositoryType,
        owner: &str,
    ) -> Result<ApiResponse<Vec<RepositorySummary>>> {
        let per_page = REPOSITORIES_PER_PAGE.to_string();
        self.get_json(
            url,
            &[("type", repo_type.to_str()), ("per_page", per_page.as_str())],
            owner.to_string(),
        )
        .await
    }

    /// Sends a GET request and decodes the JSON body
    ///
    /// `resource` names what was requested and ends up in the not-found error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        resource: String,
    ) -> Result<ApiResponse<T>> {
        tracing::debug!(url, authenticated = self.is_authenticated(), "GitHub API request");

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GithubPoolError::RemoteNotFound { resource });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GithubPoolError::transport(Some(status.as_u16()), error_text));
        }

        let rate_limit = RateLimitInfo::from_headers(response.headers());

        let data = response.json::<T>().await.map_err(|e| {
            GithubPoolError::transport(None, format!("Failed to parse GitHub response: {}", e))
        })?;

        Ok(ApiResponse { data, rate_limit })
    }
}

/// Percent-encodes each segment of a repository path, keeping the separators
fn encode_content_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
