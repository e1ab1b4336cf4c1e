//! Token-pooled access to GitHub repositories
//!
//! [`RepositoryManager`] owns the shared credential pool and runs every
//! operation through the same sequence:
//!
//! 1. apply the per-call token override, if any (full pool replacement)
//! 2. pick a client handle with [`select_handle`] (may wait out rate limits)
//! 3. perform the GitHub call with that handle
//! 4. record the returned rate-limit headers against the credential used
//! 5. translate a 404 into a message naming the requested resource
//!
//! ## Concurrency
//!
//! Clones share one pool behind an async mutex. The lock is held only while
//! selecting, recording or replacing, never across a GitHub call or a
//! rate-limit wait. Two concurrent operations may therefore use the same
//! credential, and a replacement may land between another operation's
//! selection and its update; such stale updates are dropped.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::github::client::{
    ApiResponse, GithubClientConfig, ReleaseInfo, RepositoryContent, RepositorySummary,
    RepositoryType,
};
use crate::github::credential_pool::{
    AuthRequirement, Clock, CredentialPool, Lease, RateLimitStatus, SystemClock, select_handle,
};
use crate::github::error::{GithubPoolError, Result};

/// Path used when the caller does not name one (repository root)
pub const DEFAULT_CONTENT_PATH: &str = "";

/// Git reference used when the caller does not name one
pub const DEFAULT_REF: &str = "main";

#[derive(Clone)]
pub struct RepositoryManager {
    pool: Arc<Mutex<CredentialPool>>,
}

impl RepositoryManager {
    /// Wraps an already built pool
    pub fn new(pool: CredentialPool) -> Self {
        Self {
            pool: Arc::new(Mutex::new(pool)),
        }
    }

    /// Creates a manager from an optional comma-separated token list
    ///
    /// With [`AuthRequirement::Optional`] a missing or blank list gives an
    /// empty pool, and every call falls back to unauthenticated access.
    ///
    /// # Parameters
    ///
    /// * `github_tokens` - Tokens from the environment or command line
    /// * `requirement` - Whether an empty pool is a configuration error
    /// * `client_config` - API base URL, user agent and timeout for every handle
    /// * `clock` - Time source for quota resets and rate-limit waits
    pub fn from_tokens(
        github_tokens: Option<&str>,
        requirement: AuthRequirement,
        client_config: GithubClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let pool = CredentialPool::from_secrets(
            github_tokens.unwrap_or_default(),
            requirement,
            client_config,
            clock,
        )?;
        Ok(Self::new(pool))
    }

    /// Same as [`RepositoryManager::from_tokens`] with the system clock and default client settings
    pub fn with_default_config(github_tokens: Option<&str>) -> Result<Self> {
        Self::from_tokens(
            github_tokens,
            AuthRequirement::Optional,
            GithubClientConfig::default(),
            Arc::new(SystemClock),
        )
    }

    /// Number of credentials currently in the pool
    pub async fn credential_count(&self) -> usize {
        self.pool.lock().await.len()
    }

    /// Non-blocking variant of [`RepositoryManager::credential_count`]
    ///
    /// Returns `None` if the pool is locked by an in-flight operation.
    pub fn try_credential_count(&self) -> Option<usize> {
        self.pool.try_lock().ok().map(|pool| pool.len())
    }

    /// Per-credential quota state, marking the currently preferred credential
    pub async fn rate_limit_status(&self) -> Vec<RateLimitStatus> {
        self.pool.lock().await.status()
    }

    /// Replaces the whole pool with `github_tokens`
    ///
    /// Unlike startup configuration, an override without any usable token is
    /// rejected with [`GithubPoolError::InvalidConfiguration`].
    pub async fn replace_tokens(&self, github_tokens: &str) -> Result<usize> {
        let mut pool = self.pool.lock().await;
        pool.initialize(github_tokens, AuthRequirement::Required)
    }

    async fn apply_token_override(&self, github_tokens: Option<&str>) -> Result<()> {
        match github_tokens.map(str::trim).filter(|tokens| !tokens.is_empty()) {
            Some(tokens) => {
                tracing::info!("Replacing credential pool with per-call tokens");
                self.replace_tokens(tokens).await.map(|_| ())
            }
            None => Ok(()),
        }
    }

    async fn record<T>(&self, lease: &Lease, response: &ApiResponse<T>) {
        self.pool
            .lock()
            .await
            .record_usage(lease, response.rate_limit.as_ref());
    }

    /// Fetches the latest release of `owner/repo`
    ///
    /// # Errors
    ///
    /// - `NotFound("Repository {owner}/{repo} not found or no releases available")` on 404
    /// - `InvalidConfiguration` if `github_tokens` contains no usable token
    /// - `Transport` for any other GitHub failure
    pub async fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
        github_tokens: Option<&str>,
    ) -> Result<ReleaseInfo> {
        self.apply_token_override(github_tokens).await?;
        let lease = select_handle(&self.pool).await?;

        match lease.client().get_latest_release(owner, repo).await {
            Ok(response) => {
                self.record(&lease, &response).await;
                Ok(response.data)
            }
            Err(e) if e.is_remote_not_found() => Err(GithubPoolError::NotFound(format!(
                "Repository {}/{} not found or no releases available",
                owner, repo
            ))),
            Err(e) => Err(e),
        }
    }

    /// Fetches a file (decoded) or a directory listing from a repository
    ///
    /// `path` defaults to the repository root and `ref_name` to `main`.
    ///
    /// # Errors
    ///
    /// - `NotFound("Content not found: {owner}/{repo}/{path}")` on 404
    /// - `InvalidConfiguration` if `github_tokens` contains no usable token
    /// - `Transport` for any other GitHub failure
    pub async fn get_repository_content(
        &self,
        owner: &str,
        repo: &str,
        path: Option<&str>,
        ref_name: Option<&str>,
        github_tokens: Option<&str>,
    ) -> Result<RepositoryContent> {
        let path = path.unwrap_or(DEFAULT_CONTENT_PATH);
        let ref_name = ref_name.unwrap_or(DEFAULT_REF);

        self.apply_token_override(github_tokens).await?;
        let lease = select_handle(&self.pool).await?;

        match lease.client().get_content(owner, repo, path, ref_name).await {
            Ok(response) => {
                self.record(&lease, &response).await;
                Ok(response.data)
            }
            Err(e) if e.is_remote_not_found() => Err(GithubPoolError::NotFound(format!(
                "Content not found: {}/{}/{}",
                owner, repo, path
            ))),
            Err(e) => Err(e),
        }
    }

    /// Lists repositories of an organization, falling back to a user listing
    ///
    /// Any failure of the organization listing triggers the user listing with
    /// the same handle. If that fails too:
    ///
    /// - both 404: `NotFound("Organization or user {owner} not found")`
    /// - organization 404 only: the user listing error
    /// - otherwise: the organization error, unchanged
    pub async fn list_repositories(
        &self,
        owner: &str,
        repo_type: RepositoryType,
        github_tokens: Option<&str>,
    ) -> Result<Vec<RepositorySummary>> {
        self.apply_token_override(github_tokens).await?;
        let lease = select_handle(&self.pool).await?;

        let org_error = match lease.client().list_org_repositories(owner, repo_type).await {
            Ok(response) => {
                self.record(&lease, &response).await;
                return Ok(response.data);
            }
            Err(e) => e,
        };

        tracing::debug!(owner, "Organization listing failed ({}), trying user listing", org_error);

        match lease.client().list_user_repositories(owner, repo_type).await {
            Ok(response) => {
                self.record(&lease, &response).await;
                Ok(response.data)
            }
            Err(user_error) => {
                tracing::debug!(owner, "User listing failed: {}", user_error);
                match (org_error.is_remote_not_found(), user_error.is_remote_not_found()) {
                    (true, true) => Err(GithubPoolError::NotFound(format!(
                        "Organization or user {} not found",
                        owner
                    ))),
                    // Not an organization, so the user listing failure is the real one
                    (true, false) => Err(user_error),
                    (false, _) => Err(org_error),
                }
            }
        }
    }
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager").finish_non_exhaustive()
    }
}
