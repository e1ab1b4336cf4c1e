//! GitHub access through a pool of rate-limited tokens
//!
//! This module provides:
//! - a credential pool that rotates tokens around GitHub's rate limits
//! - a small REST client for releases, repository contents and repository listings
//! - the [`RepositoryManager`] that combines both
//!
//! ## Authentication
//!
//! Tokens are supplied as a comma-separated list:
//!
//! ```bash
//! export GITHUB_TOKENS=ghp_first,ghp_second
//! ```
//!
//! ```no_run
//! use github_pool_mcp::github::RepositoryManager;
//!
//! # async fn example() -> Result<(), github_pool_mcp::github::GithubPoolError> {
//! let manager = RepositoryManager::with_default_config(Some("ghp_first,ghp_second"))?;
//! let release = manager.get_latest_release("tokio-rs", "tokio", None).await?;
//! println!("{}", release.tag_name);
//! # Ok(())
//! # }
//! ```
//!
//! Without tokens every call uses unauthenticated access, limited to public
//! repositories and 60 requests/hour.

pub mod client;
pub mod credential_pool;
pub mod error;
pub mod repository_manager;

pub use client::{
    ContentEntry, FileContent, GithubClient, GithubClientConfig, ReleaseAsset, ReleaseInfo,
    RepositoryContent, RepositorySummary, RepositoryType,
};
pub use credential_pool::{AuthRequirement, CredentialPool, RateLimitStatus};
pub use error::GithubPoolError;
pub use repository_manager::RepositoryManager;
