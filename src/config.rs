//! Startup configuration shared by the server and CLI binaries
//!
//! Tokens come from `--github-tokens` or the `GITHUB_TOKENS` environment
//! variable (clap handles the precedence). A `.env` file is loaded first so
//! that its values can feed those environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use url::Url;

use crate::github::client::{DEFAULT_API_URL, GithubClientConfig};
use crate::github::credential_pool::{AuthRequirement, SystemClock};
use crate::github::error::Result;
use crate::github::RepositoryManager;

/// Environment variable holding the comma-separated token list
pub const GITHUB_TOKENS_ENV: &str = "GITHUB_TOKENS";

/// Environment variable overriding the REST API base URL
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";

/// GitHub access options common to every binary
#[derive(Debug, Clone, Args)]
pub struct GithubArgs {
    /// Comma-separated GitHub personal access tokens (overrides the GITHUB_TOKENS environment variable)
    #[arg(short = 't', long = "github-tokens", env = GITHUB_TOKENS_ENV, hide_env_values = true, global = true)]
    pub github_tokens: Option<String>,

    /// Base URL of the GitHub REST API (for GitHub Enterprise or testing)
    #[arg(long = "api-url", env = GITHUB_API_URL_ENV, default_value = DEFAULT_API_URL, global = true)]
    pub api_url: Url,

    /// Fail at startup when no token is configured instead of falling back to unauthenticated access
    #[arg(long, global = true)]
    pub require_tokens: bool,
}

impl GithubArgs {
    pub fn auth_requirement(&self) -> AuthRequirement {
        if self.require_tokens {
            AuthRequirement::Required
        } else {
            AuthRequirement::Optional
        }
    }

    pub fn client_config(&self) -> GithubClientConfig {
        GithubClientConfig::default().with_api_base_url(self.api_url.clone())
    }

    /// Builds the repository manager these options describe
    pub fn build_manager(&self) -> Result<RepositoryManager> {
        RepositoryManager::from_tokens(
            self.github_tokens.as_deref(),
            self.auth_requirement(),
            self.client_config(),
            Arc::new(SystemClock),
        )
    }
}

/// Loads `KEY=VALUE` pairs from the nearest `.env` file into the process environment
///
/// The search walks up from the current directory and stops at a directory
/// containing `Cargo.toml` or `.git`. Variables that are already set are not
/// overridden.
///
/// Must be called before any other thread is spawned.
///
/// # Returns
///
/// The path of the loaded file, if one was found
pub fn load_dotenv() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let path = find_dotenv_path(&cwd)?;
    let contents = std::fs::read_to_string(&path).ok()?;

    for (key, value) in contents.lines().filter_map(parse_dotenv_line) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        // SAFETY: only called at startup, before the runtime spawns worker threads
        unsafe {
            std::env::set_var(key, value);
        }
    }

    Some(path)
}

/// Finds the nearest `.env` walking up from `start`
pub fn find_dotenv_path(start: &Path) -> Option<PathBuf> {
    let mut dir = start;

    loop {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }

        if dir.join("Cargo.toml").is_file() || dir.join(".git").is_dir() {
            return None;
        }

        dir = dir.parent()?;
    }
}

/// Parses one `.env` line; blank lines and comments yield `None`
pub fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}
