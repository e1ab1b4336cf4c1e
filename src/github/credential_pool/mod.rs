//! Pool of GitHub tokens with locally tracked rate-limit state
//!
//! The pool keeps one [`Credential`] per configured token, each owning a
//! reusable authenticated [`GithubClient`]. Selection ([`selector`]) hands out
//! the credential at the cursor until its remaining quota drops to the safety
//! margin, then rotates. After each call the rate-limit headers GitHub returned
//! are folded back into the credential that served it ([`rate_limit`]).
//!
//! ## Replacement
//!
//! [`CredentialPool::initialize`] replaces the whole pool. Quota tracking for
//! the previous tokens is discarded, not merged, and the pool generation is
//! bumped so that usage recorded against a lease from the old pool is ignored.

pub mod clock;
pub mod rate_limit;
pub mod selector;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::client::{GithubClient, GithubClientConfig};
use crate::github::error::{GithubPoolError, Result};

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::RateLimitInfo;
pub use selector::{Lease, select_handle};

/// Quota assumed for a fresh or lazily reset token (GitHub's authenticated hourly limit)
pub const DEFAULT_QUOTA: u32 = 5000;

/// A credential is only selected while its remaining quota is above this value
pub const SAFETY_MARGIN: u32 = 10;

/// Length of the assumed quota window
pub fn quota_window() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// Separator between tokens in `GITHUB_TOKENS` and in per-call overrides
pub const TOKEN_SEPARATOR: char = ',';

/// Whether an empty token list is acceptable when (re)initializing the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// An empty list yields an empty pool and unauthenticated access
    Optional,
    /// An empty list is an [`GithubPoolError::InvalidConfiguration`]
    Required,
}

/// One token plus its locally tracked quota state
pub struct Credential {
    secret: String,
    client: GithubClient,
    quota_remaining: u32,
    quota_reset_at: DateTime<Utc>,
}

impl Credential {
    fn new(secret: String, client: GithubClient, now: DateTime<Utc>) -> Self {
        Self {
            secret,
            client,
            quota_remaining: DEFAULT_QUOTA,
            quota_reset_at: now + quota_window(),
        }
    }

    pub fn quota_remaining(&self) -> u32 {
        self.quota_remaining
    }

    pub fn quota_reset_at(&self) -> DateTime<Utc> {
        self.quota_reset_at
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    /// Quota and reset time are always written together
    fn set_quota(&mut self, remaining: u32, reset_at: DateTime<Utc>) {
        self.quota_remaining = remaining;
        self.quota_reset_at = reset_at;
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &redact(&self.secret))
            .field("quota_remaining", &self.quota_remaining)
            .field("quota_reset_at", &self.quota_reset_at)
            .finish()
    }
}

fn redact(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() > 8 {
        format!("***{}", tail)
    } else {
        "***".to_string()
    }
}

/// Per-credential snapshot returned by the diagnostic surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub index: usize,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub is_active: bool,
}

pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: usize,
    generation: u64,
    client_config: GithubClientConfig,
    clock: Arc<dyn Clock>,
}

impl CredentialPool {
    /// Creates an empty pool
    pub fn new(client_config: GithubClientConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials: Vec::new(),
            cursor: 0,
            generation: 0,
            client_config,
            clock,
        }
    }

    /// Creates a pool from a comma-separated token list
    pub fn from_secrets(
        secret_list: &str,
        requirement: AuthRequirement,
        client_config: GithubClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut pool = Self::new(client_config, clock);
        pool.initialize(secret_list, requirement)?;
        Ok(pool)
    }

    /// Replaces every credential with those parsed from `secret_list`
    ///
    /// Tokens are split on `,` and trimmed; blank entries are skipped. Each
    /// surviving token gets a fresh quota of [`DEFAULT_QUOTA`] resetting one
    /// hour from now, the cursor returns to 0 and the generation is bumped.
    ///
    /// On error the existing pool is left untouched.
    ///
    /// # Returns
    ///
    /// The number of credentials now in the pool
    pub fn initialize(&mut self, secret_list: &str, requirement: AuthRequirement) -> Result<usize> {
        let secrets = parse_secret_list(secret_list);

        if secrets.is_empty() && requirement == AuthRequirement::Required {
            return Err(GithubPoolError::invalid_configuration(
                "At least one GitHub token is required",
            ));
        }

        let now = self.clock.now();
        let mut credentials = Vec::with_capacity(secrets.len());
        for secret in secrets {
            let client = GithubClient::authenticated(&self.client_config, &secret)?;
            credentials.push(Credential::new(secret, client, now));
        }

        self.credentials = credentials;
        self.cursor = 0;
        self.generation = self.generation.wrapping_add(1);

        tracing::info!(
            credentials = self.credentials.len(),
            generation = self.generation,
            "Credential pool initialized"
        );

        Ok(self.credentials.len())
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Index of the currently preferred credential; meaningless when empty
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn status(&self) -> Vec<RateLimitStatus> {
        self.credentials
            .iter()
            .enumerate()
            .map(|(index, credential)| RateLimitStatus {
                index,
                remaining: credential.quota_remaining,
                reset_time: credential.quota_reset_at,
                is_active: index == self.cursor,
            })
            .collect()
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("credentials", &self.credentials)
            .field("cursor", &self.cursor)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Splits a comma-separated token list, trimming whitespace and dropping blanks
pub fn parse_secret_list(secret_list: &str) -> Vec<String> {
    secret_list
        .split(TOKEN_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}
