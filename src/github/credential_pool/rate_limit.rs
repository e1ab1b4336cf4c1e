//! Folding GitHub's rate-limit headers back into the pool
//!
//! GitHub reports the remaining quota and the reset time on every REST
//! response:
//! - `x-ratelimit-remaining`: requests left in the current window
//! - `x-ratelimit-reset`: end of the window, in epoch seconds
//!
//! These values are authoritative over the pool's own lazy-reset estimate.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

use super::CredentialPool;
use super::selector::Lease;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota state reported by the remote for the credential that made a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Builds the info from raw header values; both must be present and valid
    pub fn from_parts(remaining: Option<&str>, reset_epoch_secs: Option<&str>) -> Option<Self> {
        let remaining = remaining?.trim().parse::<u32>().ok()?;
        let reset_secs = reset_epoch_secs?.trim().parse::<i64>().ok()?;
        let reset_at = DateTime::from_timestamp(reset_secs, 0)?;
        Some(Self {
            remaining,
            reset_at,
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Self::from_parts(header_str(headers, REMAINING_HEADER), header_str(headers, RESET_HEADER))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl CredentialPool {
    /// Overwrites the leased credential's quota with what the remote reported
    ///
    /// No-op when `info` is `None`, when the lease is unauthenticated, or when
    /// the lease predates the last pool replacement.
    pub fn record_usage(&mut self, lease: &Lease, info: Option<&RateLimitInfo>) {
        let Some(info) = info else {
            return;
        };
        let Some(slot) = lease.slot() else {
            return;
        };

        if slot.generation != self.generation {
            tracing::debug!(
                lease_generation = slot.generation,
                pool_generation = self.generation,
                "Discarding rate-limit update for a replaced credential pool"
            );
            return;
        }

        match self.credentials.get_mut(slot.index) {
            Some(credential) => {
                credential.set_quota(info.remaining, info.reset_at);
                tracing::debug!(
                    index = slot.index,
                    remaining = info.remaining,
                    reset_at = %info.reset_at,
                    "Updated credential rate limit"
                );
            }
            None => {
                tracing::debug!(index = slot.index, "Rate-limit update for unknown credential index");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::header::HeaderValue;

    use super::*;
    use crate::github::client::GithubClientConfig;
    use crate::github::credential_pool::selector::Selection;
    use crate::github::credential_pool::clock::Clock;
    use crate::github::credential_pool::{AuthRequirement, DEFAULT_QUOTA, ManualClock};

    fn pool_and_clock(secrets: &str) -> (CredentialPool, ManualClock) {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let pool = CredentialPool::from_secrets(
            secrets,
            AuthRequirement::Optional,
            GithubClientConfig::default(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (pool, clock)
    }

    fn lease(pool: &mut CredentialPool) -> Lease {
        match pool.try_select().unwrap() {
            Selection::Ready(lease) => lease,
            Selection::Exhausted { .. } => panic!("pool unexpectedly exhausted"),
        }
    }

    #[test]
    fn test_from_headers_reads_github_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("4999"));
        headers.insert(RESET_HEADER, HeaderValue::from_static("1640995200"));

        let info = RateLimitInfo::from_headers(&headers).unwrap();
        assert_eq!(info.remaining, 4999);
        assert_eq!(info.reset_at, DateTime::from_timestamp(1_640_995_200, 0).unwrap());
    }

    #[test]
    fn test_from_headers_requires_both_values() {
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("4999"));
        assert!(RateLimitInfo::from_headers(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(RESET_HEADER, HeaderValue::from_static("1640995200"));
        assert!(RateLimitInfo::from_headers(&headers).is_none());

        assert!(RateLimitInfo::from_parts(Some("-1"), Some("1640995200")).is_none());
        assert!(RateLimitInfo::from_parts(Some("12"), Some("soon")).is_none());
    }

    #[test]
    fn test_record_usage_overwrites_leased_credential() {
        let (mut pool, _clock) = pool_and_clock("a,b");
        let lease = lease(&mut pool);
        let reset_at = DateTime::from_timestamp(1_700_003_600, 0).unwrap();

        pool.record_usage(
            &lease,
            Some(&RateLimitInfo {
                remaining: 4999,
                reset_at,
            }),
        );

        assert_eq!(pool.credentials()[0].quota_remaining(), 4999);
        assert_eq!(pool.credentials()[0].quota_reset_at(), reset_at);
        assert_eq!(pool.credentials()[1].quota_remaining(), DEFAULT_QUOTA);
    }

    #[test]
    fn test_record_usage_without_metadata_is_noop() {
        let (mut pool, _clock) = pool_and_clock("a");
        let lease = lease(&mut pool);
        let before = pool.credentials()[0].quota_reset_at();

        pool.record_usage(&lease, None);

        assert_eq!(pool.credentials()[0].quota_remaining(), DEFAULT_QUOTA);
        assert_eq!(pool.credentials()[0].quota_reset_at(), before);
    }

    #[test]
    fn test_record_usage_ignores_lease_from_replaced_pool() {
        let (mut pool, clock) = pool_and_clock("a,b");
        let stale = lease(&mut pool);

        pool.initialize("c", AuthRequirement::Required).unwrap();
        pool.record_usage(
            &stale,
            Some(&RateLimitInfo {
                remaining: 1,
                reset_at: clock.now(),
            }),
        );

        assert_eq!(pool.credentials()[0].quota_remaining(), DEFAULT_QUOTA);
    }

    #[test]
    fn test_record_usage_ignores_unauthenticated_lease() {
        let (mut empty, clock) = pool_and_clock("");
        let unauthenticated = lease(&mut empty);

        let (mut pool, _) = pool_and_clock("a");
        pool.record_usage(
            &unauthenticated,
            Some(&RateLimitInfo {
                remaining: 1,
                reset_at: clock.now(),
            }),
        );

        assert_eq!(pool.credentials()[0].quota_remaining(), DEFAULT_QUOTA);
    }
}
