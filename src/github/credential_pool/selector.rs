//! Sticky round-robin credential selection
//!
//! Scanning starts at the pool cursor and wraps around once. The first
//! credential whose quota is above [`SAFETY_MARGIN`] (after a lazy reset if its
//! reset time has been reached) becomes the cursor and serves the call. The same
//! credential therefore keeps serving consecutive calls until it nears
//! exhaustion.
//!
//! When every credential is exhausted the caller sleeps until the earliest
//! reset and then scans again. The pool lock is released for the duration of
//! that sleep so other operations keep running.

use std::time::Duration;

use tokio::sync::Mutex;

use super::{CredentialPool, DEFAULT_QUOTA, SAFETY_MARGIN, quota_window};
use crate::github::client::GithubClient;
use crate::github::error::Result;

/// A client handle handed out by the selector
///
/// Remembers which pool slot it came from so that the rate-limit headers of
/// the resulting response can be attributed to the right credential.
#[derive(Debug, Clone)]
pub struct Lease {
    client: GithubClient,
    slot: Option<LeaseSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeaseSlot {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl Lease {
    fn pooled(client: GithubClient, index: usize, generation: u64) -> Self {
        Self {
            client,
            slot: Some(LeaseSlot { index, generation }),
        }
    }

    fn unauthenticated(client: GithubClient) -> Self {
        Self { client, slot: None }
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    /// Pool index of the credential behind this lease, `None` when unauthenticated
    pub fn index(&self) -> Option<usize> {
        self.slot.map(|slot| slot.index)
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot.is_some()
    }

    pub(crate) fn slot(&self) -> Option<LeaseSlot> {
        self.slot
    }
}

/// Outcome of a single scan over the pool
#[derive(Debug)]
pub enum Selection {
    Ready(Lease),
    /// Every credential is at or below the safety margin
    Exhausted { wait: Duration },
}

impl CredentialPool {
    /// Runs one selection pass without waiting
    ///
    /// An empty pool yields a fresh unauthenticated handle. Otherwise the pool
    /// is scanned from the cursor; lazy resets are applied to credentials whose
    /// reset time has been reached. If nothing qualifies, the time until the earliest
    /// reset is returned. A non-positive wait falls back to the first credential.
    pub fn try_select(&mut self) -> Result<Selection> {
        if self.credentials.is_empty() {
            tracing::warn!(
                "No GitHub tokens available. Using unauthenticated API (limited to public repositories and lower rate limits)."
            );
            let client = GithubClient::unauthenticated(&self.client_config)?;
            return Ok(Selection::Ready(Lease::unauthenticated(client)));
        }

        let now = self.clock.now();
        let len = self.credentials.len();

        for offset in 0..len {
            let index = (self.cursor + offset) % len;
            let credential = &mut self.credentials[index];

            if now >= credential.quota_reset_at {
                tracing::debug!(index, "Quota window elapsed, resetting credential quota");
                credential.set_quota(DEFAULT_QUOTA, now + quota_window());
            }

            if credential.quota_remaining > SAFETY_MARGIN {
                if index != self.cursor {
                    tracing::debug!(from = self.cursor, to = index, "Rotating to next credential");
                }
                self.cursor = index;
                let client = credential.client.clone();
                return Ok(Selection::Ready(Lease::pooled(client, index, self.generation)));
            }
        }

        let next_reset = self
            .credentials
            .iter()
            .map(|credential| credential.quota_reset_at)
            .min()
            .unwrap_or(now);
        let wait = (next_reset - now).to_std().unwrap_or(Duration::ZERO);

        if wait.is_zero() {
            self.cursor = 0;
            let client = self.credentials[0].client.clone();
            return Ok(Selection::Ready(Lease::pooled(client, 0, self.generation)));
        }

        Ok(Selection::Exhausted { wait })
    }
}

/// Returns a usable client handle, waiting out rate limits if necessary
///
/// Never fails because of exhaustion: when every credential is at the safety
/// margin this sleeps until the earliest reset and tries again. The only error
/// is a failure to construct the unauthenticated fallback client.
pub async fn select_handle(pool: &Mutex<CredentialPool>) -> Result<Lease> {
    loop {
        let (wait, clock) = {
            let mut guard = pool.lock().await;
            match guard.try_select()? {
                Selection::Ready(lease) => return Ok(lease),
                Selection::Exhausted { wait } => (wait, guard.clock()),
            }
        };

        tracing::warn!(
            "Rate limit exceeded. Waiting {} seconds...",
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        );
        clock.sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::github::client::GithubClientConfig;
    use crate::github::credential_pool::clock::Clock;
    use crate::github::credential_pool::{AuthRequirement, ManualClock, RateLimitInfo};

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn pool_with(clock: &ManualClock, secrets: &str) -> CredentialPool {
        CredentialPool::from_secrets(
            secrets,
            AuthRequirement::Optional,
            GithubClientConfig::default(),
            Arc::new(clock.clone()),
        )
        .unwrap()
    }

    fn ready(selection: Selection) -> Lease {
        match selection {
            Selection::Ready(lease) => lease,
            Selection::Exhausted { wait } => panic!("expected a lease, pool exhausted for {:?}", wait),
        }
    }

    fn exhaust(pool: &mut CredentialPool, lease: &Lease, reset_at: DateTime<Utc>) {
        pool.record_usage(
            lease,
            Some(&RateLimitInfo {
                remaining: 5,
                reset_at,
            }),
        );
    }

    #[test]
    fn test_empty_pool_returns_unauthenticated_handle() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "");

        let lease = ready(pool.try_select().unwrap());
        assert!(!lease.is_authenticated());
        assert!(!lease.client().is_authenticated());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_sticky_selection_without_exhaustion() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b,c");

        for _ in 0..5 {
            let lease = ready(pool.try_select().unwrap());
            assert_eq!(lease.index(), Some(0));
            assert_eq!(pool.cursor(), 0);
        }
    }

    #[test]
    fn test_skips_credential_at_safety_margin() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b");

        let first = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &first, start() + chrono::Duration::minutes(30));

        let second = ready(pool.try_select().unwrap());
        assert_eq!(second.index(), Some(1));
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn test_margin_is_exclusive() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b");

        let first = ready(pool.try_select().unwrap());
        pool.record_usage(
            &first,
            Some(&RateLimitInfo {
                remaining: SAFETY_MARGIN,
                reset_at: start() + chrono::Duration::minutes(30),
            }),
        );
        assert_eq!(ready(pool.try_select().unwrap()).index(), Some(1));

        let second = ready(pool.try_select().unwrap());
        pool.record_usage(
            &second,
            Some(&RateLimitInfo {
                remaining: SAFETY_MARGIN + 1,
                reset_at: start() + chrono::Duration::minutes(30),
            }),
        );
        assert_eq!(ready(pool.try_select().unwrap()).index(), Some(1));
    }

    #[test]
    fn test_scan_wraps_around_to_earlier_credential() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b,c");
        let reset = start() + chrono::Duration::minutes(30);

        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, reset);
        let lease = ready(pool.try_select().unwrap());
        assert_eq!(lease.index(), Some(1));
        exhaust(&mut pool, &lease, reset);
        let lease = ready(pool.try_select().unwrap());
        assert_eq!(lease.index(), Some(2));

        // Index 0 comes back after its window passes; scanning from 2 wraps to it
        pool.record_usage(
            &lease,
            Some(&RateLimitInfo {
                remaining: 3,
                reset_at: start() + chrono::Duration::hours(2),
            }),
        );
        clock.advance(chrono::Duration::minutes(31));

        let lease = ready(pool.try_select().unwrap());
        assert_eq!(lease.index(), Some(0));
        assert_eq!(pool.credentials()[0].quota_remaining(), DEFAULT_QUOTA);
    }

    #[test]
    fn test_lazy_reset_applies_before_margin_check() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a");

        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start() + chrono::Duration::seconds(60));

        clock.advance(chrono::Duration::seconds(61));
        let lease = ready(pool.try_select().unwrap());

        assert_eq!(lease.index(), Some(0));
        let credential = &pool.credentials()[0];
        assert_eq!(credential.quota_remaining(), DEFAULT_QUOTA);
        assert_eq!(credential.quota_reset_at(), clock.now() + quota_window());
    }

    #[test]
    fn test_exhausted_pool_reports_wait_until_earliest_reset() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b");

        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start() + chrono::Duration::seconds(300));
        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start() + chrono::Duration::seconds(120));

        match pool.try_select().unwrap() {
            Selection::Exhausted { wait } => assert_eq!(wait, Duration::from_secs(120)),
            Selection::Ready(lease) => panic!("unexpected lease {:?}", lease.index()),
        }
    }

    #[test]
    fn test_reset_time_reached_counts_as_elapsed() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b");

        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start());

        let lease = ready(pool.try_select().unwrap());
        assert_eq!(lease.index(), Some(0));
        assert_eq!(pool.credentials()[0].quota_remaining(), DEFAULT_QUOTA);
    }

    #[tokio::test]
    async fn test_select_handle_waits_for_earliest_reset() {
        let clock = ManualClock::new(start());
        let mut pool = pool_with(&clock, "a,b");

        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start() + chrono::Duration::seconds(900));
        let lease = ready(pool.try_select().unwrap());
        exhaust(&mut pool, &lease, start() + chrono::Duration::seconds(600));

        let pool = Mutex::new(pool);
        let lease = select_handle(&pool).await.unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(600)]);
        assert_eq!(lease.index(), Some(1));
        let guard = pool.lock().await;
        assert_eq!(guard.cursor(), 1);
        assert_eq!(guard.credentials()[1].quota_remaining(), DEFAULT_QUOTA);
    }
}
