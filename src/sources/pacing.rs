//! Request pacing and throttle handling for paginated fetches.
//!
//! Sleeping goes through the [`Sleeper`] trait so pagination can be exercised
//! without real 60-second cooldowns.

use async_trait::async_trait;
use std::time::Duration;

/// Inter-request delay when an NVD API key is configured.
pub const KEYED_REQUEST_DELAY: Duration = Duration::from_millis(600);
/// Inter-request delay for anonymous access.
pub const ANONYMOUS_REQUEST_DELAY: Duration = Duration::from_secs(6);
/// Cooldown after the server answers 429.
pub const THROTTLE_COOLDOWN: Duration = Duration::from_secs(60);

/// Fixed pacing between pages plus the retry rule for throttled requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Sleep after every successful page that is not the last one.
    pub request_delay: Duration,
    /// Sleep before re-issuing a throttled request.
    pub throttle_cooldown: Duration,
    /// Consecutive 429s tolerated for one page. `None` retries forever.
    pub max_throttle_retries: Option<u32>,
}

impl RatePolicy {
    /// Pacing chosen from credential presence alone; the key is never validated here.
    pub fn for_credential(has_api_key: bool) -> Self {
        Self {
            request_delay: if has_api_key {
                KEYED_REQUEST_DELAY
            } else {
                ANONYMOUS_REQUEST_DELAY
            },
            throttle_cooldown: THROTTLE_COOLDOWN,
            max_throttle_retries: None,
        }
    }

    pub fn with_max_throttle_retries(mut self, max: u32) -> Self {
        self.max_throttle_retries = Some(max);
        self
    }

    /// Whether another retry is allowed after `throttled` consecutive 429s.
    pub fn allows_retry(&self, throttled: u32) -> bool {
        self.max_throttle_retries.is_none_or(|max| throttled <= max)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested sleeps and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_policy_is_faster() {
        let keyed = RatePolicy::for_credential(true);
        assert_eq!(keyed.request_delay, Duration::from_millis(600));
        assert_eq!(keyed.throttle_cooldown, Duration::from_secs(60));
        assert!(keyed.max_throttle_retries.is_none());

        let anonymous = RatePolicy::for_credential(false);
        assert_eq!(anonymous.request_delay, Duration::from_secs(6));
    }

    #[test]
    fn test_unbounded_policy_always_retries() {
        let policy = RatePolicy::for_credential(false);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(u32::MAX));
    }

    #[test]
    fn test_capped_policy() {
        let policy = RatePolicy::for_credential(true).with_max_throttle_retries(2);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }
}
