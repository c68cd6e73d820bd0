//! Bounded-retry probe execution.

use std::time::Duration;

use super::HttpCheck;
use crate::db::Outcome;

/// Status codes that count as a reachable response.
pub const REACHABLE_STATUSES: [u16; 5] = [200, 202, 301, 302, 307];

/// Whether a response status counts as reachable.
pub fn is_reachable(status: u16) -> bool {
    REACHABLE_STATUSES.contains(&status)
}

/// Attempt budget and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            delay: Duration::from_secs(5),
        }
    }
}

/// Run one probe against `url`.
///
/// Stops at the first reachable response. Network errors count as an
/// unreachable attempt and never end the loop early. The delay is applied
/// between attempts only, never after the last one.
pub async fn probe<C: HttpCheck>(check: &C, url: &str, policy: RetryPolicy) -> Outcome {
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match check.get_status(url).await {
            Ok(status) if is_reachable(status) => {
                tracing::debug!("Probe: {} reachable ({}) on attempt {}", url, status, attempt);
                return Outcome::Success;
            }
            Ok(status) => {
                tracing::debug!("Probe: {} returned {} on attempt {}", url, status, attempt);
            }
            Err(e) => {
                tracing::warn!("Probe: Error checking {} (attempt {}): {}", url, attempt, e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Outcome::Failure
}
