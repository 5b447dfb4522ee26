//! Progressive lockout accounting as a pure function.
//!
//! Factored out of the login orchestrator so the threshold/duration rules
//! can be tested without storage. The repository recomputes the next state
//! with this policy inside its row-locked transaction, against the freshly
//! read counters.

use chrono::{DateTime, Duration, Utc};

const DEFAULT_THRESHOLD: i32 = 5;
const DEFAULT_DURATION_SECONDS: i64 = 15 * 60;

/// Result of a password comparison, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    Failure,
}

/// Mutable lockout slice of an account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub fail_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockState {
    /// A lock is active only while its expiry lies in the future. Expired
    /// locks linger in the row until the next attempt clears them.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    threshold: i32,
    duration_seconds: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }
}

impl LockoutPolicy {
    #[must_use]
    pub const fn new(threshold: i32, duration_seconds: i64) -> Self {
        Self {
            threshold,
            duration_seconds,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Compute the state an account moves to after one attempt.
    ///
    /// Success always resets to `(0, None)`. A failure increments the
    /// counter; the lock expiry is set exactly when the counter crosses the
    /// threshold, measured from `now`.
    #[must_use]
    pub fn next_state(
        &self,
        current: LockState,
        now: DateTime<Utc>,
        outcome: AttemptResult,
    ) -> LockState {
        match outcome {
            AttemptResult::Success => LockState {
                fail_count: 0,
                locked_until: None,
            },
            AttemptResult::Failure => {
                let fail_count = current.fail_count.saturating_add(1);
                let locked_until = if fail_count >= self.threshold {
                    Some(now + Duration::seconds(self.duration_seconds))
                } else {
                    // Keep a stale (already expired) expiry untouched; it is
                    // cleared only by a successful login.
                    current.locked_until
                };
                LockState {
                    fail_count,
                    locked_until,
                }
            }
        }
    }
}
