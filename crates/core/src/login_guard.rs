//! Brute-force login protection: per-source failure counting with
//! time-windowed blocking.
//!
//! The policy is pure. The engine loads the current record under a row lock,
//! asks the policy for the next state, and writes it back.

use chrono::Duration;

use crate::types::Timestamp;

/// Default number of consecutive failures before a source is blocked.
pub const DEFAULT_MAX_FAILED_ATTEMPTS: i32 = 5;

/// Default block duration in minutes.
pub const DEFAULT_BLOCK_DURATION_MINS: i64 = 15;

/// Default window in minutes after which an idle counter starts over.
pub const DEFAULT_ATTEMPT_WINDOW_MINS: i64 = 60;

/// Lockout thresholds, injected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub threshold: i32,
    pub block_duration: Duration,
    pub attempt_window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MAX_FAILED_ATTEMPTS,
            block_duration: Duration::minutes(DEFAULT_BLOCK_DURATION_MINS),
            attempt_window: Duration::minutes(DEFAULT_ATTEMPT_WINDOW_MINS),
        }
    }
}

/// Failure counter state for one source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    pub attempt_count: i32,
    pub last_attempt_at: Timestamp,
    pub blocked: bool,
    pub blocked_until: Option<Timestamp>,
}

/// A source is blocked while its block flag is set and the block has not
/// run out yet.
pub fn is_blocked(state: &AttemptState, now: Timestamp) -> bool {
    state.blocked && state.blocked_until.is_some_and(|until| until > now)
}

impl LockoutPolicy {
    /// Compute the state after one more failed attempt.
    ///
    /// The counter starts over when the previous block has run out or when
    /// the last failure is older than the attempt window. Reaching the
    /// threshold sets the block.
    pub fn next_after_failure(&self, prev: Option<&AttemptState>, now: Timestamp) -> AttemptState {
        let carried = match prev {
            Some(p) if p.blocked && !is_blocked(p, now) => 0,
            Some(p) if now - p.last_attempt_at > self.attempt_window => 0,
            Some(p) => p.attempt_count,
            None => 0,
        };
        let attempt_count = carried.saturating_add(1);

        if attempt_count >= self.threshold {
            // An active block is not extended by further attempts.
            let blocked_until = match prev {
                Some(p) if is_blocked(p, now) => p.blocked_until,
                _ => Some(now + self.block_duration),
            };
            AttemptState {
                attempt_count,
                last_attempt_at: now,
                blocked: true,
                blocked_until,
            }
        } else {
            AttemptState {
                attempt_count,
                last_attempt_at: now,
                blocked: false,
                blocked_until: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn fail_n(policy: &LockoutPolicy, n: i32, now: Timestamp) -> AttemptState {
        let mut state: Option<AttemptState> = None;
        for _ in 0..n {
            state = Some(policy.next_after_failure(state.as_ref(), now));
        }
        state.unwrap()
    }

    #[test]
    fn first_failure_starts_counter() {
        let state = LockoutPolicy::default().next_after_failure(None, t0());
        assert_eq!(state.attempt_count, 1);
        assert!(!state.blocked);
        assert!(!is_blocked(&state, t0()));
    }

    #[test]
    fn blocks_at_threshold() {
        let policy = LockoutPolicy::default();
        let below = fail_n(&policy, policy.threshold - 1, t0());
        assert!(!is_blocked(&below, t0()));

        let at = policy.next_after_failure(Some(&below), t0());
        assert!(is_blocked(&at, t0()));
        assert_eq!(at.blocked_until, Some(t0() + policy.block_duration));
    }

    #[test]
    fn block_lapses_after_duration() {
        let policy = LockoutPolicy::default();
        let state = fail_n(&policy, policy.threshold, t0());
        assert!(is_blocked(&state, t0() + Duration::minutes(14)));
        assert!(!is_blocked(&state, t0() + policy.block_duration));
    }

    #[test]
    fn counter_restarts_after_block_lapses() {
        let policy = LockoutPolicy::default();
        let state = fail_n(&policy, policy.threshold, t0());
        let later = t0() + policy.block_duration + Duration::seconds(1);
        let next = policy.next_after_failure(Some(&state), later);
        assert_eq!(next.attempt_count, 1);
        assert!(!next.blocked);
    }

    #[test]
    fn counter_restarts_outside_window() {
        let policy = LockoutPolicy::default();
        let state = fail_n(&policy, 3, t0());
        let later = t0() + policy.attempt_window + Duration::minutes(1);
        assert_eq!(policy.next_after_failure(Some(&state), later).attempt_count, 1);
    }

    #[test]
    fn attempts_while_blocked_keep_original_deadline() {
        let policy = LockoutPolicy::default();
        let state = fail_n(&policy, policy.threshold, t0());
        let later = t0() + Duration::minutes(5);
        let next = policy.next_after_failure(Some(&state), later);
        assert_eq!(next.blocked_until, state.blocked_until);
        assert_eq!(next.attempt_count, policy.threshold + 1);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let policy = LockoutPolicy {
            threshold: 2,
            block_duration: Duration::minutes(1),
            attempt_window: Duration::minutes(10),
        };
        assert!(is_blocked(&fail_n(&policy, 2, t0()), t0()));
    }
}
