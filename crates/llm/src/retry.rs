//! Rate-limit retry policy.
//!
//! The policy is a small state machine:
//!
//! ```text
//! Attempting(1) --rate limited--> BackoffWait(1, d1) --elapsed--> Attempting(2) ...
//!      |                                                              |
//!      +--ok--> Succeeded          +--other failure--> Aborted        +--last rate limit--> Exhausted
//! ```
//!
//! Transitions are pure so the schedule can be checked without a network
//! or a clock. Waiting goes through a [`Sleeper`], which tests replace.

use askstore_core::config::GenerationSettings;
use std::time::Duration;

/// State of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt number `attempt` (1-based)
    Attempting { attempt: u32 },

    /// Attempt `attempt` was rate limited; wait `delay` before the next one
    BackoffWait { attempt: u32, delay: Duration },

    /// Attempt `attempt` succeeded
    Succeeded { attempt: u32 },

    /// Attempt `attempt` failed with a non-retryable error
    Aborted { attempt: u32 },

    /// Every attempt was rate limited
    Exhausted { attempts: u32 },
}

/// What happened since the last transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    Succeeded,
    RateLimited,
    Failed,
    WaitElapsed,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Factor applied to the delay after each retry
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl From<&GenerationSettings> for RetryPolicy {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_backoff_ms),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Initial state of every call.
    pub fn start(&self) -> RetryState {
        RetryState::Attempting { attempt: 1 }
    }

    /// Delay to wait after attempt `attempt` was rate limited.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_delay.saturating_mul(factor)
    }

    /// Advance the state machine.
    ///
    /// Terminal states and events that do not apply to the current state
    /// leave the state unchanged.
    pub fn next(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (RetryState::Attempting { attempt }, RetryEvent::Succeeded) => {
                RetryState::Succeeded { attempt }
            }
            (RetryState::Attempting { attempt }, RetryEvent::Failed) => {
                RetryState::Aborted { attempt }
            }
            (RetryState::Attempting { attempt }, RetryEvent::RateLimited) => {
                if attempt >= self.max_attempts {
                    RetryState::Exhausted { attempts: attempt }
                } else {
                    RetryState::BackoffWait {
                        attempt,
                        delay: self.delay_after(attempt),
                    }
                }
            }
            (RetryState::BackoffWait { attempt, .. }, RetryEvent::WaitElapsed) => {
                RetryState::Attempting {
                    attempt: attempt + 1,
                }
            }
            (state, _) => state,
        }
    }
}

/// Something that can wait.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_rate_limited_until_exhausted() {
        let policy = RetryPolicy::default();
        let mut state = policy.start();
        let mut delays = Vec::new();

        loop {
            state = match state {
                RetryState::Attempting { .. } => policy.next(state, RetryEvent::RateLimited),
                RetryState::BackoffWait { delay, .. } => {
                    delays.push(delay);
                    policy.next(state, RetryEvent::WaitElapsed)
                }
                _ => break,
            };
        }

        assert_eq!(state, RetryState::Exhausted { attempts: 3 });
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn test_success_after_backoff() {
        let policy = RetryPolicy::default();
        let state = policy.next(policy.start(), RetryEvent::RateLimited);
        assert_eq!(
            state,
            RetryState::BackoffWait {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );

        let state = policy.next(state, RetryEvent::WaitElapsed);
        assert_eq!(state, RetryState::Attempting { attempt: 2 });

        let state = policy.next(state, RetryEvent::Succeeded);
        assert_eq!(state, RetryState::Succeeded { attempt: 2 });
    }

    #[test]
    fn test_other_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let state = policy.next(policy.start(), RetryEvent::Failed);
        assert_eq!(state, RetryState::Aborted { attempt: 1 });
    }

    #[test]
    fn test_terminal_states_ignore_events() {
        let policy = RetryPolicy::default();
        let done = RetryState::Succeeded { attempt: 1 };
        assert_eq!(policy.next(done, RetryEvent::RateLimited), done);

        let waiting = RetryState::BackoffWait {
            attempt: 1,
            delay: Duration::from_secs(1),
        };
        assert_eq!(policy.next(waiting, RetryEvent::Succeeded), waiting);
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let state = policy.next(policy.start(), RetryEvent::RateLimited);
        assert_eq!(state, RetryState::Exhausted { attempts: 1 });
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = GenerationSettings {
            max_attempts: 5,
            initial_backoff_ms: 250,
            ..GenerationSettings::default()
        };
        let policy = RetryPolicy::from(&settings);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(3), Duration::from_millis(1000));
    }
}
