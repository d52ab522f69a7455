//! Retry scheduling as an explicit state machine.
//!
//! ```text
//! Attempting(n) --completed--------------------------> Done(Completed)
//! Attempting(n) --non-retryable error----------------> Done(Failed)
//! Attempting(n) --retryable error, n == retries------> Done(Failed: exhausted)
//! Attempting(n) --retryable error, n <  retries------> Backoff(n+1, base*(n+1))
//! Backoff(m, d) --after sleeping d-------------------> Attempting(m)
//! ```
//!
//! Transitions are pure. The driver (see [`crate::Dispatcher`]) performs the
//! attempt and the sleep, so the schedule can be exercised with a virtual
//! clock. Back-off is linear in the attempt index and carries no jitter.

use std::time::Duration;

use crate::errors::{DispatchError, TransportError};
use crate::response::RawResponse;

/// What one attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The server answered, whatever the status code.
    Completed(RawResponse),
    /// The exchange did not complete.
    Failed(TransportError),
}

/// Where a call ends up once no more attempts will be made.
#[derive(Debug)]
pub enum Terminal {
    Completed(RawResponse),
    Failed(DispatchError),
}

#[derive(Debug)]
pub enum RetryState {
    /// About to issue attempt `attempt` (zero-based).
    Attempting { attempt: u32 },
    /// Waiting `delay` before issuing `next_attempt`.
    Backoff { next_attempt: u32, delay: Duration },
    Done(Terminal),
}

/// Attempt budget and back-off step for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    retries: u32,
    base_delay: Duration,
}

impl RetrySchedule {
    /// `retries` counts attempts *after* the first.
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts allowed (`retries + 1`).
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }

    pub fn start(&self) -> RetryState {
        RetryState::Attempting { attempt: 0 }
    }

    /// Computes the state that follows `attempt` having produced `outcome`.
    pub fn advance(&self, attempt: u32, outcome: AttemptOutcome) -> RetryState {
        let error = match outcome {
            AttemptOutcome::Completed(response) => {
                return RetryState::Done(Terminal::Completed(response));
            }
            AttemptOutcome::Failed(error) => error,
        };

        if !error.retry_policy().is_retryable() {
            return RetryState::Done(Terminal::Failed(DispatchError::Transport(error)));
        }

        if attempt >= self.retries {
            return RetryState::Done(Terminal::Failed(DispatchError::AttemptsExhausted {
                attempts: self.max_attempts(),
                source: error,
            }));
        }

        let next_attempt = attempt + 1;
        let delay = self.delay_for(attempt);
        if delay.is_zero() {
            RetryState::Attempting {
                attempt: next_attempt,
            }
        } else {
            RetryState::Backoff {
                next_attempt,
                delay,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> AttemptOutcome {
        AttemptOutcome::Failed(TransportError::Connect("refused".into()))
    }

    fn ok() -> AttemptOutcome {
        AttemptOutcome::Completed(RawResponse {
            status: 500,
            status_text: "Internal Server Error".into(),
            content_type: None,
            body: Vec::new(),
        })
    }

    #[test]
    fn delays_grow_linearly() {
        let schedule = RetrySchedule::new(3, Duration::from_millis(1000));
        assert_eq!(schedule.delay_for(0), Duration::from_millis(1000));
        assert_eq!(schedule.delay_for(1), Duration::from_millis(2000));
        assert_eq!(schedule.delay_for(2), Duration::from_millis(3000));
    }

    #[test]
    fn completed_exchange_ends_immediately_regardless_of_status() {
        let schedule = RetrySchedule::new(3, Duration::from_millis(10));
        assert!(matches!(
            schedule.advance(0, ok()),
            RetryState::Done(Terminal::Completed(r)) if r.status == 500
        ));
    }

    #[test]
    fn retryable_failure_backs_off() {
        let schedule = RetrySchedule::new(2, Duration::from_millis(50));
        match schedule.advance(1, refused()) {
            RetryState::Backoff {
                next_attempt,
                delay,
            } => {
                assert_eq!(next_attempt, 2);
                assert_eq!(delay, Duration::from_millis(100));
            }
            other => panic!("expected backoff, got {other:?}"),
        }
    }

    #[test]
    fn zero_delay_skips_backoff() {
        let schedule = RetrySchedule::new(1, Duration::ZERO);
        assert!(matches!(
            schedule.advance(0, refused()),
            RetryState::Attempting { attempt: 1 }
        ));
    }

    #[test]
    fn last_attempt_failure_exhausts() {
        let schedule = RetrySchedule::new(0, Duration::from_millis(50));
        match schedule.advance(0, refused()) {
            RetryState::Done(Terminal::Failed(DispatchError::AttemptsExhausted {
                attempts, ..
            })) => assert_eq!(attempts, 1),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn body_read_failure_is_not_retried() {
        let schedule = RetrySchedule::new(5, Duration::from_millis(50));
        assert!(matches!(
            schedule.advance(0, AttemptOutcome::Failed(TransportError::Body("eof".into()))),
            RetryState::Done(Terminal::Failed(DispatchError::Transport(_)))
        ));
    }

    #[test]
    fn max_attempts_saturates() {
        let schedule = RetrySchedule::new(u32::MAX, Duration::ZERO);
        assert_eq!(schedule.max_attempts(), u32::MAX);
    }
}
