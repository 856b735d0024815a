//! Retry policy for one logical request, modeled as an explicit state
//! machine with a pure transition function so it can be tested without a
//! network. Rate-limit waits never count against the transient attempt
//! counter; transient failures escalate linearly and periodically force a
//! client rebuild with a long pause.

use std::time::Duration;

/// Backoff durations. Defaults match production policy; tests inject
/// millisecond-scale values.
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    /// Base delay when an ostensibly successful response carried an empty body.
    pub empty_body_delay: Duration,
    /// Base delay for 5xx and transport failures.
    pub transient_delay: Duration,
    /// Consecutive transient attempts before the HTTP client is rebuilt.
    pub attempts_before_rebuild: u32,
    /// Pause after a client rebuild.
    pub rebuild_pause: Duration,
    /// Safety margin added on top of the advertised quota reset.
    pub rate_limit_buffer: Duration,
    /// Flat wait when the rate-limit headers cannot be parsed.
    pub rate_limit_fallback: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            empty_body_delay: Duration::from_secs(2),
            transient_delay: Duration::from_secs(5),
            attempts_before_rebuild: 3,
            rebuild_pause: Duration::from_secs(10 * 60),
            rate_limit_buffer: Duration::from_secs(10),
            rate_limit_fallback: Duration::from_secs(5 * 60),
        }
    }
}

/// Non-terminal classification of one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setback {
    RateLimited { reset_at: Option<i64> },
    Transient { empty_body: bool },
}

/// What the caller must do before the next attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Wait(Duration),
    RebuildClientAndWait(Duration),
}

#[derive(Debug, Default)]
pub struct RetryState {
    consecutive_attempts: u32,
    total_retries: u32,
}

impl RetryState {
    pub fn total_retries(&self) -> u32 {
        self.total_retries
    }

    pub fn next(&mut self, setback: Setback, backoff: &Backoff, now: i64) -> Step {
        match setback {
            Setback::RateLimited { reset_at } => {
                let wait = match reset_at {
                    Some(reset) => {
                        let until_reset = (reset - now).max(0) as u64;
                        Duration::from_secs(until_reset) + backoff.rate_limit_buffer
                    }
                    None => backoff.rate_limit_fallback,
                };
                Step::Wait(wait)
            }
            Setback::Transient { empty_body } => {
                self.total_retries += 1;
                self.consecutive_attempts += 1;
                if self.consecutive_attempts >= backoff.attempts_before_rebuild {
                    self.consecutive_attempts = 0;
                    return Step::RebuildClientAndWait(backoff.rebuild_pause);
                }
                let base = if empty_body {
                    backoff.empty_body_delay
                } else {
                    backoff.transient_delay
                };
                Step::Wait(base * self.consecutive_attempts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn transient_backoff_escalates_then_rebuilds() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let transient = Setback::Transient { empty_body: false };
        assert_eq!(state.next(transient, &backoff, NOW), Step::Wait(Duration::from_secs(5)));
        assert_eq!(state.next(transient, &backoff, NOW), Step::Wait(Duration::from_secs(10)));
        assert_eq!(
            state.next(transient, &backoff, NOW),
            Step::RebuildClientAndWait(Duration::from_secs(600))
        );
        // Counter resets after the rebuild.
        assert_eq!(state.next(transient, &backoff, NOW), Step::Wait(Duration::from_secs(5)));
        assert_eq!(state.total_retries(), 4);
    }

    #[test]
    fn empty_body_uses_shorter_base_delay() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let step = state.next(Setback::Transient { empty_body: true }, &backoff, NOW);
        assert_eq!(step, Step::Wait(Duration::from_secs(2)));
    }

    #[test]
    fn rate_limit_waits_until_reset_plus_buffer() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let step = state.next(Setback::RateLimited { reset_at: Some(NOW + 60) }, &backoff, NOW);
        assert_eq!(step, Step::Wait(Duration::from_secs(70)));
        assert_eq!(state.total_retries(), 0, "rate limiting is not a retry");
    }

    #[test]
    fn past_reset_still_waits_the_buffer() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let step = state.next(Setback::RateLimited { reset_at: Some(NOW - 100) }, &backoff, NOW);
        assert_eq!(step, Step::Wait(Duration::from_secs(10)));
    }

    #[test]
    fn unparsable_reset_waits_flat_fallback() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let step = state.next(Setback::RateLimited { reset_at: None }, &backoff, NOW);
        assert_eq!(step, Step::Wait(Duration::from_secs(300)));
    }

    #[test]
    fn rate_limit_does_not_advance_the_rebuild_counter() {
        let backoff = Backoff::default();
        let mut state = RetryState::default();
        let transient = Setback::Transient { empty_body: false };
        state.next(transient, &backoff, NOW);
        state.next(Setback::RateLimited { reset_at: None }, &backoff, NOW);
        assert_eq!(state.next(transient, &backoff, NOW), Step::Wait(Duration::from_secs(10)));
    }
}
