//! Retry state machine with a cumulative wait budget
//!
//! One `RetryBudget` lives for exactly one logical request. Each attempt's
//! outcome is fed to [`RetryBudget::on_outcome`], which answers with the next
//! state. The only state carried between attempts is the elapsed backoff and
//! the 429 doubling counter; neither survives the call.

use std::time::Duration;

/// Backoff policy shared by every call a client makes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total sleep allowed across all retries of one call
    pub wait_budget: Duration,
    /// First 429 backoff when the server gives no `Retry-After`
    pub initial_rate_limit_backoff: Duration,
    /// Fixed sleep after a 5xx
    pub server_error_backoff: Duration,
    /// Fixed sleep after a transport failure
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_secs(60),
            initial_rate_limit_backoff: Duration::from_secs(1),
            server_error_backoff: Duration::from_secs(5),
            transport_backoff: Duration::from_secs(2),
        }
    }
}

/// What a single HTTP attempt produced, before any decoding
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Ok,
    RateLimited { retry_after: Option<Duration> },
    ServerError { status: u16 },
    Transport,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    BackingOff(Duration),
    BudgetExhausted,
    Succeeded,
    PermanentFailure,
}

#[derive(Debug)]
pub struct RetryBudget {
    policy: RetryPolicy,
    elapsed: Duration,
    rate_limit_backoff: Duration,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(policy: RetryPolicy) -> Self {
        let rate_limit_backoff = policy.initial_rate_limit_backoff;
        Self {
            policy,
            elapsed: Duration::ZERO,
            rate_limit_backoff,
            attempts: 0,
        }
    }

    /// Feed one attempt's outcome and get the state to move into.
    ///
    /// `BackingOff(d)` is only returned when the charge for this backoff still
    /// fits in the budget; the charge is accounted immediately.
    ///
    /// A 429 sleeps for the server's hint when there is one, but is charged
    /// at least the current doubling step, so short or zero hints still
    /// drain the budget.
    pub fn on_outcome(&mut self, outcome: &AttemptOutcome) -> RetryState {
        self.attempts = self.attempts.saturating_add(1);

        let (delay, charge) = match outcome {
            AttemptOutcome::Ok => return RetryState::Succeeded,
            AttemptOutcome::Rejected => return RetryState::PermanentFailure,
            AttemptOutcome::RateLimited { retry_after } => {
                let step = self.rate_limit_backoff;
                // Doubles on every 429, whether or not the hint was used
                self.rate_limit_backoff = step.saturating_mul(2);
                match retry_after {
                    Some(hint) => (*hint, (*hint).max(step)),
                    None => (step, step),
                }
            }
            AttemptOutcome::ServerError { .. } => {
                (self.policy.server_error_backoff, self.policy.server_error_backoff)
            }
            AttemptOutcome::Transport => (self.policy.transport_backoff, self.policy.transport_backoff),
        };

        match self.elapsed.checked_add(charge) {
            Some(total) if total <= self.policy.wait_budget => {
                self.elapsed = total;
                RetryState::BackingOff(delay)
            }
            _ => RetryState::BudgetExhausted,
        }
    }

    /// Backoff charged against the budget so far; never less than the time slept
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_terminal(budget: &mut RetryBudget, outcome: AttemptOutcome) -> (RetryState, Vec<Duration>) {
        let mut sleeps = Vec::new();
        loop {
            match budget.on_outcome(&outcome) {
                RetryState::BackingOff(d) => sleeps.push(d),
                state => return (state, sleeps),
            }
        }
    }

    #[test]
    fn test_rate_limit_doubles_until_budget() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        let (state, sleeps) =
            run_until_terminal(&mut budget, AttemptOutcome::RateLimited { retry_after: None });

        assert_eq!(state, RetryState::BudgetExhausted);
        let secs: Vec<u64> = sleeps.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16]);
        assert_eq!(budget.elapsed(), Duration::from_secs(31));
        assert!(budget.elapsed() <= Duration::from_secs(60));
        // Five backoffs plus the attempt that would have overrun the budget
        assert_eq!(budget.attempts(), 6);
    }

    #[test]
    fn test_retry_after_hint_does_not_stop_doubling() {
        let mut budget = RetryBudget::new(RetryPolicy::default());

        let hinted = AttemptOutcome::RateLimited { retry_after: Some(Duration::from_secs(3)) };
        assert_eq!(budget.on_outcome(&hinted), RetryState::BackingOff(Duration::from_secs(3)));
        assert_eq!(budget.on_outcome(&hinted), RetryState::BackingOff(Duration::from_secs(3)));

        // Counter kept doubling underneath the hints: 1 -> 2 -> 4
        let bare = AttemptOutcome::RateLimited { retry_after: None };
        assert_eq!(budget.on_outcome(&bare), RetryState::BackingOff(Duration::from_secs(4)));
        assert_eq!(budget.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_server_errors_share_the_budget() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        let (state, sleeps) =
            run_until_terminal(&mut budget, AttemptOutcome::ServerError { status: 502 });

        assert_eq!(state, RetryState::BudgetExhausted);
        assert_eq!(sleeps.len(), 12);
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(5)));
        assert_eq!(budget.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn test_transport_failures_sleep_two_seconds() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        assert_eq!(
            budget.on_outcome(&AttemptOutcome::Transport),
            RetryState::BackingOff(Duration::from_secs(2))
        );
        assert_eq!(budget.on_outcome(&AttemptOutcome::Ok), RetryState::Succeeded);
        assert_eq!(budget.attempts(), 2);
    }

    #[test]
    fn test_rejected_fails_without_sleeping() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        assert_eq!(budget.on_outcome(&AttemptOutcome::Rejected), RetryState::PermanentFailure);
        assert_eq!(budget.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_oversized_hint_exhausts_immediately() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        let outcome = AttemptOutcome::RateLimited { retry_after: Some(Duration::from_secs(120)) };
        assert_eq!(budget.on_outcome(&outcome), RetryState::BudgetExhausted);
        assert_eq!(budget.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_hint_still_drains_budget() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        let (state, sleeps) = run_until_terminal(
            &mut budget,
            AttemptOutcome::RateLimited { retry_after: Some(Duration::ZERO) },
        );

        assert_eq!(state, RetryState::BudgetExhausted);
        assert_eq!(sleeps, vec![Duration::ZERO; 5]);
        assert_eq!(budget.elapsed(), Duration::from_secs(31));
        assert_eq!(budget.attempts(), 6);
    }

    #[test]
    fn test_huge_hint_after_a_sleep_exhausts() {
        let mut budget = RetryBudget::new(RetryPolicy::default());
        assert_eq!(
            budget.on_outcome(&AttemptOutcome::Transport),
            RetryState::BackingOff(Duration::from_secs(2))
        );

        let outcome = AttemptOutcome::RateLimited { retry_after: Some(Duration::from_secs(u64::MAX)) };
        assert_eq!(budget.on_outcome(&outcome), RetryState::BudgetExhausted);
        assert_eq!(budget.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_doubling_counter_saturates() {
        let policy = RetryPolicy {
            wait_budget: Duration::MAX,
            initial_rate_limit_backoff: Duration::MAX / 2,
            ..RetryPolicy::default()
        };
        let mut budget = RetryBudget::new(policy);
        let bare = AttemptOutcome::RateLimited { retry_after: None };

        assert_eq!(budget.on_outcome(&bare), RetryState::BackingOff(Duration::MAX / 2));
        // Next step no longer fits in a Duration alongside what was already charged
        assert_eq!(budget.on_outcome(&bare), RetryState::BudgetExhausted);
        assert_eq!(budget.on_outcome(&bare), RetryState::BudgetExhausted);
    }
}
