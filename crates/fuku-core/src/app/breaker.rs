//! Circuit breaker: disable an account after repeated soft suppressions.
//!
//! A "soft failure" is an action the platform accepted but hid, detected by
//! an out-of-band follow-up check. Ordinary transport failures never feed
//! the breaker. Crossing the threshold is a one-time, irreversible
//! transition for the rest of the run.

use tracing::warn;

use crate::domain::Account;

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreaker {
    default_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(default_threshold: u32) -> Self {
        // A threshold of 0 would disable accounts that never failed.
        Self {
            default_threshold: default_threshold.max(1),
        }
    }

    /// Per-account override wins over the global default.
    pub fn threshold_for(&self, account: &Account) -> u32 {
        account
            .config
            .max_soft_failures
            .unwrap_or(self.default_threshold)
            .max(1)
    }

    pub fn should_disable(&self, account: &Account) -> bool {
        account.soft_failures() >= self.threshold_for(account)
    }

    /// Count one soft failure and trip the latch on crossing the threshold.
    /// Returns true exactly once, on the transition.
    pub fn record_soft_failure(&self, account: &mut Account) -> bool {
        let total = account.record_soft_failure();
        if account.is_enabled() && self.should_disable(account) {
            account.disable();
            warn!(
                remark = account.remark.as_str(),
                soft_failures = total,
                "account disabled after repeated soft suppressions"
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountConfig;
    use rstest::rstest;

    fn account() -> Account {
        Account::from_config(AccountConfig::for_tests("alice"))
    }

    #[test]
    fn below_threshold_stays_enabled() {
        let breaker = CircuitBreaker::new(3);
        let mut acc = account();
        assert!(!breaker.record_soft_failure(&mut acc));
        assert!(!breaker.record_soft_failure(&mut acc));
        assert!(acc.is_enabled());
        assert!(!breaker.should_disable(&acc));
    }

    #[test]
    fn trips_exactly_on_the_threshold() {
        let breaker = CircuitBreaker::new(3);
        let mut acc = account();
        breaker.record_soft_failure(&mut acc);
        breaker.record_soft_failure(&mut acc);
        assert!(breaker.record_soft_failure(&mut acc), "third failure trips");
        assert!(!acc.is_enabled());
    }

    #[test]
    fn latch_holds_and_trip_reports_only_once() {
        let breaker = CircuitBreaker::new(2);
        let mut acc = account();
        breaker.record_soft_failure(&mut acc);
        assert!(breaker.record_soft_failure(&mut acc));
        // Further failures keep counting but never "trip" again.
        assert!(!breaker.record_soft_failure(&mut acc));
        assert!(!acc.is_enabled());
        assert_eq!(acc.soft_failures(), 3);
    }

    #[rstest]
    #[case::override_lower(Some(1), 5, 1)]
    #[case::override_higher(Some(9), 3, 9)]
    #[case::no_override(None, 4, 4)]
    fn per_account_override_wins(
        #[case] override_value: Option<u32>,
        #[case] global: u32,
        #[case] expected: u32,
    ) {
        let breaker = CircuitBreaker::new(global);
        let mut acc = account();
        acc.config.max_soft_failures = override_value;
        assert_eq!(breaker.threshold_for(&acc), expected);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let breaker = CircuitBreaker::new(0);
        let acc = account();
        assert!(!breaker.should_disable(&acc));
    }
}
