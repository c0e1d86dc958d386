//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// Attempt `n` (1-based) waits `base * 2^(n-1)` capped at `max`, plus up to 10%
/// jitter. The result is clamped to `max`, so delays never decrease as the
/// attempt number grows.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay.saturating_add(jitter).min(max_ms))
}

/// Stateful failure backoff for loops that retry forever.
///
/// Each `fail()` returns the next, longer delay; `success()` resets to the base.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
}

impl SchedulePolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        calculate_backoff(self.failures, self.base_ms, self.max_ms)
    }

    pub fn success(&mut self) {
        self.failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert_eq!(max.as_millis(), 1000);
    }

    #[test]
    fn test_backoff_never_decreases() {
        for _ in 0..50 {
            let mut previous = Duration::ZERO;
            for attempt in 1..12 {
                let delay = calculate_backoff(attempt, 100, 1500);
                assert!(delay >= previous, "attempt {} went from {:?} to {:?}", attempt, previous, delay);
                assert!(delay.as_millis() <= 1500);
                previous = delay;
            }
        }
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        assert_eq!(calculate_backoff(u32::MAX, 100, 5000).as_millis(), 5000);
    }

    #[test]
    fn test_schedule_policy_resets_on_success() {
        let mut policy = SchedulePolicy::new(Duration::from_secs(1), Duration::from_secs(120));
        assert!(policy.fail() >= Duration::from_secs(1));
        assert!(policy.fail() >= Duration::from_secs(2));
        assert_eq!(policy.consecutive_failures(), 2);

        policy.success();
        assert_eq!(policy.consecutive_failures(), 0);
        let delay = policy.fail();
        assert!(delay >= Duration::from_secs(1) && delay < Duration::from_secs(2));
    }
}
