//! Meta-server address with decaying validity.
//!
//! # Responsibilities
//! - Represent one candidate meta server
//! - Track when it was last validated by a probe
//! - Track consecutive remote failures reported by fetchers and pollers

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Selected without a successful probe (best-effort fallback).
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A single meta-server candidate.
#[derive(Debug)]
pub struct MetaServerAddress {
    pub url: String,
    last_validated_at: Mutex<Option<Instant>>,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
}

impl MetaServerAddress {
    /// An address that answered a probe just now.
    pub fn validated(url: impl Into<String>) -> Self {
        let address = Self::unverified(url);
        address.mark_validated();
        address
    }

    /// An address selected without a successful probe. It is still cached for
    /// the TTL so an outage does not turn every call into a probe sweep.
    pub fn unverified(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_validated_at: Mutex::new(Some(Instant::now())),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn last_validated_at(&self) -> Option<Instant> {
        *self.last_validated_at.lock()
    }

    /// True while the address may be reused without re-probing.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        if self.state() == HealthState::Unhealthy {
            return false;
        }
        self.last_validated_at()
            .map(|at| at.elapsed() < ttl)
            .unwrap_or(false)
    }

    pub fn mark_validated(&self) {
        *self.last_validated_at.lock() = Some(Instant::now());
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
    }

    /// Report a successful remote call through this address.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// Report a failed remote call. Returns true when this call crossed the threshold.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        if self.state() == HealthState::Unhealthy {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold.max(1) {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_address_is_valid_within_ttl() {
        let address = MetaServerAddress::validated("http://meta:8080");
        assert_eq!(address.state(), HealthState::Healthy);
        assert!(address.is_valid(Duration::from_secs(60)));
        assert!(!address.is_valid(Duration::ZERO));
    }

    #[test]
    fn test_failures_invalidate_after_threshold() {
        let address = MetaServerAddress::validated("http://meta:8080");
        assert!(!address.mark_failure(3));
        assert!(!address.mark_failure(3));
        assert!(address.mark_failure(3));
        assert!(!address.is_valid(Duration::from_secs(60)));
        // Already unhealthy: no second transition.
        assert!(!address.mark_failure(3));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let address = MetaServerAddress::unverified("http://meta:8080");
        address.mark_failure(2);
        address.mark_success();
        assert!(!address.mark_failure(2));
        assert_eq!(address.state(), HealthState::Unknown);
    }
}
