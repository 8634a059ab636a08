//! Core sliding-window admission limiter.

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::key::ClientKey;
use super::log::RequestLog;

/// The outcome of an admission check.
///
/// `admit` always returns one of these; over-limit clients are a decision,
/// not an error. All timestamps are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed to business handlers.
    Admitted {
        /// Configured requests per window
        limit: u32,
        /// Budget left in the current window after this admission
        remaining: u32,
        /// Absolute time at which a full window's budget is available again
        reset_at: u64,
    },
    /// The client exceeded its window budget; the request must not proceed.
    Rejected {
        /// Configured requests per window
        limit: u32,
        /// Seconds the client should wait before retrying
        retry_after: u64,
        /// Absolute time at which a full window's budget is available again
        reset_at: u64,
    },
}

impl Decision {
    /// Whether the request was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// The configured requests-per-window limit.
    pub fn limit(&self) -> u32 {
        match *self {
            Decision::Admitted { limit, .. } | Decision::Rejected { limit, .. } => limit,
        }
    }

    /// Remaining budget in the current window (zero when rejected).
    pub fn remaining(&self) -> u32 {
        match *self {
            Decision::Admitted { remaining, .. } => remaining,
            Decision::Rejected { .. } => 0,
        }
    }

    /// Absolute unix time at which the window resets.
    pub fn reset_at(&self) -> u64 {
        match *self {
            Decision::Admitted { reset_at, .. } | Decision::Rejected { reset_at, .. } => reset_at,
        }
    }
}

/// State guarded by the limiter's whole-store lock.
struct LimiterState {
    log: RequestLog,
    last_sweep: u64,
}

/// Sliding-window request admission limiter.
///
/// Bounds the rate of requests accepted from any single client identity.
/// Each client's budget is evaluated over a moving window ending at the
/// current time: timestamps older than `now - window_seconds` are purged
/// before every decision (inclusive lower bound, so a timestamp exactly at
/// the cutoff still counts), and a request is admitted only while fewer than
/// `requests_per_window` timestamps remain.
///
/// All mutating access goes through one `Mutex` over the whole store. The
/// purge-check-append sequence runs under a single lock acquisition, so
/// racing requests from the same client cannot admit past the limit. Both
/// `admit` and `sweep` are bounded in-memory operations and never suspend.
pub struct AdmissionLimiter {
    requests_per_window: u32,
    window_seconds: u64,
    cleanup_interval_seconds: u64,
    state: Mutex<LimiterState>,
}

impl AdmissionLimiter {
    /// Create a new limiter.
    ///
    /// All three parameters must be greater than zero; configuration
    /// validation enforces this before construction.
    pub fn new(requests_per_window: u32, window_seconds: u64, cleanup_interval_seconds: u64) -> Self {
        Self {
            requests_per_window,
            window_seconds,
            cleanup_interval_seconds,
            state: Mutex::new(LimiterState {
                log: RequestLog::new(),
                last_sweep: 0,
            }),
        }
    }

    /// Decide whether to admit a request from `key` at time `now`.
    ///
    /// Purges the client's aged-out timestamps, then either records `now`
    /// and admits, or rejects without recording anything. A full sweep of
    /// all clients piggybacks on this call at most once per
    /// `cleanup_interval_seconds`.
    pub fn admit(&self, key: &ClientKey, now: u64) -> Decision {
        let mut state = self.state.lock();

        if now.saturating_sub(state.last_sweep) >= self.cleanup_interval_seconds {
            state.log.sweep(now, self.window_seconds);
            state.last_sweep = now;
        }

        let count = state.log.purge_client(key, now, self.window_seconds);
        let reset_at = now + self.window_seconds;

        if count as u64 >= self.requests_per_window as u64 {
            debug!(
                client = %key,
                count = count,
                limit = self.requests_per_window,
                "Admission rejected"
            );
            return Decision::Rejected {
                limit: self.requests_per_window,
                retry_after: self.window_seconds,
                reset_at,
            };
        }

        state.log.record(key.clone(), now);
        let remaining = self.requests_per_window - (count as u32 + 1);

        trace!(
            client = %key,
            remaining = remaining,
            "Admission granted"
        );

        Decision::Admitted {
            limit: self.requests_per_window,
            remaining,
            reset_at,
        }
    }

    /// Run an unconditional full sweep: purge stale timestamps for every
    /// client and drop clients left with no recent activity.
    pub fn sweep(&self, now: u64) {
        let mut state = self.state.lock();
        state.log.sweep(now, self.window_seconds);
        state.last_sweep = now;
        debug!(tracked_clients = state.log.client_count(), "Sweep completed");
    }

    /// The configured requests-per-window limit.
    pub fn limit(&self) -> u32 {
        self.requests_per_window
    }

    /// The configured window length in seconds.
    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.state.lock().log.client_count()
    }

    /// Number of recorded timestamps for a client, without purging.
    pub fn recorded_count(&self, key: &ClientKey) -> usize {
        self.state.lock().log.recorded_count(key)
    }

    /// Remove all tracked state.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.state.lock().log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ClientKey {
        ClientKey::new(s)
    }

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = AdmissionLimiter::new(3, 60, 300);
        let client = key("1.2.3.4");

        for t in 0..3 {
            assert!(limiter.admit(&client, t).is_admitted());
        }
        assert!(!limiter.admit(&client, 10).is_admitted());
    }

    #[test]
    fn test_rejection_does_not_consume_budget() {
        let limiter = AdmissionLimiter::new(2, 60, 300);
        let client = key("1.2.3.4");

        limiter.admit(&client, 0);
        limiter.admit(&client, 1);
        assert_eq!(limiter.recorded_count(&client), 2);

        // Rejected attempts leave the log untouched
        for t in 2..10 {
            assert!(!limiter.admit(&client, t).is_admitted());
        }
        assert_eq!(limiter.recorded_count(&client), 2);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = AdmissionLimiter::new(2, 60, 300);

        limiter.admit(&key("a"), 0);
        limiter.admit(&key("a"), 1);
        assert!(!limiter.admit(&key("a"), 2).is_admitted());

        // Client B's budget is unaffected by A's exhaustion
        match limiter.admit(&key("b"), 2) {
            Decision::Admitted { remaining, .. } => assert_eq!(remaining, 1),
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[test]
    fn test_recovery_after_window_elapses() {
        let limiter = AdmissionLimiter::new(3, 60, 300);
        let client = key("1.2.3.4");

        assert!(limiter.admit(&client, 0).is_admitted());
        assert!(limiter.admit(&client, 1).is_admitted());
        assert!(limiter.admit(&client, 2).is_admitted());
        assert!(!limiter.admit(&client, 10).is_admitted());

        // At t=61 the t=0 entry has aged out (0 < 61 - 60)
        assert!(limiter.admit(&client, 61).is_admitted());
    }

    #[test]
    fn test_concrete_two_per_ten_scenario() {
        let limiter = AdmissionLimiter::new(2, 10, 300);
        let client = key("1.2.3.4");

        assert_eq!(
            limiter.admit(&client, 0),
            Decision::Admitted {
                limit: 2,
                remaining: 1,
                reset_at: 10
            }
        );
        assert_eq!(
            limiter.admit(&client, 1),
            Decision::Admitted {
                limit: 2,
                remaining: 0,
                reset_at: 11
            }
        );
        assert_eq!(
            limiter.admit(&client, 2),
            Decision::Rejected {
                limit: 2,
                retry_after: 10,
                reset_at: 12
            }
        );

        // At t=11 the t=0 entry has aged out, but t=1 sits exactly on the
        // inclusive window boundary (11 - 10 = 1) and still counts
        assert_eq!(
            limiter.admit(&client, 11),
            Decision::Admitted {
                limit: 2,
                remaining: 0,
                reset_at: 21
            }
        );
        assert!(!limiter.admit(&client, 11).is_admitted());
    }

    #[test]
    fn test_window_bound_invariant() {
        const LIMIT: u32 = 3;
        const WINDOW: u64 = 10;

        let limiter = AdmissionLimiter::new(LIMIT, WINDOW, 1_000);
        let client = key("1.2.3.4");
        let mut admitted = Vec::new();

        for t in 0..=60u64 {
            if limiter.admit(&client, t).is_admitted() {
                admitted.push(t);
            }
        }

        // No window-length interval contains more admissions than the limit
        for start in 0..=60u64 {
            let in_window = admitted
                .iter()
                .filter(|&&t| t >= start && t <= start + WINDOW)
                .count();
            assert!(
                in_window <= LIMIT as usize,
                "window [{}, {}] holds {} admissions",
                start,
                start + WINDOW,
                in_window
            );
        }
    }

    #[test]
    fn test_sweep_reclaims_idle_clients() {
        let limiter = AdmissionLimiter::new(5, 10, 1_000);

        limiter.admit(&key("idle"), 0);
        limiter.admit(&key("busy"), 0);
        assert_eq!(limiter.client_count(), 2);

        limiter.admit(&key("busy"), 95);
        limiter.sweep(100);

        assert_eq!(limiter.client_count(), 1);
        assert_eq!(limiter.recorded_count(&key("idle")), 0);
        assert_eq!(limiter.recorded_count(&key("busy")), 1);
    }

    #[test]
    fn test_sweep_piggybacks_on_admit_when_interval_elapses() {
        let limiter = AdmissionLimiter::new(5, 10, 60);

        limiter.admit(&key("idle"), 0);
        assert_eq!(limiter.client_count(), 1);

        // Within the cleanup interval the idle entry stays put
        limiter.admit(&key("other"), 30);
        assert_eq!(limiter.client_count(), 2);

        // Once the interval elapses, the next admit sweeps it away
        limiter.admit(&key("other"), 61);
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn test_sentinel_key_is_limited_like_any_other() {
        let limiter = AdmissionLimiter::new(1, 60, 300);

        assert!(limiter.admit(&ClientKey::unknown(), 0).is_admitted());
        assert!(!limiter.admit(&ClientKey::new(""), 1).is_admitted());
    }

    #[test]
    fn test_clear_resets_state() {
        let limiter = AdmissionLimiter::new(1, 60, 300);
        let client = key("1.2.3.4");

        limiter.admit(&client, 0);
        assert!(!limiter.admit(&client, 1).is_admitted());

        limiter.clear();
        assert!(limiter.admit(&client, 2).is_admitted());
    }

    #[test]
    fn test_no_lost_updates_under_contention() {
        use std::sync::Arc;

        const LIMIT: u32 = 50;

        let limiter = Arc::new(AdmissionLimiter::new(LIMIT, 60, 300));
        let client = key("1.2.3.4");
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let client = client.clone();
            handles.push(std::thread::spawn(move || {
                let mut admitted = 0u32;
                for _ in 0..25 {
                    if limiter.admit(&client, 100).is_admitted() {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, LIMIT);
        assert_eq!(limiter.recorded_count(&client), LIMIT as usize);
    }
}
