//! Per-client request timestamp log.

use std::collections::{HashMap, VecDeque};

use super::key::ClientKey;

/// A mapping from client key to an oldest-first sequence of unix timestamps.
///
/// Timestamps outside the sliding window are purged lazily before any read
/// or write of a client's sequence; the window boundary is inclusive, so a
/// timestamp exactly at `now - window_seconds` still counts. A client entry
/// is created on first request and removed during a sweep once its sequence
/// is empty.
///
/// The log itself is not synchronized; `AdmissionLimiter` guards it with a
/// whole-store lock.
#[derive(Debug, Default)]
pub struct RequestLog {
    clients: HashMap<ClientKey, VecDeque<u64>>,
}

impl RequestLog {
    /// Create an empty request log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Purge timestamps older than the window for one client.
    ///
    /// Returns the number of timestamps remaining in the client's window.
    /// Does not create an entry for an untracked client.
    pub fn purge_client(&mut self, key: &ClientKey, now: u64, window_seconds: u64) -> usize {
        let cutoff = now.saturating_sub(window_seconds);
        match self.clients.get_mut(key) {
            Some(timestamps) => {
                while timestamps.front().is_some_and(|&ts| ts < cutoff) {
                    timestamps.pop_front();
                }
                timestamps.len()
            }
            None => 0,
        }
    }

    /// Record a request timestamp for a client, creating the entry on first use.
    pub fn record(&mut self, key: ClientKey, now: u64) {
        self.clients.entry(key).or_default().push_back(now);
    }

    /// Purge stale timestamps for every client and drop clients whose
    /// sequences become empty.
    pub fn sweep(&mut self, now: u64, window_seconds: u64) {
        let cutoff = now.saturating_sub(window_seconds);
        self.clients.retain(|_, timestamps| {
            while timestamps.front().is_some_and(|&ts| ts < cutoff) {
                timestamps.pop_front();
            }
            !timestamps.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of recorded timestamps for a client, without purging.
    pub fn recorded_count(&self, key: &ClientKey) -> usize {
        self.clients.get(key).map_or(0, VecDeque::len)
    }

    /// Whether a client currently has an entry in the log.
    pub fn is_tracked(&self, key: &ClientKey) -> bool {
        self.clients.contains_key(key)
    }

    /// Remove all tracked state.
    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ClientKey {
        ClientKey::new(s)
    }

    #[test]
    fn test_record_creates_entry() {
        let mut log = RequestLog::new();
        assert!(!log.is_tracked(&key("1.2.3.4")));

        log.record(key("1.2.3.4"), 100);
        assert!(log.is_tracked(&key("1.2.3.4")));
        assert_eq!(log.recorded_count(&key("1.2.3.4")), 1);
        assert_eq!(log.client_count(), 1);
    }

    #[test]
    fn test_purge_removes_aged_timestamps() {
        let mut log = RequestLog::new();
        log.record(key("a"), 0);
        log.record(key("a"), 5);
        log.record(key("a"), 9);

        // At now=20 with a 10s window the cutoff is 10; all three have aged out
        assert_eq!(log.purge_client(&key("a"), 20, 10), 0);
    }

    #[test]
    fn test_purge_boundary_is_inclusive() {
        let mut log = RequestLog::new();
        log.record(key("a"), 1);

        // At now=11 with a 10s window the cutoff is 1; ts == cutoff survives
        assert_eq!(log.purge_client(&key("a"), 11, 10), 1);
        // One second later it falls out
        assert_eq!(log.purge_client(&key("a"), 12, 10), 0);
    }

    #[test]
    fn test_purge_untracked_client_is_zero() {
        let mut log = RequestLog::new();
        assert_eq!(log.purge_client(&key("nobody"), 100, 10), 0);
        assert!(!log.is_tracked(&key("nobody")));
    }

    #[test]
    fn test_purge_keeps_empty_entry_until_sweep() {
        let mut log = RequestLog::new();
        log.record(key("a"), 0);

        // Per-client purge empties the sequence but keeps the map entry
        assert_eq!(log.purge_client(&key("a"), 100, 10), 0);
        assert!(log.is_tracked(&key("a")));

        // The sweep drops it
        log.sweep(100, 10);
        assert!(!log.is_tracked(&key("a")));
    }

    #[test]
    fn test_sweep_drops_only_stale_clients() {
        let mut log = RequestLog::new();
        log.record(key("stale"), 0);
        log.record(key("active"), 0);
        log.record(key("active"), 95);

        log.sweep(100, 10);

        assert!(!log.is_tracked(&key("stale")));
        assert!(log.is_tracked(&key("active")));
        assert_eq!(log.recorded_count(&key("active")), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut log = RequestLog::new();
        log.record(key("a"), 1);
        log.record(key("b"), 2);
        assert_eq!(log.client_count(), 2);

        log.clear();
        assert_eq!(log.client_count(), 0);
    }
}
