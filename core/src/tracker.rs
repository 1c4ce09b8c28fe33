//! Per-client request counters over fixed windows.
//!
//! A single mutex guards the whole map, so the expire/check/increment
//! sequence for one request is atomic with respect to every other request.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRecord {
    pub request_count: u32,
    pub window_start: Instant,
}

/// Outcome of recording one request against a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted; carries the count after this request.
    Admitted { count: u32 },
    /// Over quota; carries the count that caused the rejection.
    Limited { count: u32 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool { matches!(self, Admission::Admitted { .. }) }
}

#[derive(Debug, Default)]
pub struct ClientTracker {
    clients: Mutex<HashMap<String, ClientRecord>>,
}

impl ClientTracker {
    pub fn new() -> Self { Self::default() }

    /// Record a request from `identity` at `now` and decide whether it fits
    /// in the current window.
    ///
    /// An expired window resets the count before the limit is checked, and
    /// rejected requests leave the count untouched.
    pub fn record(&self, identity: &str, now: Instant, limit: u32, window: Duration) -> Admission {
        let mut clients = self.clients.lock();
        let Some(record) = clients.get_mut(identity) else {
            clients.insert(identity.to_string(), ClientRecord { request_count: 1, window_start: now });
            tracing::debug!(client = identity, "new client");
            return Admission::Admitted { count: 1 };
        };

        if now.saturating_duration_since(record.window_start) > window {
            tracing::debug!(client = identity, previous = record.request_count, "window reset");
            record.request_count = 1;
            record.window_start = now;
            return Admission::Admitted { count: 1 };
        }

        if record.request_count >= limit {
            return Admission::Limited { count: record.request_count };
        }

        record.request_count += 1;
        Admission::Admitted { count: record.request_count }
    }

    /// Snapshot of a client's record, without touching it.
    pub fn usage(&self, identity: &str) -> Option<ClientRecord> {
        self.clients.lock().get(identity).copied()
    }

    /// Drop clients whose window started more than `max_idle` ago.
    /// Returns how many records were removed.
    pub fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, r| now.saturating_duration_since(r.window_start) <= max_idle);
        before - clients.len()
    }

    pub fn len(&self) -> usize { self.clients.lock().len() }

    pub fn is_empty(&self) -> bool { self.clients.lock().is_empty() }
}
