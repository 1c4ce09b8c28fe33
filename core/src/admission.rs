//! Admission control: donor bypass in front of the per-client tracker.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::tracker::{Admission, ClientTracker};
use parking_lot::RwLock;
use std::collections::HashSet;

/// Characters of the user agent kept in a client identity.
pub const USER_AGENT_PREFIX_CHARS: usize = 50;

/// Derive the identity a request is counted under: the first forwarded
/// address (or the peer address) and a truncated user agent, joined by `|`.
pub fn client_identity(forwarded_for: Option<&str>, peer: Option<&str>, user_agent: Option<&str>) -> String {
    let ip = forwarded_for
        .map(|v| v.split(',').next().unwrap_or_default().trim())
        .filter(|v| !v.is_empty())
        .or(peer)
        .unwrap_or_default();
    let ua: String = user_agent.unwrap_or_default().chars().take(USER_AGENT_PREFIX_CHARS).collect();
    format!("{ip}|{ua}")
}

/// Pre-shared keys that exempt their holder from rate limiting.
#[derive(Debug, Default)]
pub struct DonorKeys {
    keys: RwLock<HashSet<String>>,
}

impl DonorKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = Self::default();
        set.reload(keys);
        set
    }

    /// Parse a comma separated key list; blanks are ignored.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim))
    }

    pub fn contains(&self, key: &str) -> bool {
        !key.is_empty() && self.keys.read().contains(key)
    }

    /// Replace the whole key set.
    pub fn reload<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = keys.into_iter().map(Into::into).filter(|k| !k.is_empty()).collect();
        *self.keys.write() = set;
    }

    /// Add one key. Returns false if it was already present or empty.
    pub fn insert(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        !key.is_empty() && self.keys.write().insert(key)
    }

    pub fn len(&self) -> usize { self.keys.read().len() }

    pub fn is_empty(&self) -> bool { self.keys.read().is_empty() }
}

/// Details surfaced to an over-quota caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub retry_after_secs: u64,
    pub current_count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Donor key presented; nothing was recorded.
    Donor,
    Admitted { count: u32 },
    Rejected(Rejection),
}

impl Decision {
    pub fn is_admitted(&self) -> bool { !matches!(self, Decision::Rejected(_)) }
}

/// Per-client usage as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub requests: u32,
    pub remaining: u32,
}

pub struct AdmissionController<C: Clock = SystemClock> {
    tracker: ClientTracker,
    donors: DonorKeys,
    config: RateLimitConfig,
    clock: C,
}

impl AdmissionController<SystemClock> {
    pub fn new(config: RateLimitConfig, donors: DonorKeys) -> Self {
        Self::with_clock(config, donors, SystemClock)
    }
}

impl<C: Clock> AdmissionController<C> {
    pub fn with_clock(config: RateLimitConfig, donors: DonorKeys, clock: C) -> Self {
        tracing::info!(limit = config.limit, window_secs = config.window_secs(), donor_keys = donors.len(), "rate limiter initialized");
        Self { tracker: ClientTracker::new(), donors, config, clock }
    }

    pub fn config(&self) -> &RateLimitConfig { &self.config }

    pub fn donors(&self) -> &DonorKeys { &self.donors }

    pub fn tracker(&self) -> &ClientTracker { &self.tracker }

    pub fn is_donor(&self, key: Option<&str>) -> bool {
        key.is_some_and(|k| self.donors.contains(k))
    }

    /// Decide whether a request from `identity`, optionally carrying a donor
    /// key, may proceed. Donor keys skip the tracker entirely.
    pub fn check(&self, identity: &str, key: Option<&str>) -> Decision {
        if self.is_donor(key) {
            tracing::debug!(key_prefix = %key_prefix(key.unwrap_or_default()), "donor key used");
            return Decision::Donor;
        }

        match self.tracker.record(identity, self.clock.now(), self.config.limit, self.config.window) {
            Admission::Admitted { count } => Decision::Admitted { count },
            Admission::Limited { count } => {
                tracing::info!(client = identity, count, limit = self.config.limit, "rate limit exceeded");
                Decision::Rejected(Rejection {
                    retry_after_secs: self.config.window_secs(),
                    current_count: count,
                    limit: self.config.limit,
                })
            }
        }
    }

    /// Current usage for `identity` without recording a request.
    pub fn usage(&self, identity: &str) -> Usage {
        let requests = self.tracker.usage(identity).map(|r| r.request_count).unwrap_or(0);
        Usage { requests, remaining: self.config.limit.saturating_sub(requests) }
    }

    /// Evict records idle for longer than the configured number of windows.
    pub fn sweep(&self) -> usize {
        let Some(max_idle) = self.config.max_idle() else { return 0 };
        let removed = self.tracker.evict_idle(self.clock.now(), max_idle);
        if removed > 0 {
            tracing::debug!(removed, remaining = self.tracker.len(), "evicted idle clients");
        }
        removed
    }
}

/// First few characters of a key, safe to log.
pub fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}
