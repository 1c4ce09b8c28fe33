use std::time::Duration;

pub const DEFAULT_RATE_LIMIT: u32 = 60;
pub const DEFAULT_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_IDLE_WINDOWS: u32 = 24;

/// Admission settings. Missing, unparsable or non-positive values fall back
/// to the defaults rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
    /// Records idle for this many windows are evicted; 0 disables eviction.
    pub idle_windows: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_RATE_LIMIT, window: Duration::from_secs(DEFAULT_WINDOW_SECS), idle_windows: DEFAULT_IDLE_WINDOWS }
    }
}

impl RateLimitConfig {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit: if limit == 0 { DEFAULT_RATE_LIMIT } else { limit },
            window: Duration::from_secs(if window_secs == 0 { DEFAULT_WINDOW_SECS } else { window_secs }),
            ..Self::default()
        }
    }

    /// Build from raw configuration strings, e.g. environment variables.
    pub fn from_raw(limit: Option<&str>, window_secs: Option<&str>, idle_windows: Option<&str>) -> Self {
        let limit = parse_positive(limit).unwrap_or(DEFAULT_RATE_LIMIT);
        let window_secs = parse_positive(window_secs).unwrap_or(DEFAULT_WINDOW_SECS);
        let idle_windows = idle_windows.and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(DEFAULT_IDLE_WINDOWS);
        Self { limit, window: Duration::from_secs(window_secs), idle_windows }
    }

    pub fn with_idle_windows(mut self, idle_windows: u32) -> Self {
        self.idle_windows = idle_windows;
        self
    }

    pub fn window_secs(&self) -> u64 { self.window.as_secs() }

    /// How long a record may sit untouched before eviction, if enabled.
    pub fn max_idle(&self) -> Option<Duration> {
        (self.idle_windows > 0).then(|| self.window.saturating_mul(self.idle_windows))
    }
}

fn parse_positive<T: std::str::FromStr + Default + PartialOrd>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|v| v.trim().parse::<T>().ok()).filter(|v| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back() {
        let c = RateLimitConfig::from_raw(Some("-5"), Some("abc"), None);
        assert_eq!(c, RateLimitConfig::default());
        let c = RateLimitConfig::from_raw(Some("0"), Some(""), Some("x"));
        assert_eq!(c, RateLimitConfig::default());
    }

    #[test]
    fn valid_values_are_used() {
        let c = RateLimitConfig::from_raw(Some(" 2 "), Some("60"), Some("0"));
        assert_eq!(c.limit, 2);
        assert_eq!(c.window_secs(), 60);
        assert_eq!(c.max_idle(), None);
    }

    #[test]
    fn zero_passed_to_new_uses_defaults() {
        assert_eq!(RateLimitConfig::new(0, 0), RateLimitConfig::default());
    }
}
