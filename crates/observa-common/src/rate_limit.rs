//! Keyed rate limiting with an injectable clock
//!
//! Hosts use this to throttle repeated notification or issue-tracker
//! events for the same observation. The limiter is an explicitly passed,
//! process-lifetime object; the clock is injectable so tests control time.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Allows one event per key per cooldown interval
pub struct RateLimiter<C: Clock = SystemClock> {
    cooldown: Duration,
    last_seen: HashMap<String, DateTime<Utc>>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(cooldown_seconds: u64) -> Self {
        Self::with_clock(cooldown_seconds, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(cooldown_seconds: u64, clock: C) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_seconds as i64),
            last_seen: HashMap::new(),
            clock,
        }
    }

    /// Whether an event for this key may fire now; firing starts the
    /// key's cooldown
    pub fn check(&mut self, key: &str) -> bool {
        let now = self.clock.now();
        match self.last_seen.get(key) {
            Some(last) if now - *last < self.cooldown => false,
            _ => {
                self.last_seen.insert(key.to_string(), now);
                true
            }
        }
    }

    /// Drop expired entries to bound memory on long-running hosts
    pub fn prune(&mut self) {
        let now = self.clock.now();
        let cooldown = self.cooldown;
        self.last_seen.retain(|_, last| now - *last < cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeClock {
        now: Cell<DateTime<Utc>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Utc::now()),
            }
        }

        fn advance(&self, seconds: i64) {
            self.now.set(self.now.get() + Duration::seconds(seconds));
        }
    }

    impl Clock for &FakeClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }
    }

    #[test]
    fn test_cooldown_blocks_repeats() {
        let clock = FakeClock::new();
        let mut limiter = RateLimiter::with_clock(60, &clock);

        assert!(limiter.check("obs-1"));
        assert!(!limiter.check("obs-1"));
        assert!(limiter.check("obs-2"));

        clock.advance(61);
        assert!(limiter.check("obs-1"));
    }

    #[test]
    fn test_prune_drops_expired_keys() {
        let clock = FakeClock::new();
        let mut limiter = RateLimiter::with_clock(60, &clock);
        assert!(limiter.check("obs-1"));

        clock.advance(120);
        limiter.prune();
        assert!(limiter.last_seen.is_empty());
    }
}
