//! # Clocks
//!
//! Time sources for cooldowns and timestamps.

use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Time since the unix epoch.
    fn now(&self) -> Duration;

    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// A manually advanced clock, for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Duration) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis() as u64),
        }
    }

    /// Move the clock forward.
    pub fn advance(
        &self,
        by: Duration,
    ) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Duration::from_secs(10));
        assert_eq!(clock.now_millis(), 10_000);

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now(), Duration::from_millis(11_500));
    }

    #[test]
    fn test_system_clock() {
        // 2020-01-01.
        assert!(SystemClock.now() > Duration::from_secs(1_577_836_800));
    }
}
