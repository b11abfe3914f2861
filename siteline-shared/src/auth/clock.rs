/// Time source for token issuance and expiry checks
///
/// Token lifetimes are evaluated against an injected [`Clock`] instead of the
/// system time directly, so expiry can be exercised deterministically.
///
/// # Example
///
/// ```
/// use siteline_shared::auth::clock::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::default();
/// let start = clock.now();
/// clock.advance(Duration::hours(2));
/// assert_eq!(clock.now() - start, Duration::hours(2));
/// ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
///
/// Cloning shares the underlying instant, so a test can keep one handle and
/// pass another into the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward (or backward for negative durations)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jumps the clock to `instant`
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::seconds(90));

        assert_eq!(clock.now(), start + Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::default();
        let instant = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();

        clock.set(instant);

        assert_eq!(clock.now(), instant);
    }

    #[test]
    fn test_system_clock_tracks_utc() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
