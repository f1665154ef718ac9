//! Manually advanced clock for deterministic tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::traits::Clock;

/// Simulated monotonic clock.
///
/// Time only moves when [`advance`](Self::advance) is called. Clones share
/// the same timeline, so a test can keep one clone while the controller owns
/// another.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardgate_hardware::mock::MockClock;
/// use cardgate_hardware::traits::Clock;
///
/// let clock = MockClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now() - start, Duration::from_millis(250));
/// assert_eq!(clock.elapsed_ms(), 250);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move simulated time forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.lock();
        *offset += by;
    }

    /// Move simulated time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Milliseconds elapsed since the clock was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.lock().as_millis() as u64
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Duration> {
        match self.offset.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + *self.lock()
    }
}
