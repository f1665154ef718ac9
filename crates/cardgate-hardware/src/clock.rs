//! Clock implementations.

use std::time::Instant;

use crate::traits::Clock;

/// Wall-clock backed [`Clock`] using [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
