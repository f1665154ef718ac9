//! Time-window debouncer for a single active-low button.

use std::time::{Duration, Instant};

use cardgate_core::constants::BUTTON_DEBOUNCE_TIME_MS;

/// Stable-level change reported by [`Debouncer::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Debounce state for one button.
///
/// A raw change is committed immediately when at least `interval` has passed
/// since the last accepted change, and ignored otherwise. The first edge
/// therefore has no latency, while contact bounce following it is absorbed.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use cardgate_input::{Debouncer, Edge};
///
/// let t0 = Instant::now();
/// let mut button = Debouncer::new();
///
/// assert_eq!(button.update(Some(true), t0), Some(Edge::Pressed));
/// // Bounce 5 ms later is swallowed.
/// assert_eq!(button.update(Some(false), t0 + Duration::from_millis(5)), None);
/// assert!(button.is_pressed());
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    stable: bool,
    last_raw: bool,
    last_change: Option<Instant>,
}

impl Debouncer {
    /// Debouncer with the default 20 ms window, starting released.
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(BUTTON_DEBOUNCE_TIME_MS))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            stable: false,
            last_raw: false,
            last_change: None,
        }
    }

    /// Feed one sample.
    ///
    /// `raw` is `Some(pressed)` for a successful read and `None` when the pin
    /// could not be read, in which case the stable level is kept.
    pub fn update(&mut self, raw: Option<bool>, now: Instant) -> Option<Edge> {
        let reading = raw?;
        self.last_raw = reading;

        if reading == self.stable {
            return None;
        }

        let settled = self
            .last_change
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
        if !settled {
            return None;
        }

        self.stable = reading;
        self.last_change = Some(now);
        Some(if reading { Edge::Pressed } else { Edge::Released })
    }

    /// Current stable level.
    pub fn is_pressed(&self) -> bool {
        self.stable
    }

    /// Last raw sample, debounced or not.
    pub fn raw(&self) -> bool {
        self.last_raw
    }

    /// When the stable level last changed.
    pub fn last_change(&self) -> Option<Instant> {
        self.last_change
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
