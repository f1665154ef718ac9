//! Radio interrupt line.
//!
//! The radio raises its IRQ pin when a card enters the field. The signalling
//! side (an interrupt handler, or the mock radio) calls [`IrqLine::signal`];
//! the control loop consumes the flag with [`IrqLine::take`]. The pending
//! flag is the only state shared between the two sides and is accessed with
//! an atomic read-then-clear.
//!
//! Signals arriving within the debounce window of the previous accepted
//! signal are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cardgate_core::constants::NFC_IRQ_DEBOUNCE_MS;

#[derive(Debug)]
struct Shared {
    pending: AtomicBool,
    // Only touched by the signalling side.
    last_signal: Mutex<Option<Instant>>,
}

/// Shared, cloneable handle to the radio interrupt flag.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use cardgate_hardware::irq::IrqLine;
///
/// let irq = IrqLine::new();
/// let t0 = Instant::now();
///
/// assert!(irq.signal(t0));
/// assert!(!irq.signal(t0 + Duration::from_millis(100))); // debounced
///
/// assert!(irq.take());
/// assert!(!irq.take()); // cleared by the first take
/// ```
#[derive(Debug, Clone)]
pub struct IrqLine {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl IrqLine {
    /// New line with the default debounce window.
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(NFC_IRQ_DEBOUNCE_MS))
    }

    /// New line with a custom debounce window.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: AtomicBool::new(false),
                last_signal: Mutex::new(None),
            }),
            debounce,
        }
    }

    /// Raise the line at time `at`.
    ///
    /// Returns `true` if the signal was accepted (not debounced).
    pub fn signal(&self, at: Instant) -> bool {
        let mut last = match self.shared.last_signal.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = *last
            && at.saturating_duration_since(previous) <= self.debounce
        {
            return false;
        }

        *last = Some(at);
        self.shared.pending.store(true, Ordering::Release);
        true
    }

    /// Consume the pending flag. Returns whether a signal was pending.
    pub fn take(&self) -> bool {
        self.shared.pending.swap(false, Ordering::AcqRel)
    }

    /// Peek at the pending flag without clearing it.
    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Drop any pending signal.
    pub fn clear(&self) {
        self.shared.pending.store(false, Ordering::Release);
    }
}

impl Default for IrqLine {
    fn default() -> Self {
        Self::new()
    }
}
