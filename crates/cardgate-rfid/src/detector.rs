//! Card presence detection.
//!
//! Wraps the radio's detect call with the two read modes of the reader and
//! same-card suppression:
//!
//! - **Polling**: the radio is queried at most once per poll interval.
//! - **Interrupt**: the radio is only queried after the IRQ line fired. The
//!   flag is raised from interrupt context and consumed here with an atomic
//!   read-then-clear; no radio I/O ever happens on the interrupt side.
//!
//! A card that stays in the field is reported once. It is reported again
//! after it has been out of the field for the removal timeout, or as soon as
//! a different card appears.

use std::time::{Duration, Instant};

use cardgate_core::CardIdentity;
use cardgate_core::constants::{
    CARD_REMOVAL_TIMEOUT_MS, NFC_IRQ_DEBOUNCE_MS, NFC_IRQ_READ_TIMEOUT_MS, NFC_POLL_INTERVAL_MS,
    NFC_POLL_TIMEOUT_MS,
};
use cardgate_hardware::{IrqLine, NfcDevice, RawCard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// How the reader learns about new cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Periodic detect calls.
    #[default]
    Polling,
    /// Detect calls only after the radio raised its IRQ line.
    Interrupt,
}

/// Detector timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    pub mode: DetectionMode,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub irq_read_timeout: Duration,
    pub irq_debounce: Duration,
    pub removal_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Polling,
            poll_interval: Duration::from_millis(NFC_POLL_INTERVAL_MS),
            poll_timeout: Duration::from_millis(NFC_POLL_TIMEOUT_MS),
            irq_read_timeout: Duration::from_millis(NFC_IRQ_READ_TIMEOUT_MS),
            irq_debounce: Duration::from_millis(NFC_IRQ_DEBOUNCE_MS),
            removal_timeout: Duration::from_millis(CARD_REMOVAL_TIMEOUT_MS),
        }
    }
}

impl DetectorConfig {
    /// Set the detection mode.
    pub fn with_mode(mut self, mode: DetectionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Reports newly presented cards.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::MockNfc;
/// use cardgate_rfid::{CardDetector, DetectorConfig};
///
/// let (mut radio, handle) = MockNfc::new();
/// let mut detector = CardDetector::new(DetectorConfig::default());
/// let t0 = Instant::now();
///
/// handle.present(CardIdentity::new(&[1, 2, 3, 4]).unwrap());
/// assert!(detector.poll(&mut radio, t0).is_some());
///
/// // Still in the field: not reported again.
/// assert!(detector.poll(&mut radio, t0 + Duration::from_millis(200)).is_none());
/// ```
#[derive(Debug)]
pub struct CardDetector {
    config: DetectorConfig,
    irq: Option<IrqLine>,
    last_poll: Option<Instant>,
    last_uid: Option<CardIdentity>,
    last_seen: Option<Instant>,
}

impl CardDetector {
    /// Create a detector. Interrupt mode allocates its own [`IrqLine`];
    /// hand [`irq_line`](Self::irq_line) to the interrupt side.
    pub fn new(config: DetectorConfig) -> Self {
        let irq = match config.mode {
            DetectionMode::Interrupt => Some(IrqLine::with_debounce(config.irq_debounce)),
            DetectionMode::Polling => None,
        };

        Self {
            config,
            irq,
            last_poll: None,
            last_uid: None,
            last_seen: None,
        }
    }

    /// Active detection mode.
    pub fn mode(&self) -> DetectionMode {
        self.config.mode
    }

    /// IRQ line to be raised by the radio's interrupt (interrupt mode only).
    pub fn irq_line(&self) -> Option<IrqLine> {
        self.irq.clone()
    }

    /// Run one detection step. Returns a card only when it is newly
    /// presented.
    ///
    /// Radio failures are logged and reported as "no card".
    pub fn poll<N: NfcDevice>(&mut self, nfc: &mut N, now: Instant) -> Option<RawCard> {
        let timeout = match &self.irq {
            Some(irq) => {
                if !irq.take() {
                    return None;
                }
                trace!("IRQ pending, reading card");
                self.config.irq_read_timeout
            }
            None => {
                if let Some(last) = self.last_poll
                    && now.saturating_duration_since(last) < self.config.poll_interval
                {
                    return None;
                }
                self.last_poll = Some(now);
                self.config.poll_timeout
            }
        };

        let card = match nfc.detect(timeout) {
            Ok(card) => card?,
            Err(e) => {
                warn!(error = %e, "Card detection failed");
                return None;
            }
        };

        let still_present = self.last_uid == Some(card.uid)
            && self
                .last_seen
                .is_some_and(|seen| now.saturating_duration_since(seen) < self.config.removal_timeout);

        self.last_uid = Some(card.uid);
        self.last_seen = Some(now);

        if still_present {
            trace!(uid = %card.uid, "Same card still present");
            return None;
        }

        info!(uid = %card.uid, class = %card.class, "Card detected");
        Some(card)
    }

    /// Forget the tracked card so the next detection is reported even if it
    /// is the same card.
    pub fn reset(&mut self) {
        debug!("Card detector reset");
        self.last_uid = None;
        self.last_seen = None;
        if let Some(irq) = &self.irq {
            irq.clear();
        }
    }
}
