//! Runtime configuration.
//!
//! Every field defaults to the compile-time constant of the same meaning, so
//! a configuration file only needs to name what it changes:
//!
//! ```
//! use cardgate_controller::ControllerConfig;
//! use cardgate_rfid::DetectionMode;
//!
//! let config: ControllerConfig =
//!     serde_json::from_str(r#"{ "detection": "interrupt", "pins": { "relay": 9 } }"#).unwrap();
//!
//! assert_eq!(config.detection, DetectionMode::Interrupt);
//! assert_eq!(config.pins.relay.0, 9);
//! assert_eq!(config.unlock_ms, 3000);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use cardgate_core::constants::{
    BTN_BACK_PIN, BTN_DOWN_PIN, BTN_SELECT_PIN, BTN_UP_PIN, BUTTON_DEBOUNCE_TIME_MS,
    CARD_REMOVAL_TIMEOUT_MS, DOOR_UNLOCK_TIME_MS, LONG_PRESS_TIME_MS, MAX_STORED_CARDS,
    MENU_TIMEOUT_MS, MESSAGE_DISPLAY_TIME_MS, NFC_IRQ_DEBOUNCE_MS, NFC_IRQ_READ_TIMEOUT_MS,
    NFC_POLL_INTERVAL_MS, NFC_POLL_TIMEOUT_MS, RELAY_ACTIVE_HIGH, RELAY_PIN,
};
use cardgate_core::{Error, Result};
use cardgate_door::RelayConfig;
use cardgate_hardware::PinId;
use cardgate_input::ButtonPins;
use cardgate_rfid::{DetectionMode, DetectorConfig};

/// Pin assignment for buttons and the door relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub up: PinId,
    pub down: PinId,
    pub select: PinId,
    pub back: PinId,
    pub relay: PinId,
    pub relay_active_high: bool,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            up: PinId(BTN_UP_PIN),
            down: PinId(BTN_DOWN_PIN),
            select: PinId(BTN_SELECT_PIN),
            back: PinId(BTN_BACK_PIN),
            relay: PinId(RELAY_PIN),
            relay_active_high: RELAY_ACTIVE_HIGH,
        }
    }
}

impl PinConfig {
    pub fn buttons(&self) -> ButtonPins {
        ButtonPins {
            up: self.up,
            down: self.down,
            select: self.select,
            back: self.back,
        }
    }

    fn all(&self) -> [PinId; 5] {
        [self.up, self.down, self.select, self.back, self.relay]
    }
}

/// Controller configuration. Timings are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub capacity: usize,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    pub message_display_ms: u64,
    pub menu_timeout_ms: u64,
    pub unlock_ms: u64,
    pub detection: DetectionMode,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub irq_read_timeout_ms: u64,
    pub irq_debounce_ms: u64,
    pub card_removal_ms: u64,
    pub pins: PinConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_STORED_CARDS,
            debounce_ms: BUTTON_DEBOUNCE_TIME_MS,
            long_press_ms: LONG_PRESS_TIME_MS,
            message_display_ms: MESSAGE_DISPLAY_TIME_MS,
            menu_timeout_ms: MENU_TIMEOUT_MS,
            unlock_ms: DOOR_UNLOCK_TIME_MS,
            detection: DetectionMode::Polling,
            poll_interval_ms: NFC_POLL_INTERVAL_MS,
            poll_timeout_ms: NFC_POLL_TIMEOUT_MS,
            irq_read_timeout_ms: NFC_IRQ_READ_TIMEOUT_MS,
            irq_debounce_ms: NFC_IRQ_DEBOUNCE_MS,
            card_removal_ms: CARD_REMOVAL_TIMEOUT_MS,
            pins: PinConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_detection(mut self, mode: DetectionMode) -> Self {
        self.detection = mode;
        self
    }

    pub fn with_pins(mut self, pins: PinConfig) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_unlock_ms(mut self, ms: u64) -> Self {
        self.unlock_ms = ms;
        self
    }

    pub fn with_message_display_ms(mut self, ms: u64) -> Self {
        self.message_display_ms = ms;
        self
    }

    pub fn with_menu_timeout_ms(mut self, ms: u64) -> Self {
        self.menu_timeout_ms = ms;
        self
    }

    /// Reject configurations the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the capacity is zero or does not fit
    /// the one-byte count, when the long-press threshold does not exceed the
    /// debounce window, when a display or menu timeout is zero, or when two
    /// functions share a pin.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > u8::MAX as usize {
            return Err(Error::Config(format!(
                "capacity must be 1..=255, got {}",
                self.capacity
            )));
        }
        if self.long_press_ms <= self.debounce_ms {
            return Err(Error::Config(format!(
                "long press ({} ms) must exceed debounce ({} ms)",
                self.long_press_ms, self.debounce_ms
            )));
        }
        if self.message_display_ms == 0 || self.menu_timeout_ms == 0 {
            return Err(Error::Config(
                "message and menu timeouts must be non-zero".to_string(),
            ));
        }

        let pins = self.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(Error::Config(format!("pin {pin} assigned twice")));
            }
        }
        Ok(())
    }

    pub fn message_display(&self) -> Duration {
        Duration::from_millis(self.message_display_ms)
    }

    pub fn menu_timeout(&self) -> Duration {
        Duration::from_millis(self.menu_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            mode: self.detection,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            irq_read_timeout: Duration::from_millis(self.irq_read_timeout_ms),
            irq_debounce: Duration::from_millis(self.irq_debounce_ms),
            removal_timeout: Duration::from_millis(self.card_removal_ms),
        }
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            pin: self.pins.relay,
            active_high: self.pins.relay_active_high,
            unlock_ms: self.unlock_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_matches_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.detector(), DetectorConfig::default());
        assert_eq!(config.relay(), RelayConfig::default());
        assert_eq!(config.pins.buttons(), ButtonPins::default());
    }

    #[rstest]
    #[case(ControllerConfig::default().with_capacity(0))]
    #[case(ControllerConfig::default().with_capacity(256))]
    #[case(ControllerConfig::default().with_menu_timeout_ms(0))]
    #[case(ControllerConfig { long_press_ms: 20, ..ControllerConfig::default() })]
    #[case(ControllerConfig::default().with_pins(PinConfig { relay: PinId(BTN_UP_PIN), ..PinConfig::default() }))]
    fn test_invalid(#[case] config: ControllerConfig) {
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_json() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{ "unlock_ms": 5000, "pins": { "relay_active_high": false } }"#)
                .unwrap();
        assert_eq!(config.relay().unlock_duration(), Duration::from_secs(5));
        assert!(!config.relay().active_high);
        assert_eq!(config.pins.up, PinId(BTN_UP_PIN));
    }
}
