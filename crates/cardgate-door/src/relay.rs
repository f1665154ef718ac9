//! Time-driven relay control.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use cardgate_core::constants::{DOOR_UNLOCK_TIME_MS, RELAY_ACTIVE_HIGH, RELAY_PIN};
use cardgate_hardware::Result;
use cardgate_hardware::traits::DigitalIo;
use cardgate_hardware::types::{Level, PinId};

/// Lock position as last driven onto the relay pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Locked,
    Unlocked,
}

/// Relay wiring and unlock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub pin: PinId,
    /// Relay energizes (door unlocks) when the pin is driven high.
    pub active_high: bool,
    pub unlock_ms: u64,
}

impl RelayConfig {
    /// Level that unlocks the door.
    pub fn unlocked_level(&self) -> Level {
        Level::from_bool(self.active_high)
    }

    /// Level that locks the door.
    pub fn locked_level(&self) -> Level {
        self.unlocked_level().inverted()
    }

    pub fn unlock_duration(&self) -> Duration {
        Duration::from_millis(self.unlock_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pin: PinId(RELAY_PIN),
            active_high: RELAY_ACTIVE_HIGH,
            unlock_ms: DOOR_UNLOCK_TIME_MS,
        }
    }
}

/// Door relay with automatic relock.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use cardgate_door::{DoorRelay, DoorState, RelayConfig};
/// use cardgate_hardware::mock::MockPins;
///
/// let (mut pins, _handle) = MockPins::new();
/// let mut door = DoorRelay::new(RelayConfig::default());
/// let t0 = Instant::now();
///
/// door.lock(&mut pins).unwrap();
/// door.unlock(&mut pins, t0).unwrap();
/// assert_eq!(door.state(), DoorState::Unlocked);
///
/// door.update(&mut pins, t0 + Duration::from_millis(3000)).unwrap();
/// assert_eq!(door.state(), DoorState::Locked);
/// ```
#[derive(Debug, Clone)]
pub struct DoorRelay {
    config: RelayConfig,
    unlocked_at: Option<Instant>,
}

impl DoorRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            unlocked_at: None,
        }
    }

    /// Drive the relay to the locked level. Called once at boot.
    pub fn lock<IO: DigitalIo>(&mut self, io: &mut IO) -> Result<()> {
        io.write_pin(self.config.pin, self.config.locked_level())?;
        self.unlocked_at = None;
        Ok(())
    }

    /// Unlock and (re)start the unlock window at `now`.
    pub fn unlock<IO: DigitalIo>(&mut self, io: &mut IO, now: Instant) -> Result<()> {
        io.write_pin(self.config.pin, self.config.unlocked_level())?;
        self.unlocked_at = Some(now);
        info!(pin = %self.config.pin, unlock_ms = self.config.unlock_ms, "Door unlocked");
        Ok(())
    }

    /// Relock once the unlock window has elapsed. No-op while locked.
    ///
    /// A failed relock write leaves the relay marked unlocked so the next
    /// cycle retries it.
    pub fn update<IO: DigitalIo>(&mut self, io: &mut IO, now: Instant) -> Result<()> {
        let Some(since) = self.unlocked_at else {
            return Ok(());
        };
        if now.saturating_duration_since(since) < self.config.unlock_duration() {
            return Ok(());
        }

        io.write_pin(self.config.pin, self.config.locked_level())?;
        self.unlocked_at = None;
        info!(pin = %self.config.pin, "Door locked");
        Ok(())
    }

    pub fn state(&self) -> DoorState {
        if self.unlocked_at.is_some() {
            DoorState::Unlocked
        } else {
            DoorState::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == DoorState::Unlocked
    }

    /// Time left before relock, if unlocked.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.unlocked_at.map(|since| {
            self.config
                .unlock_duration()
                .saturating_sub(now.saturating_duration_since(since))
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
