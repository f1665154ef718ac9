//! Mock digital pins.
//!
//! Inputs are driven from a [`MockPinsHandle`]; outputs written by the code
//! under test can be inspected through the same handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    HardwareError, Result,
    traits::DigitalIo,
    types::{Level, PinId},
};

#[derive(Debug, Default)]
struct PinBank {
    levels: HashMap<PinId, Level>,
    writes: Vec<(PinId, Level)>,
    fail_reads: bool,
}

/// Simulated pin bank.
///
/// Unset pins read [`Level::High`], matching inputs with pull-ups enabled.
///
/// # Examples
///
/// ```
/// use cardgate_hardware::mock::MockPins;
/// use cardgate_hardware::traits::DigitalIo;
/// use cardgate_hardware::types::{Level, PinId};
///
/// let (mut pins, handle) = MockPins::new();
/// assert_eq!(pins.read_pin(PinId(14)).unwrap(), Level::High);
///
/// handle.press(PinId(14));
/// assert_eq!(pins.read_pin(PinId(14)).unwrap(), Level::Low);
///
/// pins.write_pin(PinId(20), Level::High).unwrap();
/// assert_eq!(handle.level(PinId(20)), Level::High);
/// ```
#[derive(Debug)]
pub struct MockPins {
    bank: Arc<Mutex<PinBank>>,
}

impl MockPins {
    /// Create a pin bank and its controlling handle.
    pub fn new() -> (Self, MockPinsHandle) {
        let bank = Arc::new(Mutex::new(PinBank::default()));
        (
            Self {
                bank: Arc::clone(&bank),
            },
            MockPinsHandle { bank },
        )
    }
}

impl Default for MockPins {
    fn default() -> Self {
        Self::new().0
    }
}

impl DigitalIo for MockPins {
    fn read_pin(&mut self, pin: PinId) -> Result<Level> {
        let bank = lock(&self.bank);
        if bank.fail_reads {
            return Err(HardwareError::communication(format!("pin {pin} read failed")));
        }
        Ok(bank
            .levels
            .get(&pin)
            .copied()
            .unwrap_or(Level::High))
    }

    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<()> {
        let mut bank = lock(&self.bank);
        bank.levels.insert(pin, level);
        bank.writes.push((pin, level));
        Ok(())
    }
}

/// Handle for driving and observing a [`MockPins`] bank.
#[derive(Debug, Clone)]
pub struct MockPinsHandle {
    bank: Arc<Mutex<PinBank>>,
}

impl MockPinsHandle {
    /// Force a pin to `level`.
    pub fn set(&self, pin: PinId, level: Level) {
        lock(&self.bank).levels.insert(pin, level);
    }

    /// Pull an active-low button pin to ground.
    pub fn press(&self, pin: PinId) {
        self.set(pin, Level::Low);
    }

    /// Release an active-low button pin.
    pub fn release(&self, pin: PinId) {
        self.set(pin, Level::High);
    }

    /// Current level of a pin.
    pub fn level(&self, pin: PinId) -> Level {
        lock(&self.bank)
            .levels
            .get(&pin)
            .copied()
            .unwrap_or(Level::High)
    }

    /// Make every subsequent pin read fail until cleared.
    pub fn set_fail_reads(&self, fail: bool) {
        lock(&self.bank).fail_reads = fail;
    }

    /// Every level written to `pin` by the code under test, oldest first.
    pub fn writes(&self, pin: PinId) -> Vec<Level> {
        lock(&self.bank)
            .writes
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .collect()
    }
}

fn lock(bank: &Mutex<PinBank>) -> MutexGuard<'_, PinBank> {
    match bank.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let (mut pins, handle) = MockPins::new();
        handle.press(PinId(16));
        assert!(pins.read_pin(PinId(16)).unwrap().is_low());
        handle.release(PinId(16));
        assert!(pins.read_pin(PinId(16)).unwrap().is_high());
    }

    #[test]
    fn test_write_history() {
        let (mut pins, handle) = MockPins::new();
        pins.write_pin(PinId(20), Level::Low).unwrap();
        pins.write_pin(PinId(20), Level::High).unwrap();
        pins.write_pin(PinId(21), Level::High).unwrap();
        assert_eq!(handle.writes(PinId(20)), vec![Level::Low, Level::High]);
    }

    #[test]
    fn test_read_fault() {
        let (mut pins, handle) = MockPins::new();
        handle.set_fail_reads(true);
        assert!(pins.read_pin(PinId(14)).is_err());
        handle.set_fail_reads(false);
        assert!(pins.read_pin(PinId(14)).is_ok());
    }
}
