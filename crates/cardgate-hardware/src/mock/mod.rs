//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware. Each mock either
//! returns a companion handle or is cheaply cloneable, so a test can keep
//! driving and observing the device after handing it to the controller.

pub mod clock;
pub mod eeprom;
pub mod lcd;
pub mod nfc;
pub mod pins;

// Re-export commonly used types
pub use clock::MockClock;
pub use eeprom::{DEFAULT_EEPROM_SIZE, MemoryStorage};
pub use lcd::VirtualLcd;
pub use nfc::{MockNfc, MockNfcHandle, SimCard};
pub use pins::{MockPins, MockPinsHandle};
