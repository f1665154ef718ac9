//! Hardware device abstraction layer for the cardgate access controller.
//!
//! This crate provides trait-based abstractions for the peripherals of a
//! single-door access controller: an NFC radio, a small EEPROM, a character
//! LCD, digital pins for buttons and the door relay, and a monotonic clock.
//! These traits allow substitution between mock implementations (for
//! development and testing) and real drivers.
//!
//! # Design Philosophy
//!
//! - **Synchronous**: the controller runs one cooperative cycle; every call
//!   completes or fails within a bounded timeout.
//! - **Generic-friendly**: the controller is generic over each trait, so a
//!   board build and the simulator share the same code.
//! - **Error-aware**: all operations return [`Result<T>`] with a
//!   [`HardwareError`] describing the failure.
//! - **Time-injectable**: timing reads go through [`Clock`], so tests run on
//!   simulated time with [`mock::MockClock`].
//!
//! # Device Traits
//!
//! ## NFC Radio
//!
//! ```
//! use std::time::Duration;
//! use cardgate_hardware::mock::MockNfc;
//! use cardgate_hardware::traits::NfcDevice;
//! use cardgate_core::CardIdentity;
//!
//! let (mut radio, handle) = MockNfc::new();
//! handle.present(CardIdentity::new(&[1, 2, 3, 4]).unwrap());
//!
//! let card = radio.detect(Duration::from_millis(50)).unwrap();
//! assert!(card.is_some());
//! ```
//!
//! ## Byte Storage
//!
//! ```
//! use cardgate_hardware::mock::MemoryStorage;
//! use cardgate_hardware::traits::ByteStorage;
//!
//! let mut eeprom = MemoryStorage::default();
//! eeprom.write_byte(2, 7).unwrap();
//! assert_eq!(eeprom.read_byte(2).unwrap(), 7);
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] which uses the
//! [`HardwareError`] error type. [`HardwareError::is_transient`] separates
//! failures worth retrying on the next card presentation from permanent ones.
//!
//! [`Clock`]: traits::Clock

pub mod clock;
pub mod error;
pub mod irq;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use clock::SystemClock;
pub use error::{HardwareError, Result};
pub use irq::IrqLine;
pub use traits::{ByteStorage, CharacterDisplay, Clock, DigitalIo, NfcDevice};
pub use types::{FirmwareVersion, KeyType, Level, PinId, RawCard};
