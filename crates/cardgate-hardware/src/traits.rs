//! Hardware device trait definitions.
//!
//! These traits establish the contract between the access controller and its
//! peripherals: the NFC radio, the non-volatile byte store, the character
//! display, the digital pins (buttons and relay) and the monotonic clock.
//!
//! All calls are synchronous. The controller runs a single cooperative cycle
//! and every collaborator call either completes or fails within a bounded
//! timeout.

use std::time::{Duration, Instant};

use cardgate_core::CardIdentity;
use cardgate_core::constants::{BLOCK_SIZE, PAGE_SIZE};

use crate::error::Result;
use crate::types::{FirmwareVersion, KeyType, Level, PinId, RawCard};

/// NFC radio (PN532 class) abstraction.
///
/// Classic cards expose 16-byte blocks grouped in sectors of four; a block is
/// only accessible after authenticating its sector with a key. Lightweight
/// cards expose 4-byte pages without authentication.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardgate_hardware::traits::NfcDevice;
/// use cardgate_hardware::Result;
///
/// fn uid_hex<N: NfcDevice>(radio: &mut N) -> Result<Option<String>> {
///     let card = radio.detect(Duration::from_millis(50))?;
///     Ok(card.map(|c| c.uid.to_hex()))
/// }
/// ```
pub trait NfcDevice {
    /// Query the controller firmware. Fails if no controller answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller is absent or does not respond.
    fn firmware_version(&mut self) -> Result<FirmwareVersion>;

    /// Look for a card in the field for at most `timeout`.
    ///
    /// Returns `Ok(None)` when no card answered in time.
    fn detect(&mut self, timeout: Duration) -> Result<Option<RawCard>>;

    /// Authenticate the sector containing `block` on the card `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::AuthenticationFailed`] when the card rejects
    /// the key, or [`HardwareError::Unsupported`] for non-classic cards.
    ///
    /// [`HardwareError::AuthenticationFailed`]: crate::HardwareError::AuthenticationFailed
    /// [`HardwareError::Unsupported`]: crate::HardwareError::Unsupported
    fn authenticate_block(
        &mut self,
        uid: &CardIdentity,
        block: u8,
        key_type: KeyType,
        key: &[u8; 6],
    ) -> Result<()>;

    /// Read a 16-byte block from an authenticated sector.
    fn read_block(&mut self, block: u8) -> Result<[u8; BLOCK_SIZE]>;

    /// Write a 16-byte block to an authenticated sector.
    fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()>;

    /// Read a 4-byte page from a lightweight card.
    fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_SIZE]>;

    /// Write a 4-byte page to a lightweight card.
    fn write_page(&mut self, page: u8, data: &[u8; PAGE_SIZE]) -> Result<()>;
}

/// Small non-volatile byte-addressable memory (EEPROM class).
///
/// Writes are assumed durable once `write_byte` returns.
pub trait ByteStorage {
    /// Capacity in bytes.
    fn len(&self) -> usize;

    /// Returns `true` for a zero-sized device.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::AddressOutOfRange`] past the end of the device.
    ///
    /// [`HardwareError::AddressOutOfRange`]: crate::HardwareError::AddressOutOfRange
    fn read_byte(&self, addr: u16) -> Result<u8>;

    /// Write one byte.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()>;

    /// Read a big-endian `u16` at `addr`.
    fn read_u16_be(&self, addr: u16) -> Result<u16> {
        let hi = self.read_byte(addr)?;
        let lo = self.read_byte(addr.wrapping_add(1))?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Write a big-endian `u16` at `addr`.
    fn write_u16_be(&mut self, addr: u16, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(addr, hi)?;
        self.write_byte(addr.wrapping_add(1), lo)
    }

    /// Read `buf.len()` consecutive bytes starting at `addr`.
    fn read_into(&self, addr: u16, buf: &mut [u8]) -> Result<()> {
        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(addr.wrapping_add(offset as u16))?;
        }
        Ok(())
    }

    /// Write `data` to consecutive bytes starting at `addr`.
    fn write_all(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        for (offset, value) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as u16), *value)?;
        }
        Ok(())
    }
}

/// Character display (HD44780 class, 16x2 behind an I2C backpack).
pub trait CharacterDisplay {
    /// Number of character columns.
    fn columns(&self) -> usize;

    /// Number of character rows.
    fn rows(&self) -> usize;

    /// Blank the display and home the cursor.
    fn clear(&mut self) -> Result<()>;

    /// Move the cursor.
    fn set_cursor(&mut self, column: usize, row: usize) -> Result<()>;

    /// Print text at the cursor. Characters past the last column are dropped.
    fn print(&mut self, text: &str) -> Result<()>;
}

/// Digital pin access for buttons and the relay.
pub trait DigitalIo {
    /// Sample an input pin.
    fn read_pin(&mut self, pin: PinId) -> Result<Level>;

    /// Drive an output pin.
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<()>;
}

/// Monotonic time source.
///
/// All timing decisions derive from this clock so tests can run on
/// simulated time.
pub trait Clock {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
