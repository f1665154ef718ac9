//! In-memory EEPROM.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::{HardwareError, Result, traits::ByteStorage};

/// Default simulated device size (ATmega328-class EEPROM).
pub const DEFAULT_EEPROM_SIZE: usize = 1024;

#[derive(Debug)]
struct Image {
    bytes: Vec<u8>,
    writes: usize,
    // Writes left before the device starts failing.
    fail_after: Option<usize>,
}

/// Byte storage backed by a shared in-memory image.
///
/// Fresh devices read `0xFF` everywhere, like erased EEPROM. Clones share
/// the image, which lets a test "reboot" by opening a second store over the
/// same memory.
///
/// # Examples
///
/// ```
/// use cardgate_hardware::mock::MemoryStorage;
/// use cardgate_hardware::traits::ByteStorage;
///
/// let mut eeprom = MemoryStorage::new(64);
/// assert_eq!(eeprom.read_byte(0).unwrap(), 0xFF);
///
/// eeprom.write_u16_be(0, 0xABCD).unwrap();
/// let reboot = eeprom.clone();
/// assert_eq!(reboot.read_u16_be(0).unwrap(), 0xABCD);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    image: Arc<Mutex<Image>>,
}

impl MemoryStorage {
    /// Erased device of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_bytes(vec![0xFF; size])
    }

    /// Device preloaded with `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            image: Arc::new(Mutex::new(Image {
                bytes,
                writes: 0,
                fail_after: None,
            })),
        }
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    /// Number of successful byte writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Make every write fail once `remaining` more writes have succeeded.
    /// `None` restores normal behaviour.
    pub fn fail_writes_after(&self, remaining: Option<usize>) {
        self.lock().fail_after = remaining;
    }

    /// Overwrite a byte directly, bypassing fault injection.
    pub fn poke(&self, addr: usize, value: u8) {
        let mut image = self.lock();
        if let Some(slot) = image.bytes.get_mut(addr) {
            *slot = value;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Image> {
        match self.image.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_EEPROM_SIZE)
    }
}

impl ByteStorage for MemoryStorage {
    fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    fn read_byte(&self, addr: u16) -> Result<u8> {
        let image = self.lock();
        image
            .bytes
            .get(addr as usize)
            .copied()
            .ok_or_else(|| HardwareError::out_of_range(addr, image.bytes.len()))
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        let mut image = self.lock();
        let size = image.bytes.len();

        let fail_after = image.fail_after;
        match fail_after {
            Some(0) => return Err(HardwareError::communication("EEPROM write failed")),
            Some(n) => image.fail_after = Some(n - 1),
            None => {}
        }

        let slot = image
            .bytes
            .get_mut(addr as usize)
            .ok_or_else(|| HardwareError::out_of_range(addr, size))?;
        *slot = value;
        image.writes += 1;

        trace!(addr, value, "EEPROM write");
        Ok(())
    }
}
