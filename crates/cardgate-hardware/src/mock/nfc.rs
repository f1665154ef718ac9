//! Mock NFC radio implementation for testing and development.
//!
//! This module provides a simulated PN532-class radio with an in-memory card
//! database. Classic cards carry 64 blocks with per-sector keys; lightweight
//! cards carry 4-byte pages. A [`MockNfcHandle`] places cards in the field,
//! removes them, and injects radio faults.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cardgate_core::constants::{BLOCK_SIZE, DEFAULT_KEY, PAGE_SIZE};
use cardgate_core::{CardClass, CardIdentity};
use tracing::{debug, trace};

use crate::{
    HardwareError, Result,
    irq::IrqLine,
    mock::MockClock,
    traits::{Clock, NfcDevice},
    types::{FirmwareVersion, KeyType, RawCard},
};

/// Blocks on a classic 1K card.
pub const CLASSIC_1K_BLOCKS: usize = 64;

/// Pages on an NTAG213-class card.
pub const LIGHTWEIGHT_PAGES: usize = 45;

/// First user-writable page on a lightweight card.
pub const FIRST_USER_PAGE: u8 = 4;

/// Factory access bits for a sector trailer.
const TRAILER_ACCESS_BITS: [u8; 4] = [0xFF, 0x07, 0x80, 0x69];

/// Firmware reported by a healthy mock radio.
pub const MOCK_FIRMWARE: FirmwareVersion = FirmwareVersion {
    ic: 0x32,
    major: 1,
    minor: 6,
    support: 0x07,
};

/// Simulated card memory.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::SimCard;
///
/// let uid = CardIdentity::new(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
/// let card = SimCard::classic(uid).with_block(4, [0xAC; 16]);
/// assert_eq!(card.block(4), Some([0xAC; 16]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCard {
    uid: CardIdentity,
    class: CardClass,
    blocks: Vec<[u8; BLOCK_SIZE]>,
    pages: Vec<[u8; PAGE_SIZE]>,
    sector_keys: Vec<[u8; 6]>,
}

impl SimCard {
    /// Factory-fresh classic 1K card: zeroed data blocks, default keys.
    pub fn classic(uid: CardIdentity) -> Self {
        let mut blocks = vec![[0u8; BLOCK_SIZE]; CLASSIC_1K_BLOCKS];

        // Manufacturer block: UID, BCC, then vendor bytes.
        let uid_bytes = uid.as_bytes();
        blocks[0][..uid_bytes.len()].copy_from_slice(uid_bytes);
        blocks[0][uid_bytes.len()] = uid_bytes.iter().fold(0, |acc, b| acc ^ b);

        for trailer in (3..CLASSIC_1K_BLOCKS).step_by(4) {
            blocks[trailer][..6].copy_from_slice(&DEFAULT_KEY);
            blocks[trailer][6..10].copy_from_slice(&TRAILER_ACCESS_BITS);
            blocks[trailer][10..].copy_from_slice(&DEFAULT_KEY);
        }

        Self {
            uid,
            class: CardClass::ClassicSmall,
            blocks,
            pages: Vec::new(),
            sector_keys: vec![DEFAULT_KEY; CLASSIC_1K_BLOCKS / 4],
        }
    }

    /// Factory-fresh lightweight card: UID in the first pages, zeroed user
    /// memory.
    pub fn lightweight(uid: CardIdentity) -> Self {
        let mut pages = vec![[0u8; PAGE_SIZE]; LIGHTWEIGHT_PAGES];
        for (i, byte) in uid.as_bytes().iter().enumerate() {
            pages[i / PAGE_SIZE][i % PAGE_SIZE] = *byte;
        }

        Self {
            uid,
            class: CardClass::Lightweight,
            blocks: Vec::new(),
            pages,
            sector_keys: Vec::new(),
        }
    }

    /// Card whose family is inferred from the UID length.
    pub fn from_uid(uid: CardIdentity) -> Self {
        match CardClass::from_uid_length(uid.len()) {
            CardClass::Lightweight => Self::lightweight(uid),
            CardClass::ClassicSmall | CardClass::ClassicLarge => Self::classic(uid),
            CardClass::Unknown => Self {
                class: CardClass::Unknown,
                ..Self::lightweight(uid)
            },
        }
    }

    /// Preload a block.
    #[must_use]
    pub fn with_block(mut self, block: u8, data: [u8; BLOCK_SIZE]) -> Self {
        if let Some(slot) = self.blocks.get_mut(block as usize) {
            *slot = data;
        }
        self
    }

    /// Preload a page.
    #[must_use]
    pub fn with_page(mut self, page: u8, data: [u8; PAGE_SIZE]) -> Self {
        if let Some(slot) = self.pages.get_mut(page as usize) {
            *slot = data;
        }
        self
    }

    /// Replace the key of a sector so default-key authentication fails.
    #[must_use]
    pub fn with_sector_key(mut self, sector: usize, key: [u8; 6]) -> Self {
        if let Some(slot) = self.sector_keys.get_mut(sector) {
            *slot = key;
        }
        self
    }

    /// Physical UID.
    pub fn uid(&self) -> CardIdentity {
        self.uid
    }

    /// Card family.
    pub fn class(&self) -> CardClass {
        self.class
    }

    /// Current block content.
    pub fn block(&self, block: u8) -> Option<[u8; BLOCK_SIZE]> {
        self.blocks.get(block as usize).copied()
    }

    /// Current page content.
    pub fn page(&self, page: u8) -> Option<[u8; PAGE_SIZE]> {
        self.pages.get(page as usize).copied()
    }
}

/// Fault injection switches.
#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    fail_reads: bool,
    fail_writes: bool,
    // Writes report success but store altered data.
    corrupt_writes: bool,
}

#[derive(Debug)]
struct Field {
    cards: HashMap<CardIdentity, SimCard>,
    present: Option<CardIdentity>,
    authenticated_sector: Option<usize>,
    firmware: Option<FirmwareVersion>,
    faults: Faults,
    irq: Option<(IrqLine, MockClock)>,
    detect_calls: usize,
}

impl Field {
    fn present_card(&mut self) -> Result<&mut SimCard> {
        let uid = self.present.ok_or(HardwareError::NoCard)?;
        self.cards.get_mut(&uid).ok_or(HardwareError::NoCard)
    }

    fn check_block_access(&mut self, block: u8) -> Result<()> {
        let sector = block as usize / 4;
        if self.authenticated_sector != Some(sector) {
            return Err(HardwareError::authentication_failed(block));
        }
        let card = self.present_card()?;
        if block as usize >= card.blocks.len() {
            return Err(HardwareError::invalid_data(format!(
                "block {block} beyond card memory"
            )));
        }
        Ok(())
    }
}

/// Mock NFC radio for testing and development.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::MockNfc;
/// use cardgate_hardware::traits::NfcDevice;
///
/// let (mut radio, handle) = MockNfc::new();
/// let uid = CardIdentity::new(&[0x04, 0xAB, 0xCD, 0xEF]).unwrap();
///
/// assert!(radio.detect(Duration::from_millis(50)).unwrap().is_none());
///
/// handle.present(uid);
/// let card = radio.detect(Duration::from_millis(50)).unwrap().unwrap();
/// assert_eq!(card.uid.to_hex(), "04ABCDEF");
/// ```
#[derive(Debug)]
pub struct MockNfc {
    field: Arc<Mutex<Field>>,
}

impl MockNfc {
    /// Create a mock radio and its controlling handle.
    pub fn new() -> (Self, MockNfcHandle) {
        let field = Arc::new(Mutex::new(Field {
            cards: HashMap::new(),
            present: None,
            authenticated_sector: None,
            firmware: Some(MOCK_FIRMWARE),
            faults: Faults::default(),
            irq: None,
            detect_calls: 0,
        }));

        (
            Self {
                field: Arc::clone(&field),
            },
            MockNfcHandle { field },
        )
    }
}

impl Default for MockNfc {
    fn default() -> Self {
        Self::new().0
    }
}

impl NfcDevice for MockNfc {
    fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        lock(&self.field)
            .firmware
            .ok_or_else(|| HardwareError::disconnected("PN532"))
    }

    fn detect(&mut self, timeout: Duration) -> Result<Option<RawCard>> {
        let mut field = lock(&self.field);
        field.detect_calls += 1;
        field.authenticated_sector = None;

        let found = field
            .present
            .and_then(|uid| field.cards.get(&uid))
            .map(|card| RawCard::new(card.uid, card.class));

        trace!(timeout_ms = timeout.as_millis() as u64, found = found.is_some(), "detect");
        Ok(found)
    }

    fn authenticate_block(
        &mut self,
        uid: &CardIdentity,
        block: u8,
        _key_type: KeyType,
        key: &[u8; 6],
    ) -> Result<()> {
        let mut field = lock(&self.field);
        field.authenticated_sector = None;

        if field.present != Some(*uid) {
            return Err(HardwareError::NoCard);
        }

        let card = field.present_card()?;
        if !card.class.is_classic() {
            return Err(HardwareError::unsupported(format!(
                "sector authentication on {}",
                card.class
            )));
        }

        let sector = block as usize / 4;
        let expected = card
            .sector_keys
            .get(sector)
            .ok_or_else(|| HardwareError::invalid_data(format!("block {block} beyond card")))?;
        if expected != key {
            debug!(block, "Mock card rejected key");
            return Err(HardwareError::authentication_failed(block));
        }

        field.authenticated_sector = Some(sector);
        Ok(())
    }

    fn read_block(&mut self, block: u8) -> Result<[u8; BLOCK_SIZE]> {
        let mut field = lock(&self.field);
        if field.faults.fail_reads {
            return Err(HardwareError::communication("read NACK"));
        }
        field.check_block_access(block)?;
        Ok(field.present_card()?.blocks[block as usize])
    }

    fn write_block(&mut self, block: u8, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        let mut field = lock(&self.field);
        if block == 0 {
            return Err(HardwareError::unsupported("write to manufacturer block"));
        }
        if field.faults.fail_writes {
            return Err(HardwareError::communication("write NACK"));
        }
        field.check_block_access(block)?;

        let corrupt = field.faults.corrupt_writes;
        let card = field.present_card()?;
        let mut stored = *data;
        if corrupt {
            stored[3] ^= 0xFF;
        }
        card.blocks[block as usize] = stored;
        Ok(())
    }

    fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_SIZE]> {
        let mut field = lock(&self.field);
        if field.faults.fail_reads {
            return Err(HardwareError::communication("read NACK"));
        }
        let card = field.present_card()?;
        if card.class.is_classic() {
            return Err(HardwareError::unsupported("page read on classic card"));
        }
        card.pages
            .get(page as usize)
            .copied()
            .ok_or_else(|| HardwareError::invalid_data(format!("page {page} beyond card memory")))
    }

    fn write_page(&mut self, page: u8, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut field = lock(&self.field);
        if page < FIRST_USER_PAGE {
            return Err(HardwareError::unsupported("write to locked page"));
        }
        if field.faults.fail_writes {
            return Err(HardwareError::communication("write NACK"));
        }

        let corrupt = field.faults.corrupt_writes;
        let card = field.present_card()?;
        if card.class.is_classic() {
            return Err(HardwareError::unsupported("page write on classic card"));
        }
        let slot = card
            .pages
            .get_mut(page as usize)
            .ok_or_else(|| HardwareError::invalid_data(format!("page {page} beyond card memory")))?;
        *slot = *data;
        if corrupt {
            slot[0] ^= 0xFF;
        }
        Ok(())
    }
}

/// Handle for controlling a [`MockNfc`] radio.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::{MockNfc, SimCard};
///
/// let (_radio, handle) = MockNfc::new();
/// let uid = CardIdentity::new(&[1, 2, 3, 4]).unwrap();
///
/// handle.add_card(SimCard::classic(uid));
/// handle.present(uid);
/// assert_eq!(handle.present_uid(), Some(uid));
///
/// handle.remove();
/// assert_eq!(handle.present_uid(), None);
/// ```
#[derive(Debug, Clone)]
pub struct MockNfcHandle {
    field: Arc<Mutex<Field>>,
}

impl MockNfcHandle {
    /// Register a card with the simulated world (not yet in the field).
    pub fn add_card(&self, card: SimCard) {
        lock(&self.field).cards.insert(card.uid, card);
    }

    /// Place a card in the field. Unknown UIDs get a factory-fresh card.
    pub fn present(&self, uid: CardIdentity) {
        let mut field = lock(&self.field);
        field
            .cards
            .entry(uid)
            .or_insert_with(|| SimCard::from_uid(uid));
        field.present = Some(uid);
        field.authenticated_sector = None;

        if let Some((irq, clock)) = &field.irq {
            irq.signal(clock.now());
        }
    }

    /// Take the card out of the field.
    pub fn remove(&self) {
        let mut field = lock(&self.field);
        field.present = None;
        field.authenticated_sector = None;
    }

    /// UID currently in the field.
    pub fn present_uid(&self) -> Option<CardIdentity> {
        lock(&self.field).present
    }

    /// Snapshot of a card's memory.
    pub fn card(&self, uid: &CardIdentity) -> Option<SimCard> {
        lock(&self.field).cards.get(uid).cloned()
    }

    /// Simulate a missing or unresponsive controller.
    pub fn set_firmware(&self, firmware: Option<FirmwareVersion>) {
        lock(&self.field).firmware = firmware;
    }

    /// Make every block/page read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        lock(&self.field).faults.fail_reads = fail;
    }

    /// Make every block/page write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.field).faults.fail_writes = fail;
    }

    /// Make writes report success but store altered data.
    pub fn set_corrupt_writes(&self, corrupt: bool) {
        lock(&self.field).faults.corrupt_writes = corrupt;
    }

    /// Raise `irq` (timestamped by `clock`) whenever a card is presented.
    pub fn attach_irq(&self, irq: IrqLine, clock: MockClock) {
        lock(&self.field).irq = Some((irq, clock));
    }

    /// Number of detect calls served so far.
    pub fn detect_calls(&self) -> usize {
        lock(&self.field).detect_calls
    }
}

fn lock(field: &Mutex<Field>) -> MutexGuard<'_, Field> {
    match field.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
