//! Byte layout of the card store.
//!
//! ```text
//! addr 0..2   magic marker (0xABCD, big-endian)
//! addr 2      stored card count
//! addr 3      unused
//! addr 4..    records, RECORD_STRIDE bytes each:
//!             [length][active][identity bytes, zero padded to 7]
//! ```
//!
//! The fixed stride makes random access and compaction a constant amount of
//! work per record.

use cardgate_core::CardIdentity;
use cardgate_core::constants::{MAX_IDENTITY_LENGTH, RECORD_STRIDE, STORAGE_RECORDS_START};
use serde::{Deserialize, Serialize};

const LENGTH_OFFSET: usize = 0;
const ACTIVE_OFFSET: usize = 1;
const IDENTITY_OFFSET: usize = 2;

/// One slot of the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCardRecord {
    pub identity: CardIdentity,
    pub active: bool,
}

impl StoredCardRecord {
    /// Active record for `identity`.
    pub fn active(identity: CardIdentity) -> Self {
        Self {
            identity,
            active: true,
        }
    }
}

/// Address of the record at `index`.
///
/// # Examples
///
/// ```
/// use cardgate_storage::layout::record_addr;
///
/// assert_eq!(record_addr(0), 4);
/// assert_eq!(record_addr(1), 13);
/// assert_eq!(record_addr(39), 355);
/// ```
pub const fn record_addr(index: usize) -> u16 {
    (STORAGE_RECORDS_START as usize + index * RECORD_STRIDE) as u16
}

/// Bytes needed for a store of `capacity` records.
pub const fn required_bytes(capacity: usize) -> usize {
    STORAGE_RECORDS_START as usize + capacity * RECORD_STRIDE
}

/// Serialize a record into its fixed-stride slot.
pub fn encode_record(record: &StoredCardRecord) -> [u8; RECORD_STRIDE] {
    let bytes = record.identity.as_bytes();
    let mut slot = [0u8; RECORD_STRIDE];
    slot[LENGTH_OFFSET] = bytes.len() as u8;
    slot[ACTIVE_OFFSET] = u8::from(record.active);
    slot[IDENTITY_OFFSET..IDENTITY_OFFSET + bytes.len()].copy_from_slice(bytes);
    slot
}

/// Parse a slot. Returns `None` when the length byte is outside `1..=7`.
pub fn decode_record(slot: &[u8; RECORD_STRIDE]) -> Option<StoredCardRecord> {
    let length = slot[LENGTH_OFFSET] as usize;
    if !(1..=MAX_IDENTITY_LENGTH).contains(&length) {
        return None;
    }

    let identity = CardIdentity::new(&slot[IDENTITY_OFFSET..IDENTITY_OFFSET + length]).ok()?;
    Some(StoredCardRecord {
        identity,
        active: slot[ACTIVE_OFFSET] == 1,
    })
}
