//! Reserved-block codec.
//!
//! Classic cards carry an operator-written identity in one data block:
//!
//! ```text
//! byte 0      0xAC marker
//! byte 1      0xDB marker
//! byte 2      identity length (1..=7, 0 = formatted but unassigned)
//! byte 3..10  identity bytes
//! byte 10..16 zero padding
//! ```
//!
//! A block that reads back as all `0x00`/`0xFF` bytes has never been written
//! by this system. Such a card is either factory fresh or a blank magic card
//! carrying a copied UID, and must never be treated as carrying an identity.

use cardgate_core::constants::{
    BLOCK_SIZE, CARD_MAGIC_BYTE1, CARD_MAGIC_BYTE2, MAX_IDENTITY_LENGTH, RESERVED_VERIFY_LENGTH,
};
use cardgate_core::CardIdentity;
use serde::{Deserialize, Serialize};

const LENGTH_OFFSET: usize = 2;
const IDENTITY_OFFSET: usize = 3;

/// What the reserved block of a presented card revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum ReservedBlockStatus {
    /// Card family has no reserved block (lightweight or unknown cards).
    Unsupported,
    /// Authentication or read failed.
    Unreadable,
    /// Readable, every byte `0x00` or `0xFF`.
    Blank,
    /// Readable and carrying a valid identity.
    Cloned(CardIdentity),
    /// Readable, not blank, but without a valid identity.
    Foreign,
}

impl ReservedBlockStatus {
    /// The operator-written identity, if any.
    pub fn cloned_identity(&self) -> Option<CardIdentity> {
        match self {
            Self::Cloned(identity) => Some(*identity),
            _ => None,
        }
    }

    /// Returns `true` for a readable block that was never written.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    /// Returns `true` if the block content was actually read.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Blank | Self::Cloned(_) | Self::Foreign)
    }
}

/// Encode an identity into a reserved block.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
/// use cardgate_rfid::reserved::{decode, encode, ReservedBlockStatus};
///
/// let id = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
/// let block = encode(&id);
/// assert_eq!(&block[..7], &[0xAC, 0xDB, 4, 0x04, 0x12, 0x34, 0x56]);
/// assert_eq!(decode(&block), ReservedBlockStatus::Cloned(id));
/// ```
pub fn encode(identity: &CardIdentity) -> [u8; BLOCK_SIZE] {
    let bytes = identity.as_bytes();
    let mut block = header(bytes.len() as u8);
    block[IDENTITY_OFFSET..IDENTITY_OFFSET + bytes.len()].copy_from_slice(bytes);
    block
}

/// Encode a formatted block with no identity assigned.
pub fn encode_unassigned() -> [u8; BLOCK_SIZE] {
    header(0)
}

fn header(length: u8) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    block[0] = CARD_MAGIC_BYTE1;
    block[1] = CARD_MAGIC_BYTE2;
    block[LENGTH_OFFSET] = length;
    block
}

/// Returns `true` if every byte is `0x00` or `0xFF`.
pub fn is_blank(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|b| *b == 0x00 || *b == 0xFF)
}

/// Classify a block that was read successfully.
///
/// Never returns [`ReservedBlockStatus::Unsupported`] or
/// [`ReservedBlockStatus::Unreadable`]; those come from the resolver.
pub fn decode(block: &[u8; BLOCK_SIZE]) -> ReservedBlockStatus {
    if is_blank(block) {
        return ReservedBlockStatus::Blank;
    }

    if block[0] != CARD_MAGIC_BYTE1 || block[1] != CARD_MAGIC_BYTE2 {
        return ReservedBlockStatus::Foreign;
    }

    let length = block[LENGTH_OFFSET] as usize;
    if !(1..=MAX_IDENTITY_LENGTH).contains(&length) {
        return ReservedBlockStatus::Foreign;
    }

    CardIdentity::new(&block[IDENTITY_OFFSET..IDENTITY_OFFSET + length])
        .map(ReservedBlockStatus::Cloned)
        .unwrap_or(ReservedBlockStatus::Foreign)
}

/// Compare the marker, length and identity region of a written block with
/// what was read back.
pub fn verify(written: &[u8; BLOCK_SIZE], read_back: &[u8; BLOCK_SIZE]) -> bool {
    written[..RESERVED_VERIFY_LENGTH] == read_back[..RESERVED_VERIFY_LENGTH]
}
