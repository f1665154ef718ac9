//! Compile-time configuration for the cardgate access controller.
//!
//! This module defines the constants shared by every cardgate crate: storage
//! geometry, identity bounds, timing policy, the reserved-block protocol, and
//! the display dimensions. Runtime configuration (`ControllerConfig` in the
//! controller crate) uses these values as its defaults.
//!
//! # Storage Layout
//!
//! The persistent allow-list lives in a small byte-addressable memory:
//!
//! ```text
//! addr 0..2   magic marker (0xABCD, big-endian)
//! addr 2      stored card count
//! addr 3      unused
//! addr 4..    records, RECORD_STRIDE bytes each:
//!             [length][active][identity bytes x MAX_IDENTITY_LENGTH]
//! ```
//!
//! # Reserved Block
//!
//! Classic cards carry an operator-written identity in a data block:
//!
//! ```text
//! [0xAC][0xDB][len][identity ...][0x00 padding]   (16 bytes)
//! ```
//!
//! # Usage
//!
//! ```
//! use cardgate_core::constants::*;
//! use std::time::Duration;
//!
//! let unlock = Duration::from_millis(DOOR_UNLOCK_TIME_MS);
//! assert_eq!(unlock.as_secs(), 3);
//! assert_eq!(RECORD_STRIDE, MAX_IDENTITY_LENGTH + 2);
//! ```

// ============================================================================
// Card Identity
// ============================================================================

/// Maximum identity length in bytes.
///
/// Classic cards report 4-byte UIDs, lightweight (Ultralight/NTAG) cards
/// report 7-byte UIDs. Both fit in a single stored record.
pub const MAX_IDENTITY_LENGTH: usize = 7;

/// Minimum identity length in bytes.
pub const MIN_IDENTITY_LENGTH: usize = 1;

// ============================================================================
// Persistent Card Store
// ============================================================================

/// Maximum number of authorized cards kept in persistent storage.
pub const MAX_STORED_CARDS: usize = 40;

/// Address of the two-byte magic marker.
pub const STORAGE_MAGIC_ADDR: u16 = 0;

/// Value written at [`STORAGE_MAGIC_ADDR`] once storage has been formatted.
pub const STORAGE_MAGIC_NUMBER: u16 = 0xABCD;

/// Address of the stored card count byte.
pub const STORAGE_COUNT_ADDR: u16 = 2;

/// Address of the first card record.
pub const STORAGE_RECORDS_START: u16 = 4;

/// Bytes per stored record: length byte, active flag, identity bytes.
pub const RECORD_STRIDE: usize = MAX_IDENTITY_LENGTH + 2;

/// Smallest storage size able to hold [`MAX_STORED_CARDS`] records.
///
/// ```
/// use cardgate_core::constants::REQUIRED_STORAGE_BYTES;
///
/// assert_eq!(REQUIRED_STORAGE_BYTES, 364);
/// ```
pub const REQUIRED_STORAGE_BYTES: usize =
    STORAGE_RECORDS_START as usize + MAX_STORED_CARDS * RECORD_STRIDE;

// ============================================================================
// Timing Policy (milliseconds)
// ============================================================================

/// Minimum interval between two accepted button level changes.
pub const BUTTON_DEBOUNCE_TIME_MS: u64 = 20;

/// SELECT held at least this long counts as a long press.
pub const LONG_PRESS_TIME_MS: u64 = 1000;

/// How long access granted/denied screens and operator notices stay visible.
pub const MESSAGE_DISPLAY_TIME_MS: u64 = 2000;

/// Menu inactivity timeout, measured from the last button activity.
pub const MENU_TIMEOUT_MS: u64 = 30_000;

/// How long the door relay stays unlocked after access is granted.
pub const DOOR_UNLOCK_TIME_MS: u64 = 3000;

/// Minimum interval between two radio polls in polling mode.
pub const NFC_POLL_INTERVAL_MS: u64 = 100;

/// Radio detect timeout used in polling mode.
pub const NFC_POLL_TIMEOUT_MS: u64 = 50;

/// Radio detect timeout used after an interrupt.
pub const NFC_IRQ_READ_TIMEOUT_MS: u64 = 100;

/// Interrupts closer together than this are coalesced.
pub const NFC_IRQ_DEBOUNCE_MS: u64 = 500;

/// A card absent from the field for this long is considered removed.
pub const CARD_REMOVAL_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Reserved Block Protocol
// ============================================================================

/// Size of a classic card data block.
pub const BLOCK_SIZE: usize = 16;

/// Size of a lightweight card page.
pub const PAGE_SIZE: usize = 4;

/// Data block carrying the cloned identity (sector 1, first block).
pub const RESERVED_BLOCK: u8 = 4;

/// Default first block of a generic classic data write. The block after the
/// reserved one, so plain data never overwrites a cloned identity.
pub const DEFAULT_DATA_BLOCK: u8 = RESERVED_BLOCK + 1;

/// Default first page of a generic lightweight data write (first user page).
pub const DEFAULT_DATA_PAGE: u8 = 4;

/// First marker byte of an initialized reserved block.
pub const CARD_MAGIC_BYTE1: u8 = 0xAC;

/// Second marker byte of an initialized reserved block.
pub const CARD_MAGIC_BYTE2: u8 = 0xDB;

/// Bytes compared when verifying a reserved-block write:
/// two markers, the length byte and the identity area.
pub const RESERVED_VERIFY_LENGTH: usize = 3 + MAX_IDENTITY_LENGTH;

/// Factory default classic key.
pub const DEFAULT_KEY: [u8; 6] = [0xFF; 6];

// ============================================================================
// Display
// ============================================================================

/// Character columns of the operator display.
pub const LCD_COLUMNS: usize = 16;

/// Character rows of the operator display.
pub const LCD_ROWS: usize = 2;

// ============================================================================
// Default Pin Assignment
// ============================================================================

/// UP button pin (active low).
pub const BTN_UP_PIN: u8 = 14;

/// DOWN button pin (active low).
pub const BTN_DOWN_PIN: u8 = 15;

/// SELECT button pin (active low).
pub const BTN_SELECT_PIN: u8 = 16;

/// BACK button pin (active low).
pub const BTN_BACK_PIN: u8 = 17;

/// Door relay output pin.
pub const RELAY_PIN: u8 = 20;

/// Whether the relay unlocks when its pin is driven high.
pub const RELAY_ACTIVE_HIGH: bool = true;
