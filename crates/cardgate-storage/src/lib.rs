//! Persistent card allow-list for the cardgate access controller.
//!
//! This crate stores up to [`MAX_STORED_CARDS`] card identities in a small
//! byte-addressable memory (EEPROM class) using a fixed-stride record layout
//! behind a magic-marker header. See [`layout`] for the byte map.
//!
//! # Invariants
//!
//! - No duplicate identities.
//! - Live records occupy `[0, count)`; removal compacts.
//! - Record bytes are written before the count that makes them reachable.
//! - Corrupt records are skipped, never fatal.
//!
//! # Examples
//!
//! ```
//! use cardgate_core::CardIdentity;
//! use cardgate_hardware::mock::MemoryStorage;
//! use cardgate_storage::CardStore;
//!
//! let eeprom = MemoryStorage::default();
//! let mut store = CardStore::open(eeprom.clone()).unwrap();
//! store.add(&CardIdentity::new(&[1, 2, 3, 4]).unwrap()).unwrap();
//!
//! // Reboot: the allow-list survives.
//! let store = CardStore::open(eeprom).unwrap();
//! assert_eq!(store.count(), 1);
//! ```
//!
//! [`MAX_STORED_CARDS`]: cardgate_core::constants::MAX_STORED_CARDS

pub mod error;
pub mod layout;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use layout::StoredCardRecord;
pub use store::{AddOutcome, CardStore};
