//! Common types shared across hardware device implementations.
//!
//! This module defines the small value types passed across the collaborator
//! traits: pin identifiers and logic levels, sector key selection, the radio
//! firmware report, and the raw card observation returned by a detect call.

use cardgate_core::{CardClass, CardIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digital pin identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

impl From<u8> for PinId {
    fn from(pin: u8) -> Self {
        Self(pin)
    }
}

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Pin pulled to ground.
    Low,
    /// Pin at supply voltage.
    High,
}

impl Level {
    /// Level corresponding to a boolean (`true` is high).
    #[inline]
    pub fn from_bool(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }

    /// Returns `true` for [`Level::Low`].
    #[inline]
    pub fn is_low(self) -> bool {
        self == Self::Low
    }

    /// Returns `true` for [`Level::High`].
    #[inline]
    pub fn is_high(self) -> bool {
        self == Self::High
    }

    /// The opposite level.
    #[inline]
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

/// Which classic sector key to authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Key A (read/write with factory access bits).
    A,
    /// Key B.
    B,
}

/// Radio controller firmware report.
///
/// Packed by the controller as `IC << 24 | VER << 16 | REV << 8 | SUPPORT`.
///
/// # Examples
///
/// ```
/// use cardgate_hardware::types::FirmwareVersion;
///
/// let fw = FirmwareVersion::from_packed(0x3201_0607);
/// assert_eq!(fw.ic, 0x32);
/// assert_eq!(fw.to_string(), "PN532 v1.6");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Chip identifier (0x32 for PN532).
    pub ic: u8,
    /// Firmware major version.
    pub major: u8,
    /// Firmware minor version.
    pub minor: u8,
    /// Supported protocol bitmap.
    pub support: u8,
}

impl FirmwareVersion {
    /// Decode the packed 32-bit firmware report.
    pub fn from_packed(packed: u32) -> Self {
        let [ic, major, minor, support] = packed.to_be_bytes();
        Self {
            ic,
            major,
            minor,
            support,
        }
    }

    /// Encode to the packed 32-bit representation.
    pub fn packed(&self) -> u32 {
        u32::from_be_bytes([self.ic, self.major, self.minor, self.support])
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PN5{:02X} v{}.{}", self.ic, self.major, self.minor)
    }
}

/// A card observed in the radio field by a single detect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCard {
    /// Physical (manufacturer) UID.
    pub uid: CardIdentity,
    /// Card family inferred by the reader.
    pub class: CardClass,
}

impl RawCard {
    /// Build an observation, classifying the card from its UID length.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_core::{CardClass, CardIdentity};
    /// use cardgate_hardware::types::RawCard;
    ///
    /// let uid = CardIdentity::new(&[0x04, 0xAB, 0xCD, 0xEF]).unwrap();
    /// assert_eq!(RawCard::from_uid(uid).class, CardClass::ClassicSmall);
    /// ```
    pub fn from_uid(uid: CardIdentity) -> Self {
        Self {
            uid,
            class: CardClass::from_uid_length(uid.len()),
        }
    }

    /// Build an observation with an explicit card family.
    pub fn new(uid: CardIdentity, class: CardClass) -> Self {
        Self { uid, class }
    }
}
