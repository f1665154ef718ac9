use crate::{
    Result,
    constants::{MAX_IDENTITY_LENGTH, MIN_IDENTITY_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Card identity (1-7 bytes).
///
/// Either a manufacturer UID or an operator-written identity read from a
/// card's reserved block. Stored inline with an explicit length so it can be
/// copied into fixed-stride storage records without allocation.
///
/// # Security
/// Equality uses constant-time comparison of the identity bytes.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
///
/// let id = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
/// assert_eq!(id.len(), 4);
/// assert_eq!(id.to_hex(), "04123456");
///
/// assert!(CardIdentity::new(&[]).is_err());
/// assert!(CardIdentity::new(&[0u8; 8]).is_err());
/// ```
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct CardIdentity {
    bytes: [u8; MAX_IDENTITY_LENGTH],
    len: u8,
}

impl CardIdentity {
    /// Create a new identity with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentityLength` if the slice is empty or longer
    /// than [`MAX_IDENTITY_LENGTH`].
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let length = bytes.len();
        if !(MIN_IDENTITY_LENGTH..=MAX_IDENTITY_LENGTH).contains(&length) {
            return Err(Error::InvalidIdentityLength {
                length,
                min: MIN_IDENTITY_LENGTH,
                max: MAX_IDENTITY_LENGTH,
            });
        }

        let mut buf = [0u8; MAX_IDENTITY_LENGTH];
        buf[..length].copy_from_slice(bytes);
        Ok(Self {
            bytes: buf,
            len: length as u8,
        })
    }

    /// Parse an identity from hex, ignoring `:`, `-` and whitespace separators.
    ///
    /// # Errors
    /// Returns `Error::InvalidHex` for odd digit counts or non-hex characters,
    /// and `Error::InvalidIdentityLength` for out-of-range lengths.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: Vec<u8> = text
            .bytes()
            .filter(|b| !matches!(b, b':' | b'-') && !b.is_ascii_whitespace())
            .collect();

        if let Some(bad) = digits.iter().find(|b| !b.is_ascii_hexdigit()) {
            return Err(Error::InvalidHex(format!(
                "'{}' is not a hex digit in '{text}'",
                char::from(*bad)
            )));
        }
        if digits.len() % 2 != 0 {
            return Err(Error::InvalidHex(format!("odd number of digits in '{text}'")));
        }

        let bytes = digits
            .chunks(2)
            .map(|pair| {
                let pair = std::str::from_utf8(pair)
                    .map_err(|_| Error::InvalidHex(text.to_string()))?;
                u8::from_str_radix(pair, 16).map_err(|_| Error::InvalidHex(text.to_string()))
            })
            .collect::<Result<Vec<u8>>>()?;

        Self::new(&bytes)
    }

    /// Identity bytes, exactly `len()` long.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of identity bytes.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Uppercase hex without separators (e.g. `04123456`).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.as_bytes().iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CardIdentity({})", self.to_hex())
    }
}

impl std::str::FromStr for CardIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardIdentity::from_hex(s)
    }
}

impl TryFrom<Vec<u8>> for CardIdentity {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        CardIdentity::new(&bytes)
    }
}

impl TryFrom<&[u8]> for CardIdentity {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        CardIdentity::new(bytes)
    }
}

impl From<CardIdentity> for Vec<u8> {
    fn from(identity: CardIdentity) -> Self {
        identity.as_bytes().to_vec()
    }
}

/// Constant-time comparison implementation for CardIdentity
///
/// Lengths are public; only the byte comparison runs in constant time.
impl PartialEq for CardIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl std::hash::Hash for CardIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

/// Card family reported by the radio.
///
/// Only classic cards support the reserved-block identity protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardClass {
    /// Could not be classified.
    Unknown,
    /// Mifare Classic 1K.
    ClassicSmall,
    /// Mifare Classic 4K.
    ClassicLarge,
    /// Mifare Ultralight / NTAG (page based, no sector keys).
    Lightweight,
}

impl CardClass {
    /// Classify a card from its UID length.
    ///
    /// 4-byte UIDs are reported as classic 1K (1K and 4K are indistinguishable
    /// from the UID alone); 7-byte UIDs as lightweight.
    #[inline]
    #[must_use]
    pub fn from_uid_length(length: usize) -> Self {
        match length {
            4 => CardClass::ClassicSmall,
            7 => CardClass::Lightweight,
            _ => CardClass::Unknown,
        }
    }

    /// Returns `true` for card families that carry a reserved block.
    #[inline]
    #[must_use]
    pub fn is_classic(self) -> bool {
        matches!(self, CardClass::ClassicSmall | CardClass::ClassicLarge)
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CardClass::Unknown => "Unknown",
            CardClass::ClassicSmall => "Mifare Classic 1K",
            CardClass::ClassicLarge => "Mifare Classic 4K",
            CardClass::Lightweight => "Mifare Ultralight",
        }
    }
}

impl fmt::Display for CardClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
