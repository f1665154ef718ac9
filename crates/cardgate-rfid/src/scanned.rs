//! Resolved card snapshot.

use chrono::{DateTime, Utc};

use cardgate_core::{CardClass, CardIdentity};
use cardgate_hardware::RawCard;

use crate::reserved::ReservedBlockStatus;

/// A card as seen by the controller after identity resolution.
///
/// Immutable once built. Absence of a card is expressed as
/// `Option<ScannedCard>::None`, so a value of this type always describes a
/// detected card.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::RawCard;
/// use cardgate_rfid::{ReservedBlockStatus, ScannedCard};
///
/// let physical = CardIdentity::new(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
/// let cloned = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
///
/// let card = ScannedCard::builder(RawCard::from_uid(physical))
///     .reserved(ReservedBlockStatus::Cloned(cloned))
///     .build();
///
/// assert_eq!(card.physical_uid(), physical);
/// assert_eq!(card.effective_identity(), cloned);
/// assert!(!card.suspected_blank_clone());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedCard {
    physical_uid: CardIdentity,
    card_class: CardClass,
    reserved: ReservedBlockStatus,
    scanned_at: DateTime<Utc>,
}

impl ScannedCard {
    /// Snapshot of a card that was not probed for a reserved block.
    pub fn new(raw: RawCard) -> Self {
        ScannedCardBuilder::new(raw).build()
    }

    /// Create a builder for setting the reserved status and timestamp.
    pub fn builder(raw: RawCard) -> ScannedCardBuilder {
        ScannedCardBuilder::new(raw)
    }

    /// Manufacturer UID.
    pub fn physical_uid(&self) -> CardIdentity {
        self.physical_uid
    }

    /// Card family.
    pub fn card_class(&self) -> CardClass {
        self.card_class
    }

    /// Reserved block classification.
    pub fn reserved(&self) -> ReservedBlockStatus {
        self.reserved
    }

    /// When the card was read.
    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    /// The card as the radio reported it.
    pub fn raw(&self) -> RawCard {
        RawCard::new(self.physical_uid, self.card_class)
    }

    /// Identity written to the reserved block, if valid.
    pub fn cloned_identity(&self) -> Option<CardIdentity> {
        self.reserved.cloned_identity()
    }

    /// Returns `true` if the reserved block carries a valid identity.
    pub fn has_cloned_identity(&self) -> bool {
        self.cloned_identity().is_some()
    }

    /// Identity used for every authorization and store lookup: the cloned
    /// identity if present, else the physical UID.
    pub fn effective_identity(&self) -> CardIdentity {
        self.cloned_identity().unwrap_or(self.physical_uid)
    }

    /// Readable but never-written reserved block.
    pub fn suspected_blank_clone(&self) -> bool {
        self.reserved.is_blank()
    }
}

/// Builder for [`ScannedCard`].
#[derive(Debug, Clone)]
pub struct ScannedCardBuilder {
    raw: RawCard,
    reserved: Option<ReservedBlockStatus>,
    scanned_at: Option<DateTime<Utc>>,
}

impl ScannedCardBuilder {
    pub fn new(raw: RawCard) -> Self {
        Self {
            raw,
            reserved: None,
            scanned_at: None,
        }
    }

    /// Set the reserved block status.
    ///
    /// Defaults to [`ReservedBlockStatus::Unsupported`] for non-classic cards
    /// and [`ReservedBlockStatus::Unreadable`] for classic ones.
    pub fn reserved(mut self, status: ReservedBlockStatus) -> Self {
        self.reserved = Some(status);
        self
    }

    /// Set a custom timestamp for replaying recorded scans.
    ///
    /// If not set, the current time is used.
    pub fn scanned_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.scanned_at = Some(timestamp);
        self
    }

    pub fn build(self) -> ScannedCard {
        let class = self.raw.class;
        let reserved = self.reserved.unwrap_or(if class.is_classic() {
            ReservedBlockStatus::Unreadable
        } else {
            ReservedBlockStatus::Unsupported
        });

        ScannedCard {
            physical_uid: self.raw.uid,
            card_class: class,
            reserved,
            scanned_at: self.scanned_at.unwrap_or_else(Utc::now),
        }
    }
}
