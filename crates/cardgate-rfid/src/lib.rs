//! Card-level logic for the cardgate access controller.
//!
//! - [`CardDetector`]: turns radio polls or interrupts into "new card" events
//! - [`IdentityResolver`]: reads the reserved block to find a card's
//!   effective identity, and writes identities onto target cards
//! - [`ScannedCard`]: the immutable result of a resolution
//!
//! # Effective identity
//!
//! Classic cards may carry an operator-written identity in a reserved data
//! block. When present it replaces the manufacturer UID for every
//! authorization decision; this is what makes a cloned card authorize as its
//! source. A readable reserved block that was never written is flagged
//! through [`ScannedCard::suspected_blank_clone`] so the controller can deny
//! blank magic cards that merely copy a stored UID.

pub mod detector;
pub mod error;
pub mod reserved;
pub mod resolver;
pub mod scanned;

pub use detector::{CardDetector, DetectionMode, DetectorConfig};
pub use error::{Result, RfidError};
pub use reserved::ReservedBlockStatus;
pub use resolver::IdentityResolver;
pub use scanned::{ScannedCard, ScannedCardBuilder};
