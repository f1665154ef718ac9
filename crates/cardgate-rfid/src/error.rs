//! Error types for card-level operations.

use cardgate_core::CardClass;
use cardgate_hardware::HardwareError;

/// Result type alias for card operations.
pub type Result<T> = std::result::Result<T, RfidError>;

/// Errors raised by the resolver and the clone writer.
#[derive(Debug, thiserror::Error)]
pub enum RfidError {
    /// Radio or card I/O failure.
    #[error("Radio error: {0}")]
    Hardware(#[from] HardwareError),

    /// The card family does not support the requested operation.
    #[error("Unsupported card: {class}")]
    UnsupportedCard { class: CardClass },

    /// Sector trailers hold keys and access bits; writing them can brick a
    /// sector.
    #[error("Refusing to write sector trailer block {block}")]
    TrailerBlock { block: u8 },

    /// Data read back after a write did not match.
    #[error("Verification failed for block {block}")]
    VerificationFailed { block: u8 },

    /// Payload does not fit the target page or block.
    #[error("Payload too long: {length} bytes (max {max})")]
    PayloadTooLong { length: usize, max: usize },
}

impl RfidError {
    /// Returns `true` if the failure is worth retrying on the next
    /// presentation of the card.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Hardware(e) => e.is_transient(),
            Self::VerificationFailed { .. } => true,
            Self::UnsupportedCard { .. } | Self::TrailerBlock { .. } | Self::PayloadTooLong { .. } => {
                false
            }
        }
    }
}
