//! Collaborator failures: radio timeouts and NACKs, rejected sector keys,
//! out-of-range storage addresses, and operations a card family cannot do.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The radio (or another collaborator) does not answer at all.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    #[error("Timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The card or device cannot perform the request, e.g. a page write on a
    /// classic card or a write to the manufacturer block.
    #[error("Unsupported: {operation}")]
    Unsupported { operation: String },

    /// NACK, framing or bus fault.
    #[error("Communication error: {message}")]
    Communication { message: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Authentication failed for block {block}")]
    AuthenticationFailed { block: u8 },

    /// Block or page access with the field empty.
    #[error("No card in field")]
    NoCard,

    #[error("Address {addr} out of range (size {size})")]
    AddressOutOfRange { addr: u16, size: usize },
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn timeout(ms: u64) -> Self {
        Self::Timeout { ms }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn authentication_failed(block: u8) -> Self {
        Self::AuthenticationFailed { block }
    }

    pub fn out_of_range(addr: u16, size: usize) -> Self {
        Self::AddressOutOfRange { addr, size }
    }

    /// Returns `true` for failures that may clear on the next card
    /// presentation: timeouts, NACKs, rejected keys, and a card pulled away.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Communication { .. }
                | Self::AuthenticationFailed { .. }
                | Self::NoCard
        )
    }
}
