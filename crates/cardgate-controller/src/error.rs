use cardgate_hardware::HardwareError;
use cardgate_storage::StorageError;
use thiserror::Error;

/// Errors that stop the controller from starting.
///
/// Once running, the control cycle never fails: collaborator errors are
/// logged and turned into operator notices.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The NFC radio did not answer the firmware query
    #[error("NFC reader not found: {0}")]
    NfcNotFound(#[source] HardwareError),

    /// Card store could not be opened or formatted
    #[error("Card store unavailable: {0}")]
    Storage(#[from] StorageError),

    /// Boot-time pin or display access failed
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Configuration rejected by validation
    #[error(transparent)]
    Config(#[from] cardgate_core::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
