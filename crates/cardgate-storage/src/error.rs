use cardgate_hardware::HardwareError;
use thiserror::Error;

/// Storage-specific error types for the persistent card store.
///
/// Inconsistent record bytes are not errors: they are skipped during lookup.
/// Only device failures and an undersized device surface here.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Byte storage read or write failed
    #[error("Storage device error: {0}")]
    Device(#[from] HardwareError),

    /// Device cannot hold the configured number of records
    #[error("Storage device too small: {size} bytes, {required} required")]
    DeviceTooSmall { size: usize, required: usize },

    /// Requested capacity cannot be represented by the count byte
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
